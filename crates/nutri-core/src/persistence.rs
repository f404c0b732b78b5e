use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::warn;

use super::state::ChatMessage;
use super::state::Session;
use super::state::Theme;
use super::state::UserSummary;

pub const KEY_AUTH_TOKEN: &str = "auth_token";
pub const KEY_CURRENT_USER: &str = "current_user";
pub const KEY_CHAT_HISTORY: &str = "chat_history";
pub const KEY_THEME: &str = "theme";

pub trait KeyValueStore {
    fn save(&mut self, key: &str, value: &str) -> std::io::Result<()>;
    fn load(&self, key: &str) -> std::io::Result<Option<String>>;
    fn remove(&mut self, key: &str) -> std::io::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn save(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> std::io::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> std::io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// One file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        self.dir.as_path()
    }

    fn path_for(&self, key: &str) -> std::io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid store key: {key:?}"),
            ));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn save(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        let path = self.path_for(key)?;
        write_private(path.as_path(), value)
    }

    fn load(&self, key: &str) -> std::io::Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        match String::from_utf8(bytes) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) => {
                warn!(key, error = %err, "stored value is not valid UTF-8; treating as absent");
                Ok(None)
            }
        }
    }

    fn remove(&mut self, key: &str) -> std::io::Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore<S> {
    inner: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn save_session(&mut self, session: &Session) -> std::io::Result<()> {
        let user = serde_json::to_string(&session.summary())
            .map_err(|err| std::io::Error::other(format!("serialize user: {err}")))?;
        self.inner.save(KEY_AUTH_TOKEN, session.auth_token.as_str())?;
        self.inner.save(KEY_CURRENT_USER, user.as_str())
    }

    // Both the token and the user summary must be present and readable;
    // anything else counts as "no session".
    pub fn load_session(&self) -> std::io::Result<Option<Session>> {
        let Some(token) = self.inner.load(KEY_AUTH_TOKEN)? else {
            return Ok(None);
        };
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        let Some(raw_user) = self.inner.load(KEY_CURRENT_USER)? else {
            return Ok(None);
        };
        match serde_json::from_str::<UserSummary>(&raw_user) {
            Ok(user) => Ok(Some(Session::new(user, token))),
            Err(err) => {
                warn!(error = %err, "stored user is malformed; treating as signed out");
                Ok(None)
            }
        }
    }

    pub fn save_transcript(&mut self, messages: &[ChatMessage]) -> std::io::Result<()> {
        let encoded = serde_json::to_string(messages)
            .map_err(|err| std::io::Error::other(format!("serialize transcript: {err}")))?;
        self.inner.save(KEY_CHAT_HISTORY, encoded.as_str())
    }

    pub fn load_transcript(&self) -> std::io::Result<Vec<ChatMessage>> {
        let Some(raw) = self.inner.load(KEY_CHAT_HISTORY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => Ok(messages),
            Err(err) => {
                warn!(error = %err, "stored chat history is malformed; starting empty");
                Ok(Vec::new())
            }
        }
    }

    pub fn save_theme(&mut self, theme: Theme) -> std::io::Result<()> {
        self.inner.save(KEY_THEME, theme.label())
    }

    pub fn load_theme(&self) -> std::io::Result<Theme> {
        let Some(raw) = self.inner.load(KEY_THEME)? else {
            return Ok(Theme::default());
        };
        Ok(raw.parse::<Theme>().unwrap_or_else(|err| {
            warn!(error = %err, "stored theme is malformed; using default");
            Theme::default()
        }))
    }

    pub fn clear_session(&mut self) -> std::io::Result<()> {
        self.inner.remove(KEY_AUTH_TOKEN)?;
        self.inner.remove(KEY_CURRENT_USER)?;
        self.inner.remove(KEY_CHAT_HISTORY)
    }
}

fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(())
}
