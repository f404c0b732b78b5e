use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;

use chrono::Local;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use nutri_core::reduce;
use nutri_core::ClientAction;
use nutri_core::ClientOptions;
use nutri_core::ClientState;
use nutri_core::KeyValueStore;
use nutri_core::Notification;
use nutri_core::NutriEffect;
use nutri_core::RuntimeAction;
use nutri_core::SessionStore;
use nutri_core::UserAction;

use crate::client::ApiClient;
use crate::executor::execute_call;

pub type ActionHook = Box<dyn Fn(&ClientState, &ClientAction) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("session store failed: {0}")]
    Store(#[from] std::io::Error),
    #[error("could not save report to {path}: {source}")]
    Report {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub calls: Vec<&'static str>,
    pub notifications: Vec<Notification>,
    pub diagnostics: Vec<String>,
}

pub struct SessionController<C, S> {
    state: ClientState,
    store: SessionStore<S>,
    client: C,
    downloads_dir: PathBuf,
    hooks: Vec<ActionHook>,
}

impl<C: ApiClient, S: KeyValueStore> SessionController<C, S> {
    pub fn new(
        client: C,
        store: S,
        options: ClientOptions,
        downloads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            state: ClientState::new(local_today(), options),
            store: SessionStore::new(store),
            client,
            downloads_dir: downloads_dir.into(),
            hooks: Vec::new(),
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn downloads_dir(&self) -> &Path {
        self.downloads_dir.as_path()
    }

    pub fn after_action<F>(&mut self, hook: F)
    where
        F: Fn(&ClientState, &ClientAction) + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    // Restores the stored session and verifies it against the backend.
    pub async fn start(&mut self) -> Result<DispatchReport, ControllerError> {
        self.boot(true).await
    }

    // Restores the stored session without touching the network.
    pub async fn restore(&mut self) -> Result<DispatchReport, ControllerError> {
        self.boot(false).await
    }

    pub async fn dispatch(&mut self, action: UserAction) -> Result<DispatchReport, ControllerError> {
        debug!(action = action.label(), "dispatch");
        self.run(ClientAction::User(action)).await
    }

    async fn boot(&mut self, verify: bool) -> Result<DispatchReport, ControllerError> {
        let session = self.store.load_session()?;
        let transcript = self.store.load_transcript()?;
        let theme = self.store.load_theme()?;
        debug!(
            restored = session.is_some(),
            messages = transcript.len(),
            verify,
            "session restore"
        );
        self.run(ClientAction::Runtime(RuntimeAction::SessionRestored {
            session,
            transcript,
            theme,
            verify,
        }))
        .await
    }

    // Effects run strictly in the order they were produced; effects caused
    // by a call's result queue up behind the ones already pending. A failed
    // write does not stop the queue; the first failure is returned once the
    // queue drains.
    async fn run(&mut self, action: ClientAction) -> Result<DispatchReport, ControllerError> {
        let since = self.state.notifications.last_seq();
        let mut report = DispatchReport::default();
        let mut queue = VecDeque::new();
        let mut deferred: Option<ControllerError> = None;

        reduce(
            &mut self.state,
            ClientAction::Runtime(RuntimeAction::SetToday(local_today())),
        );
        self.apply(action, &mut queue);

        while let Some(effect) = queue.pop_front() {
            let label = effect.label();
            let outcome = match effect {
                NutriEffect::Call(call) => {
                    report.calls.push(call.label());
                    let token = self.state.bearer_token().map(str::to_string);
                    let next = execute_call(&self.client, call, token.as_deref()).await;
                    self.apply(ClientAction::Runtime(next), &mut queue);
                    Ok(())
                }
                NutriEffect::PersistSession(session) => self
                    .store
                    .save_session(&session)
                    .map_err(ControllerError::from),
                NutriEffect::PersistTranscript(messages) => self
                    .store
                    .save_transcript(&messages)
                    .map_err(ControllerError::from),
                NutriEffect::PersistTheme(theme) => {
                    self.store.save_theme(theme).map_err(ControllerError::from)
                }
                NutriEffect::ClearStoredSession => {
                    self.store.clear_session().map_err(ControllerError::from)
                }
                NutriEffect::SaveReport { file_name, html } => {
                    match self.save_report(&file_name, &html) {
                        Ok(path) => {
                            self.apply(
                                ClientAction::Runtime(RuntimeAction::ReportSaved {
                                    path: path.display().to_string(),
                                }),
                                &mut queue,
                            );
                            Ok(())
                        }
                        Err(err) => Err(err),
                    }
                }
                NutriEffect::Diagnostic(message) => {
                    warn!("{message}");
                    report.diagnostics.push(message);
                    Ok(())
                }
            };
            if let Err(err) = outcome {
                warn!(effect = label, error = %err, "effect failed");
                if deferred.is_none() {
                    deferred = Some(err);
                }
            }
        }

        report.notifications = self.state.notifications.since(since);
        match deferred {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    fn apply(&mut self, action: ClientAction, queue: &mut VecDeque<NutriEffect>) {
        let effects = reduce(&mut self.state, action.clone());
        debug!(
            phase = self.state.phase.label(),
            effects = effects.len(),
            "reduced"
        );
        for hook in &self.hooks {
            hook(&self.state, &action);
        }
        queue.extend(effects);
    }

    fn save_report(&self, file_name: &str, html: &str) -> Result<PathBuf, ControllerError> {
        let path = self.downloads_dir.join(file_name);
        std::fs::create_dir_all(&self.downloads_dir)
            .and_then(|()| std::fs::write(&path, html))
            .map_err(|source| ControllerError::Report {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests;
