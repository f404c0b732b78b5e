use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use nutri_core::config::Config;

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nutri").join("config.toml"))
}

// An explicit path must exist; the default location is optional.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse(raw: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str(raw)?)
}

pub fn apply_overrides(config: &mut Config, api_url: Option<String>, data_dir: Option<PathBuf>) {
    if let Some(api_url) = api_url.filter(|url| !url.trim().is_empty()) {
        config.api.base_url = api_url;
    }
    if let Some(data_dir) = data_dir {
        config.storage.data_dir = Some(data_dir);
    }
}

pub fn data_dir(config: &Config) -> anyhow::Result<PathBuf> {
    config
        .storage
        .data_dir
        .clone()
        .or_else(|| dirs::data_dir().map(|dir| dir.join("nutri")))
        .context("no data directory available; set NUTRI_DATA_DIR")
}

pub fn downloads_dir(config: &Config) -> PathBuf {
    config
        .storage
        .downloads_dir
        .clone()
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
