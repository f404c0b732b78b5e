use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::state::ClientOptions;
use super::state::DEFAULT_CHART_PERIOD_DAYS;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub startup: StartupConfig,
    pub charts: ChartConfig,
}

impl Config {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            keep_session_on_network_error: self.startup.keep_session_on_network_error,
            chart_period_days: self.charts.default_period_days.max(1),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    pub downloads_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StartupConfig {
    pub keep_session_on_network_error: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub default_period_days: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_period_days: DEFAULT_CHART_PERIOD_DAYS,
        }
    }
}
