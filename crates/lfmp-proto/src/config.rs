use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Where the LastFMProxy backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Refresh cadence of the now-playing poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Safety-net countdown armed whenever a poll fires.
    #[serde(default = "default_baseline_refresh_secs")]
    pub baseline_refresh_secs: i64,
    /// Countdown used while not streaming or after a `result` message.
    #[serde(default = "default_idle_refresh_secs")]
    pub idle_refresh_secs: i64,
    #[serde(default = "default_min_refresh_secs")]
    pub min_refresh_secs: i64,
    #[serde(default = "default_max_refresh_secs")]
    pub max_refresh_secs: i64,
    /// Requests unanswered after this long count as failed.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Let playback shortcuts fire while a text input has focus.
    #[serde(default)]
    pub shortcuts_in_text_input: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Cookie jar holding the display preferences.
    /// Defaults to `~/.local/share/lfmp/prefs.json`.
    #[serde(default = "default_prefs_file")]
    pub prefs_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            baseline_refresh_secs: default_baseline_refresh_secs(),
            idle_refresh_secs: default_idle_refresh_secs(),
            min_refresh_secs: default_min_refresh_secs(),
            max_refresh_secs: default_max_refresh_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PollingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            shortcuts_in_text_input: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prefs_file: default_prefs_file(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:1881".to_string()
}

fn default_baseline_refresh_secs() -> i64 {
    60
}

fn default_idle_refresh_secs() -> i64 {
    5
}

fn default_min_refresh_secs() -> i64 {
    2
}

fn default_max_refresh_secs() -> i64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_prefs_file() -> PathBuf {
    platform::data_dir().join("prefs.json")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path, writing defaults there if it does not exist.
    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            polling: PollingConfig::default(),
            keys: KeysConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}
