use crate::error::ConfigError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.newrelic.com/graphql";
pub const DEFAULT_VIOLATIONS_URL: &str =
    "https://api.newrelic.com/v2/alerts_violations.json?only_open=true";

const STATE_DIR_NAME: &str = ".osiris";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub account_id: String,
    pub refresh_interval_secs: u64,
    pub graphql_url: String,
    pub violations_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            account_id: String::new(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            violations_url: DEFAULT_VIOLATIONS_URL.to_string(),
        }
    }
}

impl Config {
    /// Reads the key=value file and then applies `OSIRIS_*` environment
    /// overrides. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            config.set(key.trim(), value.trim());
        }
        config
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in [
            ("OSIRIS_API_KEY", "api_key"),
            ("OSIRIS_ACCOUNT_ID", "account_id"),
            ("OSIRIS_REFRESH_INTERVAL", "refresh_interval"),
        ] {
            if let Some(value) = lookup(var) {
                if !value.trim().is_empty() {
                    self.set(key, value.trim());
                }
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match key {
            "api_key" => self.api_key = value.to_string(),
            "account_id" => self.account_id = value.to_string(),
            "refresh_interval" => {
                if let Ok(secs) = value.parse::<u64>() {
                    self.refresh_interval_secs = secs.max(1);
                }
            }
            "graphql_url" => self.graphql_url = value.to_string(),
            "violations_url" => self.violations_url = value.to_string(),
            _ => {}
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.account_id.trim().is_empty()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// `~/.osiris`, or a relative `.osiris` when no home directory is known.
pub fn state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(STATE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(STATE_DIR_NAME))
}

pub fn default_config_path() -> PathBuf {
    state_dir().join("config")
}

pub fn default_log_path() -> PathBuf {
    state_dir().join("debug.log")
}
