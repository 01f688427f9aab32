//! Configuration loader and validator for the homework status bot.
//!
//! Secrets always come from the environment (optionally seeded from `.env`);
//! tuning knobs come from an optional YAML file and fall back to defaults.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";
pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Everything the bot needs, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub tuning: Tuning,
}

/// Optional knobs, read from the YAML file passed with `--config`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Tuning {
    pub endpoint: String,
    pub retry_interval_secs: u64,
    pub lookback_secs: u64,
    pub request_timeout_secs: u64,
    pub log_file: String,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            retry_interval_secs: 600,
            lookback_secs: 30 * 24 * 60 * 60,
            request_timeout_secs: 30,
            log_file: "homework_bot.log".to_string(),
        }
    }
}

impl Tuning {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed endpoint. Only fails on a config that skipped `validate`.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.endpoint).map_err(|_| ConfigError::Invalid("endpoint must be a valid URL"))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("practicum_token", &"[REDACTED]")
            .field("telegram_token", &"[REDACTED]")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl Config {
    /// Load `.env` (if any), read secrets from the process environment and
    /// tuning from `tuning_path` when given.
    pub fn load(tuning_path: Option<&Path>) -> Result<Config, ConfigError> {
        dotenvy::dotenv().ok();
        let tuning = match tuning_path {
            Some(path) => load_tuning(path)?,
            None => Tuning::default(),
        };
        Self::from_lookup(|key| std::env::var(key).ok(), tuning)
    }

    /// Build a config from an arbitrary key lookup. Blank values count as
    /// missing; every missing key is reported at once.
    pub fn from_lookup<F>(lookup: F, tuning: Tuning) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |key: &'static str| -> String {
            match lookup(key).map(|v| v.trim().to_string()) {
                Some(v) if !v.is_empty() => v,
                _ => {
                    missing.push(key);
                    String::new()
                }
            }
        };

        let practicum_token = required(PRACTICUM_TOKEN);
        let telegram_token = required(TELEGRAM_TOKEN);
        let telegram_chat_id = required(TELEGRAM_CHAT_ID);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let cfg = Config {
            practicum_token,
            telegram_token,
            telegram_chat_id,
            tuning,
        };
        validate(&cfg)?;
        Ok(cfg)
    }
}

/// Read a YAML tuning file. Unknown keys are ignored, absent keys default.
pub fn load_tuning(path: &Path) -> Result<Tuning, ConfigError> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Tuning::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let tuning = &cfg.tuning;
    if tuning.retry_interval_secs == 0 {
        return Err(ConfigError::Invalid("retry_interval_secs must be > 0"));
    }
    if tuning.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("request_timeout_secs must be > 0"));
    }
    if tuning.log_file.trim().is_empty() {
        return Err(ConfigError::Invalid("log_file must be non-empty"));
    }
    tuning.endpoint_url()?;
    Ok(())
}

/// Example tuning file with every knob at its default.
pub fn example() -> &'static str {
    r#"endpoint: "https://practicum.yandex.ru/api/user_api/homework_statuses/"
retry_interval_secs: 600
lookback_secs: 2592000
request_timeout_secs: 30
log_file: "homework_bot.log"
"#
}
