//! Process configuration read from the environment.

use crate::error::ConfigError;
use std::{path::PathBuf, time::Duration};

pub const API_KEY_VAR: &str = "WOUNDLENS_API_KEY";
pub const FALLBACK_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "WOUNDLENS_MODEL";
pub const ENDPOINT_VAR: &str = "WOUNDLENS_ENDPOINT";
pub const HISTORY_VAR: &str = "WOUNDLENS_HISTORY";
pub const TIMEOUT_VAR: &str = "WOUNDLENS_TIMEOUT_SECS";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone, Debug)]
pub struct Config {
    /// Missing credentials only fail analysis attempts, never startup.
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub history_path: PathBuf,
    /// `None` waits for the endpoint indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_timeout = match non_empty(TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_key: non_empty(API_KEY_VAR).or_else(|| non_empty(FALLBACK_API_KEY_VAR)),
            model: non_empty(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: non_empty(ENDPOINT_VAR)
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            history_path: non_empty(HISTORY_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(default_history_path),
            request_timeout,
        })
    }
}

fn default_history_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("woundlens")
        .join("history.json")
}
