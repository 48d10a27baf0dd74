use std::path::PathBuf;

use crate::{Error, Result};

/// Process-level configuration loaded from environment variables at startup.
///
/// Tracker tuning (windows, threshold, retention, marketplace filters) lives in
/// the TOML file pointed at by `tracker_config_path`.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram: Option<TelegramSettings>,

    // Tracker config file path
    pub tracker_config_path: String,

    // Directory holding the persisted price history
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: i64,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram = match (get("TELEGRAM_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => {
                let chat_id = chat_id.trim().parse::<i64>().map_err(|_| {
                    Error::Config(format!(
                        "TELEGRAM_CHAT_ID must be a numeric chat id, got: '{}'",
                        chat_id.trim()
                    ))
                })?;
                Some(TelegramSettings { token, chat_id })
            }
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "TELEGRAM_TOKEN and TELEGRAM_CHAT_ID must be set together".into(),
                ))
            }
        };

        Ok(Config {
            telegram,
            tracker_config_path: get("TRACKER_CONFIG_PATH")
                .unwrap_or_else(|| "config/tracker.toml".to_string()),
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}
