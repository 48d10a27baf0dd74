use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Result};

/// Tracker tuning file (TOML). Every field has a default, so an empty or
/// missing file yields a working configuration.
///
/// Example `config/tracker.toml`:
/// ```toml
/// asset = "USDT"
/// fiat = "VES"
/// check_interval_secs = 30
/// alert_threshold_pct = 5.0
/// windows_minutes = [15, 30, 60]
/// retention_hours = 24
/// language = "es"
///
/// [source]
/// payment_methods = ["Pago Movil"]
/// exclude_methods = ["Recarga Pines"]
/// min_amount = 5000.0
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerFileConfig {
    pub asset: String,
    pub fiat: String,
    /// Pause between the end of one tick and the start of the next.
    pub check_interval_secs: u64,
    /// Minimum absolute move from baseline, in percent, that fires an alert.
    pub alert_threshold_pct: f64,
    /// Lookback windows shown in the status message.
    pub windows_minutes: Vec<u32>,
    pub retention_hours: u32,
    /// Optional hard cap on retained samples, on top of the time horizon.
    pub max_samples: Option<usize>,
    /// Write the history file every N recorded samples.
    pub persist_every_ticks: u32,
    /// Keep the edited-in-place status message up to date.
    pub status_updates: bool,
    pub language: Language,
    pub source: SourceConfig,
}

/// Marketplace query and offer filters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Only consider offers accepting one of these payment methods (empty = any).
    pub payment_methods: Vec<String>,
    /// Drop offers accepting any of these payment methods.
    pub exclude_methods: Vec<String>,
    /// Fiat amount the offer must be able to handle (0 = no amount filter).
    pub min_amount: f64,
    pub rows: u32,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Default for TrackerFileConfig {
    fn default() -> Self {
        Self {
            asset: "USDT".into(),
            fiat: "VES".into(),
            check_interval_secs: 30,
            alert_threshold_pct: 5.0,
            windows_minutes: vec![15, 30, 60],
            retention_hours: 24,
            max_samples: None,
            persist_every_ticks: 1,
            status_updates: true,
            language: Language::En,
            source: SourceConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            payment_methods: Vec::new(),
            exclude_methods: vec!["Recarga Pines".into()],
            min_amount: 0.0,
            rows: 10,
            max_retries: 3,
            request_timeout_secs: 10,
        }
    }
}

impl TrackerFileConfig {
    /// Load and validate the file at `path`. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No tracker config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read tracker config at '{}': {e}",
                path.display()
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse tracker config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(10..=3600).contains(&self.check_interval_secs) {
            return Err(Error::Config(format!(
                "check_interval_secs must be between 10 and 3600, got {}",
                self.check_interval_secs
            )));
        }
        if !(self.alert_threshold_pct > 0.0 && self.alert_threshold_pct <= 100.0) {
            return Err(Error::Config(format!(
                "alert_threshold_pct must be in (0, 100], got {}",
                self.alert_threshold_pct
            )));
        }
        if self.windows_minutes.is_empty() || self.windows_minutes.contains(&0) {
            return Err(Error::Config(
                "windows_minutes must be a non-empty list of positive minutes".into(),
            ));
        }
        if self.retention_hours == 0 {
            return Err(Error::Config("retention_hours must be positive".into()));
        }
        if self.max_samples == Some(0) {
            return Err(Error::Config("max_samples must be positive when set".into()));
        }
        if self.persist_every_ticks == 0 {
            return Err(Error::Config("persist_every_ticks must be at least 1".into()));
        }
        if self.source.min_amount < 0.0 {
            return Err(Error::Config("source.min_amount must be non-negative".into()));
        }
        if self.source.rows == 0 {
            return Err(Error::Config("source.rows must be positive".into()));
        }
        Ok(())
    }

    pub fn windows(&self) -> Vec<Duration> {
        self.windows_minutes
            .iter()
            .map(|m| Duration::minutes(i64::from(*m)))
            .collect()
    }

    pub fn retention(&self) -> Duration {
        Duration::hours(i64::from(self.retention_hours))
    }

    pub fn check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.check_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = TrackerFileConfig::parse("").unwrap();
        assert_eq!(cfg.asset, "USDT");
        assert_eq!(cfg.fiat, "VES");
        assert_eq!(cfg.windows_minutes, vec![15, 30, 60]);
        assert_eq!(cfg.retention(), Duration::hours(24));
        assert_eq!(cfg.source.exclude_methods, vec!["Recarga Pines".to_string()]);
        assert_eq!(cfg.language, Language::En);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let cfg = TrackerFileConfig::parse(
            r#"
            fiat = "ARS"
            alert_threshold_pct = 2.5
            windows_minutes = [5, 60]
            language = "es"

            [source]
            payment_methods = ["Mercadopago"]
            min_amount = 10000.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fiat, "ARS");
        assert_eq!(cfg.alert_threshold_pct, 2.5);
        assert_eq!(cfg.windows(), vec![Duration::minutes(5), Duration::minutes(60)]);
        assert_eq!(cfg.language, Language::Es);
        assert_eq!(cfg.source.payment_methods, vec!["Mercadopago".to_string()]);
        // untouched source fields keep their defaults
        assert_eq!(cfg.source.rows, 10);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for bad in [
            "check_interval_secs = 5",
            "alert_threshold_pct = 0.0",
            "alert_threshold_pct = 150.0",
            "windows_minutes = []",
            "windows_minutes = [15, 0]",
            "retention_hours = 0",
            "persist_every_ticks = 0",
            "max_samples = 0",
            "[source]\nmin_amount = -1.0",
        ] {
            let err = TrackerFileConfig::parse(bad).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "accepted: {bad}");
        }
    }

    #[test]
    fn unknown_language_is_a_parse_error() {
        assert!(TrackerFileConfig::parse("language = \"fr\"").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = TrackerFileConfig::load("/nonexistent/tracker.toml").unwrap();
        assert_eq!(cfg.check_interval_secs, 30);
    }
}
