use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::{Error, PriceSample, Result};

use crate::history::SampleStore;

/// Settings recorded alongside the history for reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub asset: String,
    pub fiat: String,
    pub check_interval_secs: u64,
    pub alert_threshold_pct: f64,
    pub retention_hours: u32,
}

/// On-disk snapshot of the price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryFile {
    pub last_updated: DateTime<Utc>,
    pub retention_config: RetentionConfig,
    pub history: Vec<PriceSample>,
}

/// Same shape as `HistoryFile`, but entries stay raw so one bad entry
/// does not discard the whole file.
#[derive(Deserialize)]
struct RawHistoryFile {
    #[serde(default)]
    history: Vec<serde_json::Value>,
}

/// JSON history file written atomically (temp file, then rename).
#[derive(Debug, Clone)]
pub struct HistoryPersistence {
    path: PathBuf,
    retention_config: RetentionConfig,
}

impl HistoryPersistence {
    pub fn new(data_dir: impl AsRef<Path>, retention_config: RetentionConfig) -> Self {
        let file_name = format!(
            "price_history_{}_{}.json",
            retention_config.fiat, retention_config.asset
        );
        Self {
            path: data_dir.as_ref().join(file_name),
            retention_config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, store: &SampleStore, now: DateTime<Utc>) -> Result<()> {
        let file = HistoryFile {
            last_updated: now,
            retention_config: self.retention_config.clone(),
            history: store.iter().copied().collect(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| Error::Persistence(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Persistence(format!("rename to {}: {e}", self.path.display())))?;

        info!(readings = file.history.len(), path = %self.path.display(), "Saved price history");
        Ok(())
    }

    /// Read persisted samples. A missing or unreadable file yields an empty
    /// history; malformed entries are skipped.
    pub fn load(&self) -> Vec<PriceSample> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No history file found, starting fresh");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read history file");
                return Vec::new();
            }
        };

        let raw: RawHistoryFile = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable history file, starting fresh");
                return Vec::new();
            }
        };

        let mut skipped = 0;
        let samples: Vec<PriceSample> = raw
            .history
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(sample) => Some(sample),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "Skipping invalid history entry");
                    None
                }
            })
            .collect();

        info!(loaded = samples.len(), skipped, "Loaded price history");
        samples
    }

    /// Load persisted samples into `store`, pruning against `now`.
    pub fn restore(&self, store: &mut SampleStore, now: DateTime<Utc>) {
        store.seed(self.load(), now);
        info!(retained = store.len(), "History restored");
    }
}
