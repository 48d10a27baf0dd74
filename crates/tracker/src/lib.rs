pub mod alert;
pub mod config;
pub mod delta;
pub mod format;
pub mod history;
pub mod notifier;
pub mod persistence;

pub use alert::{AlertStateMachine, Baseline};
pub use config::{Language, SourceConfig, TrackerFileConfig};
pub use delta::{SideDeltas, WindowDelta, WindowDeltaCalculator};
pub use format::MessageFormatter;
pub use history::{AppendOutcome, SampleStore};
pub use notifier::{NotificationLifecycleManager, StatusOutcome};
pub use persistence::{HistoryFile, HistoryPersistence, RetentionConfig};
