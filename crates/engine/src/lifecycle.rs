use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use common::{NotificationTransport, PriceSource, Side};
use tracker::{
    AlertStateMachine, AppendOutcome, HistoryPersistence, MessageFormatter,
    NotificationLifecycleManager, SampleStore, TrackerFileConfig, WindowDeltaCalculator,
};

/// Consecutive fetch failures tolerated before the loop starts backing off.
const FAILURE_BACKOFF_AFTER: u32 = 5;
const MAX_FAILURE_BACKOFF_SECS: u64 = 300;

/// Cloneable handle used to stop a running tracker.
#[derive(Clone)]
pub struct TrackerHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl TrackerHandle {
    /// Ask the tracker to stop. The current tick finishes, then history is
    /// saved one last time.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// What a single tick accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sample_recorded: bool,
    pub alerts: usize,
    pub alert_delivered: bool,
    pub status_delivered: bool,
    pub persisted: bool,
}

/// The polling loop: fetch, record, compare, alert, report, persist.
pub struct Tracker {
    source: Arc<dyn PriceSource>,
    store: SampleStore,
    deltas: WindowDeltaCalculator,
    alerts: AlertStateMachine,
    notifier: NotificationLifecycleManager,
    formatter: MessageFormatter,
    persistence: Option<HistoryPersistence>,
    check_interval: Duration,
    persist_every: u32,
    status_updates: bool,
    recorded_since_save: u32,
    consecutive_failures: u32,
    shutdown_rx: watch::Receiver<bool>,
    #[allow(dead_code)] // kept so the shutdown channel never closes
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Tracker {
    pub fn new(
        cfg: &TrackerFileConfig,
        source: Arc<dyn PriceSource>,
        transport: Arc<dyn NotificationTransport>,
        persistence: Option<HistoryPersistence>,
    ) -> (Self, TrackerHandle) {
        let (tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(tx);

        let handle = TrackerHandle {
            shutdown_tx: shutdown_tx.clone(),
        };

        let tracker = Tracker {
            source,
            store: SampleStore::new(cfg.retention()).with_max_samples(cfg.max_samples),
            deltas: WindowDeltaCalculator::new(cfg.windows()),
            alerts: AlertStateMachine::new(cfg.alert_threshold_pct),
            notifier: NotificationLifecycleManager::new(transport),
            formatter: MessageFormatter::new(cfg.asset.clone(), cfg.fiat.clone(), cfg.language),
            persistence,
            check_interval: cfg.check_interval(),
            persist_every: cfg.persist_every_ticks.max(1),
            status_updates: cfg.status_updates,
            recorded_since_save: 0,
            consecutive_failures: 0,
            shutdown_rx,
            shutdown_tx,
        };

        (tracker, handle)
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn notifier(&self) -> &NotificationLifecycleManager {
        &self.notifier
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run one polling cycle. Failures are logged and reflected in the
    /// report; none of them stop the tracker.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let quote = match self.source.fetch_quote().await {
            Ok(quote) => {
                self.consecutive_failures = 0;
                quote
            }
            Err(e) => {
                self.consecutive_failures += 1;
                error!(failures = self.consecutive_failures, error = %e, "Price fetch failed");
                return report;
            }
        };
        let now = quote.timestamp;

        match quote.to_sample() {
            Some(sample) => match self.store.append(sample) {
                AppendOutcome::Appended { pruned } => {
                    report.sample_recorded = true;
                    self.recorded_since_save += 1;
                    debug!(retained = self.store.len(), pruned, "Sample recorded");
                }
                AppendOutcome::OutOfOrder => {
                    warn!(timestamp = %sample.timestamp, "Sample older than history tail, dropped");
                }
            },
            None => warn!("Quote is missing a side, not recorded in history"),
        }

        let deltas = self.deltas.compute(
            &self.store,
            quote.price(Side::Buy),
            quote.price(Side::Sell),
            now,
        );

        let events = self.alerts.evaluate(&quote);
        report.alerts = events.len();
        if !events.is_empty() {
            for event in &events {
                info!(
                    target: "alerts",
                    side = %event.side,
                    direction = %event.direction,
                    percent = event.percent_change,
                    from = event.from_price,
                    to = event.to_price,
                    "Sudden price change"
                );
            }
            let content = self.formatter.alert(&events, now);
            match self.notifier.fire_alert(&content).await {
                Ok(_) => report.alert_delivered = true,
                Err(e) => error!(target: "alerts", error = %e, "Alert not delivered"),
            }
        }

        if self.status_updates {
            let content = self.formatter.status(&quote, &deltas, now);
            report.status_delivered = self.notifier.update_status(&content).await.delivered();
        }

        if self.recorded_since_save >= self.persist_every {
            report.persisted = self.save();
        }

        report
    }

    fn save(&mut self) -> bool {
        let Some(persistence) = &self.persistence else {
            return false;
        };
        match persistence.save(&self.store, Utc::now()) {
            Ok(()) => {
                self.recorded_since_save = 0;
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to persist price history");
                false
            }
        }
    }

    /// Pause before the next tick, extended while the source keeps failing.
    fn next_wait(&self) -> Duration {
        let mut wait = self.check_interval;
        if self.consecutive_failures > FAILURE_BACKOFF_AFTER {
            let extra =
                (u64::from(self.consecutive_failures) * 10).min(MAX_FAILURE_BACKOFF_SECS);
            warn!(failures = self.consecutive_failures, extra_secs = extra, "Backing off");
            wait += Duration::from_secs(extra);
        }
        wait
    }

    /// Run until `TrackerHandle::shutdown`. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        if let Some(persistence) = &self.persistence {
            persistence.restore(&mut self.store, Utc::now());
        }
        info!(
            interval_secs = self.check_interval.as_secs(),
            threshold_pct = self.alerts.threshold_pct(),
            "Tracker started"
        );

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            let report = self.tick().await;
            debug!(?report, "Tick finished");

            let wait = self.next_wait();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.shutdown_rx.changed() => {}
            }
        }

        info!("Tracker stopping");
        self.save();
    }
}
