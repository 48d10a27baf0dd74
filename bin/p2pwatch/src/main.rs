use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, NotificationTransport, PriceSource};
use console::ConsoleTransport;
use engine::{P2pClient, Tracker};
use telegram_notify::TelegramTransport;
use tracker::{HistoryPersistence, RetentionConfig, TrackerFileConfig};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().unwrap_or_else(|e| panic!("{e}"));
    let tracker_cfg = TrackerFileConfig::load(&cfg.tracker_config_path)
        .unwrap_or_else(|e| panic!("{e}"));
    info!(
        pair = %format!("{}/{}", tracker_cfg.fiat, tracker_cfg.asset),
        interval_secs = tracker_cfg.check_interval_secs,
        threshold_pct = tracker_cfg.alert_threshold_pct,
        "P2PWatch starting"
    );

    // ── Price source ──────────────────────────────────────────────────────────
    let source: Arc<dyn PriceSource> = Arc::new(
        P2pClient::new(
            tracker_cfg.asset.clone(),
            tracker_cfg.fiat.clone(),
            tracker_cfg.source.clone(),
        )
        .unwrap_or_else(|e| panic!("{e}")),
    );

    // ── Transport (Telegram when configured, console otherwise) ───────────────
    let transport: Arc<dyn NotificationTransport> = match &cfg.telegram {
        Some(settings) => Arc::new(TelegramTransport::new(settings)),
        None => Arc::new(ConsoleTransport::new()),
    };

    // ── History persistence ───────────────────────────────────────────────────
    std::fs::create_dir_all(&cfg.data_dir).unwrap_or_else(|e| {
        panic!("Failed to create data dir '{}': {e}", cfg.data_dir.display())
    });
    let persistence = HistoryPersistence::new(
        &cfg.data_dir,
        RetentionConfig {
            asset: tracker_cfg.asset.clone(),
            fiat: tracker_cfg.fiat.clone(),
            check_interval_secs: tracker_cfg.check_interval_secs,
            alert_threshold_pct: tracker_cfg.alert_threshold_pct,
            retention_hours: tracker_cfg.retention_hours,
        },
    );
    info!(path = %persistence.path().display(), "History file");

    // ── Tracker ───────────────────────────────────────────────────────────────
    let (tracker, handle) = Tracker::new(&tracker_cfg, source, transport, Some(persistence));
    let task = tokio::spawn(tracker.run());

    shutdown_signal().await;
    info!("Shutdown signal received. Saving history.");
    handle.shutdown();
    let _ = task.await;
    info!("Exiting.");
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())
            .unwrap_or_else(|e| panic!("Failed to install SIGTERM handler: {e}"));
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.unwrap();
}
