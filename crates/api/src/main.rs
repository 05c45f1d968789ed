//! SiteOps Safety Monitor - Main Entry Point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::{watch, RwLock};
use tracing::{error, info};

use alerting::AlertManager;
use api::{init_logging, run_feed, run_server, AppState};
use site_monitor::settings::CONFIG_PATH_VAR;
use site_monitor::{SiteMonitor, SiteSettings};
use vehicle_registry::VehicleRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

    let settings = SiteSettings::load(config_path.as_deref()).context("failed to load settings")?;
    init_logging(&settings.logging.level, settings.logging.json)?;

    info!("=== SiteOps Safety Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let registry = VehicleRegistry::open(&settings.registry);
    let alerts = Arc::new(
        AlertManager::new(settings.alerts.clone()).context("failed to open event log")?,
    );
    let state = Arc::new(RwLock::new(AppState::new(alerts)));
    let mut monitor = SiteMonitor::new(&settings, registry);

    let listener = tokio::net::TcpListener::bind(&settings.server.addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.server.addr))?;
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = tokio::spawn(run_server(listener, state.clone(), async move {
        let _ = stop_rx.changed().await;
    }));

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &settings.feed.path {
        Some(path) => {
            info!("Reading frames from {}", path.display());
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open feed {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Reading frames from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let fed = run_feed(reader, &mut monitor, state, ctrl_c).await;

    // Save before reporting any feed error
    monitor.shutdown().context("failed to save vehicle registry")?;
    let summary = fed?;
    info!(
        "Processed {} frames ({} alerts)",
        summary.frames, summary.alerts
    );

    let _ = stop_tx.send(true);
    server.await??;

    if summary.interrupted {
        // A pending stdin read would keep the runtime from shutting down
        std::process::exit(0);
    }
    Ok(())
}
