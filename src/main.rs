//! geofix - Location Acquisition Service with Hexagonal Architecture
//!
//! This is the composition root that wires together all the components.

use geofix::adapters::inbound::{AutoApproveHost, ConsoleSubscriber};
use geofix::adapters::outbound::{DashMapFlagStore, Scenario, SimulatedBackend, SqliteFlagStore};
use geofix::infrastructure::{graceful_stop, shutdown_signal};
use geofix::{load_config, LocationService, ResolutionFlagStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

const RESOLUTION_APPROVE_DELAY: Duration = Duration::from_millis(500);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;
    let service_config = cfg.service_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        "starting geofix mode={} priority={} scenario={} (hexagonal architecture)",
        cfg.mode,
        service_config.request.priority,
        cfg.sim_scenario
    );

    // ===== COMPOSITION ROOT =====

    // 1. Outbound adapters

    // Resolution flag store (SQLite when a path is configured, else in-memory)
    let store: Arc<dyn ResolutionFlagStore> = match &cfg.state_db_path {
        Some(path) => {
            let store = SqliteFlagStore::open(path)?;
            tracing::info!("resolution flags persisted in {}", path);
            Arc::new(store)
        }
        None => Arc::new(DashMapFlagStore::new()),
    };

    // Positioning backend (simulated)
    let backend = Arc::new(SimulatedBackend::new(cfg.sim_origin));
    match Scenario::from_str(&cfg.sim_scenario) {
        Some(scenario) => backend.apply_scenario(scenario),
        None => tracing::warn!("unknown scenario {:?}, using ok", cfg.sim_scenario),
    }
    let drift = backend.start_drift(service_config.request.fastest_interval);

    // 2. Application service
    let service = LocationService::new(backend.clone(), store, service_config);

    // 3. Inbound adapter
    let host = AutoApproveHost::new(&service, RESOLUTION_APPROVE_DELAY).into_handle();
    let subscriber = Arc::new(ConsoleSubscriber::new(cfg.json_output).with_resolution_host(host));

    if cfg.one_shot() {
        service.request_one_shot(subscriber.clone())?;
    } else {
        service.start_tracking(subscriber.clone())?;
    }

    shutdown_signal().await?;

    if !graceful_stop(&service, SHUTDOWN_TIMEOUT).await {
        tracing::warn!("location service did not stop cleanly");
    }
    drift.abort();

    tracing::info!(
        "delivered {} readings, last known {}",
        subscriber.delivered(),
        service
            .current_coordinate()
            .map(|c| c.to_string())
            .unwrap_or_else(|e| e.to_string())
    );

    Ok(())
}
