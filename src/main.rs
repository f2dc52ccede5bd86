//! SIGNALBOARD: prediction acquisition and signal orchestration
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the backend gateway into the orchestrator, optionally warms the
//! dashboard, and serves the JSON API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use signalboard::config;
use signalboard::dashboard::{self, DashboardState};
use signalboard::engine::build_orchestrator;
use signalboard::engine::orchestrator::DashboardSnapshot;
use signalboard::engine::rotator::TrendingRotator;
use signalboard::services::backend::BackendClient;

const BANNER: &str = r#"
 ___ ___ ___ _  _   _   _    ___  ___   _   ___ ___
/ __|_ _/ __| \| | /_\ | |  | _ )/ _ \ /_\ | _ \   \
\__ \| | (_ | .` |/ _ \| |__| _ \ (_) / _ \|   / |) |
|___/___\___|_|\_/_/ \_\____|___/\___/_/ \_\_|_\___/

  AI trading signals, fetched or generated on demand
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        backend = %cfg.backend.base_url,
        recent_limit = cfg.orchestrator.recent_limit,
        dashboard = cfg.dashboard.enabled,
        "SIGNALBOARD starting up"
    );

    // -- Initialise components -------------------------------------------

    let api_key = cfg.backend_api_key()?;
    let backend = Arc::new(BackendClient::new(&cfg.backend, api_key)?);

    let rotator = TrendingRotator::new();
    info!(
        group = rotator.todays_index(),
        symbols = ?rotator.todays_symbols(),
        "Today's trending group"
    );

    let orchestrator = build_orchestrator(
        backend.clone(),
        backend.clone(),
        backend,
        rotator,
        &cfg.orchestrator,
    );
    let state = Arc::new(DashboardState::new(orchestrator));

    if cfg.dashboard.warm_on_start || !cfg.dashboard.enabled {
        match state.orchestrator.initialize().await {
            Ok(snapshot) => {
                log_snapshot(&snapshot);
                state.publish(snapshot).await;
            }
            Err(e) => {
                error!(error = %e, timed_out = e.is_timeout(), "Initial load failed");
            }
        }
    }

    if !cfg.dashboard.enabled {
        info!("Dashboard disabled, exiting after initial load.");
        return Ok(());
    }

    // -- Serve -----------------------------------------------------------

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received.");
    };

    info!(port = cfg.dashboard.port, "Serving dashboard. Press Ctrl+C to stop.");
    dashboard::serve(state, cfg.dashboard.port, shutdown).await?;

    info!("SIGNALBOARD shut down cleanly.");
    Ok(())
}

/// Log a human-readable snapshot summary.
fn log_snapshot(snapshot: &DashboardSnapshot) {
    let summary = snapshot.signal_summary();
    info!(
        predictions = snapshot.predictions.len(),
        priced = snapshot.quotes.len(),
        buy = summary.buy,
        sell = summary.sell,
        hold = summary.hold,
        "Dashboard loaded"
    );
    if let Some(outcome) = &snapshot.generation {
        info!(
            attempted = outcome.attempted(),
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Cold-start generation ran"
        );
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("signalboard=info"));

    let json_logging = std::env::var("SIGNALBOARD_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
