//! Climate API server
//!
//! Usage:
//!   climate-api                        # Serve Resources/hawaii.sqlite on 127.0.0.1:5000
//!   climate-api -c climate.yaml        # Load settings from a YAML file
//!   climate-api -d                     # Debug logging
//!
//! `CLIMATE_API_DATABASE` overrides the database path.

use anyhow::Context;
use argh::FromArgs;
use climate_api::dates::{format_date, lookback_cutoff};
use climate_api::{run_http_server, AppState, MeasurementStore, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(FromArgs)]
/// Climate API - weather observations over HTTP
struct Args {
    /// path to a YAML config file (optional)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// enable debug logging
    #[argh(switch, short = 'd')]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let mut config = ServiceConfig::load(args.config.as_deref())?;
    config.debug |= args.debug;

    // Initialize logging
    let level = if config.debug { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::init_from_env(env);

    log::info!("Starting climate-api...");

    let store = MeasurementStore::open(&config.database)
        .with_context(|| format!("failed to open store {}", config.database.display()))?;

    let reference = config.reference_date()?;
    let state = AppState {
        store: Arc::new(store),
        date_mode: config.date_mode(),
        tobs_cutoff: format_date(lookback_cutoff(reference)),
    };
    log::info!(
        "Reference date {} (tobs window after {}), date parameters: {:?}",
        config.reference_date,
        state.tobs_cutoff,
        state.date_mode
    );

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, shutting down gracefully...");
        shutdown_tx.send(()).ok();
    })?;

    run_http_server(state, &config.socket_addr(), shutdown_rx)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    log::info!("climate-api stopped.");
    Ok(())
}
