// SmartPark - Web Server
// JSON API over one in-memory lot

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use smart_park::api::{router, AppState};
use smart_park::{build_lot, logging, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "smart-park-server", version, about = "SmartPark parking-lot API server")]
struct Args {
    /// Listen address (overrides SMARTPARK_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Seed for the starting lot (overrides SMARTPARK_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of slots (overrides SMARTPARK_TOTAL_SLOTS)
    #[arg(long)]
    slots: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_console(logging::DEFAULT_FILTER)?;

    let mut config = AppConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(slots) = args.slots {
        config.total_slots = slots;
    }
    config.validate()?;

    let lot = build_lot(&config);
    let stats = lot.stats();
    tracing::info!(
        slots = stats.total_slots,
        occupied = stats.occupied,
        rate = config.minute_rate,
        "lot initialized"
    );

    let state = AppState::new(lot, Arc::new(config.analyst()), config.admin.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!("SmartPark API listening on http://{}/api", config.bind_addr);

    axum::serve(listener, app)
        .await
        .context("Server stopped with an error")?;

    Ok(())
}
