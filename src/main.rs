// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::Parser;

use smart_park::{build_lot, logging, AppConfig};

#[derive(Parser, Debug)]
#[command(name = "smart-park", version, about = "SmartPark parking-lot terminal console")]
struct Args {
    /// Seed for the starting lot (overrides SMARTPARK_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of slots (overrides SMARTPARK_TOTAL_SLOTS)
    #[arg(long)]
    slots: Option<u32>,

    /// SDG per minute (overrides SMARTPARK_MINUTE_RATE)
    #[arg(long)]
    rate: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(slots) = args.slots {
        config.total_slots = slots;
    }
    if let Some(rate) = args.rate {
        config.minute_rate = rate;
    }
    config.validate()?;

    // The terminal belongs to the UI, so logs go to a file
    logging::init_file(&config.export_dir, "smart-park.log", logging::DEFAULT_FILTER)?;

    run_ui_mode(config)
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: AppConfig) -> Result<()> {
    use std::sync::Arc;

    let lot = build_lot(&config);
    tracing::info!(
        slots = lot.slots().len(),
        rate = lot.minute_rate(),
        "starting terminal console"
    );

    let mut app = ui::App::new(
        lot,
        config.admin.clone(),
        Arc::new(config.analyst()),
        config.export_dir.clone(),
    );
    ui::run_ui(&mut app)?;

    tracing::info!(
        transactions = app.lot.transactions().len(),
        revenue = app.lot.stats().revenue,
        "terminal console closed"
    );
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(config: AppConfig) -> Result<()> {
    let lot = build_lot(&config);
    let stats = lot.stats();
    anyhow::bail!(
        "Built without the `tui` feature ({} slots ready, {} occupied). \
         Rebuild with --features tui or run smart-park-server",
        stats.total_slots,
        stats.occupied
    )
}
