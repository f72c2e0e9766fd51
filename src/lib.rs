// SmartPark - Core Library
// Exposes all modules for use in the TUI, the API server, and tests

pub mod access;
pub mod analysis;
pub mod billing;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod ledger;
pub mod logging;
pub mod lot;
pub mod seed;
pub mod slots;
pub mod tasks;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use access::{AdminCredentials, Role, View};
pub use analysis::{
    analyze_or_fallback, AnalysisRequest, AnalysisResult, Analyst, GeminiAnalyst,
};
pub use billing::{billable_minutes, compute_cost, Invoice};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{AnalysisError, LotError, LotResult};
pub use export::{export_to_dir, transactions_to_csv, transactions_to_json};
pub use ledger::{ParkingTransaction, TransactionLog, TransactionStatus};
pub use lot::{ParkingLot, ParkingStats, DEFAULT_MINUTE_RATE};
pub use seed::{seed_slots, SeedOptions};
pub use slots::{Slot, SlotRegistry, SlotStatus};
pub use tasks::{completion_ratio, task_sections, TaskSection};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the starting lot described by the configuration
pub fn build_lot(config: &AppConfig) -> ParkingLot {
    let clock = SystemClock;
    let slots = seed_slots(&config.seed_options(), clock.now());
    ParkingLot::new(slots, config.minute_rate)
}
