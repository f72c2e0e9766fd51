// 🎲 Demo Seeding - the lot as it looks when the app starts
//
// Each slot is independently occupied with probability `occupancy` by a
// random "KSA-dddd" plate that arrived within the last two hours.
// Same seed + same start time → same lot.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

use crate::slots::{Slot, SlotRegistry};

/// Longest pre-existing stay, in milliseconds (two hours)
const MAX_SEEDED_STAY_MS: i64 = 2 * 60 * 60 * 1000;

/// Distinct "KSA-dddd" plates (1000..=9999)
pub const PLATE_SPACE: usize = 9000;

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub total_slots: u32,
    /// Probability that a slot starts OCCUPIED (0.0 - 1.0)
    pub occupancy: f64,
    /// Fixed seed for a reproducible lot; None draws one from the OS
    pub seed: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            total_slots: 24,
            occupancy: 0.3,
            seed: None,
        }
    }
}

/// Build the randomized starting lot
pub fn seed_slots(options: &SeedOptions, now: DateTime<Utc>) -> SlotRegistry {
    let mut rng = match options.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let occupancy = options.occupancy.clamp(0.0, 1.0);

    let mut plates = HashSet::new();
    let slots = (1..=options.total_slots)
        .map(|i| {
            let mut slot = Slot::new(i, format!("A-{}", i), 1);
            // Once every plate is in use the remaining slots stay AVAILABLE
            if plates.len() < PLATE_SPACE && rng.gen_bool(occupancy) {
                let plate = loop {
                    let candidate = format!("KSA-{}", rng.gen_range(1000..=9999));
                    if plates.insert(candidate.clone()) {
                        break candidate;
                    }
                };
                let stay = Duration::milliseconds(rng.gen_range(0..MAX_SEEDED_STAY_MS));
                slot.occupy(plate, now - stay);
            }
            slot
        })
        .collect();

    let registry = SlotRegistry::from_slots(slots);
    tracing::debug!(
        total = registry.len(),
        occupied = registry.count_by_status(crate::slots::SlotStatus::Occupied),
        "seeded demo lot"
    );
    registry
}

// ============================================================================
// TESTS
// ============================================================================
