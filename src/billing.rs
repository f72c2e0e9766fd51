// 💵 Billing Calculator
//
// cost = max(1, ceil(elapsed / 1 minute)) × rate
// Minimum charge is one minute, also when the clock reads before the entry time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Billable minutes between entry and exit, rounded up, at least one
pub fn billable_minutes(entry_time: DateTime<Utc>, exit_time: DateTime<Utc>) -> u64 {
    let elapsed_ms = (exit_time - entry_time).num_milliseconds();
    if elapsed_ms <= 0 {
        return 1;
    }

    let minutes = (elapsed_ms + MILLIS_PER_MINUTE - 1) / MILLIS_PER_MINUTE;
    (minutes as u64).max(1)
}

/// Parking cost for one session
pub fn compute_cost(
    entry_time: DateTime<Utc>,
    exit_time: DateTime<Utc>,
    rate_per_minute: u64,
) -> u64 {
    billable_minutes(entry_time, exit_time) * rate_per_minute
}

// ============================================================================
// INVOICE
// ============================================================================

/// Bill handed to the payment step on exit request
///
/// Issuing an invoice changes nothing in the lot; only confirming it does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub plate_number: String,
    pub slot_id: u32,
    pub slot_label: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub duration_minutes: u64,
    pub rate_per_minute: u64,
    pub total_cost: u64,
}

impl Invoice {
    pub fn new(
        plate_number: String,
        slot_id: u32,
        slot_label: String,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        rate_per_minute: u64,
    ) -> Self {
        let duration_minutes = billable_minutes(entry_time, exit_time);
        Invoice {
            plate_number,
            slot_id,
            slot_label,
            entry_time,
            exit_time,
            duration_minutes,
            rate_per_minute,
            total_cost: duration_minutes * rate_per_minute,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_ninety_seconds_rounds_up_to_two_minutes() {
        let exit = t0() + Duration::seconds(90);

        assert_eq!(billable_minutes(t0(), exit), 2);
        assert_eq!(compute_cost(t0(), exit, 10), 20);
    }

    #[test]
    fn test_minimum_charge_is_one_minute() {
        assert_eq!(billable_minutes(t0(), t0()), 1);
        assert_eq!(billable_minutes(t0(), t0() + Duration::milliseconds(1)), 1);
        assert_eq!(compute_cost(t0(), t0() - Duration::minutes(5), 10), 10);
    }

    #[test]
    fn test_exact_minutes_are_not_rounded_up() {
        assert_eq!(billable_minutes(t0(), t0() + Duration::minutes(3)), 3);
        assert_eq!(billable_minutes(t0(), t0() + Duration::minutes(3) + Duration::milliseconds(1)), 4);
    }

    #[test]
    fn test_invoice_totals() {
        let invoice = Invoice::new(
            "KSA-4821".to_string(),
            3,
            "A-3".to_string(),
            t0(),
            t0() + Duration::minutes(45),
            15,
        );

        assert_eq!(invoice.duration_minutes, 45);
        assert_eq!(invoice.total_cost, 675);
    }
}
