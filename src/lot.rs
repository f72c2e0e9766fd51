// 🚗 Parking Lot - allocation, exit billing and payment confirmation
//
// Flow at the gate:
//   enter(plate)          → first AVAILABLE slot becomes OCCUPIED, ACTIVE transaction appended
//   request_exit(plate)   → Invoice (read-only, nothing changes yet)
//   confirm_exit(invoice) → slot AVAILABLE again, transaction COMPLETED with cost
//
// All methods are synchronous; callers that share a lot across threads
// wrap it in a single lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::billing::{billable_minutes, compute_cost, Invoice};
use crate::clock::{Clock, SystemClock};
use crate::error::{LotError, LotResult};
use crate::ledger::{ParkingTransaction, TransactionLog};
use crate::slots::{Slot, SlotRegistry, SlotStatus};

/// Default price, SDG per minute
pub const DEFAULT_MINUTE_RATE: u64 = 10;

// ============================================================================
// STATS
// ============================================================================

/// Dashboard figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingStats {
    pub total_slots: usize,
    pub occupied: usize,
    pub available: usize,
    pub reserved: usize,
    pub maintenance: usize,
    /// Sum of completed transaction costs
    pub revenue: u64,
    /// occupied / total, rounded to whole percent (0 for an empty lot)
    pub occupancy_percent: u32,
}

// ============================================================================
// PARKING LOT
// ============================================================================

pub struct ParkingLot {
    slots: SlotRegistry,
    transactions: TransactionLog,
    minute_rate: u64,
    clock: Arc<dyn Clock>,
}

impl ParkingLot {
    /// Lot on the wall clock
    pub fn new(slots: SlotRegistry, minute_rate: u64) -> Self {
        Self::with_clock(slots, minute_rate, Arc::new(SystemClock))
    }

    pub fn with_clock(slots: SlotRegistry, minute_rate: u64, clock: Arc<dyn Clock>) -> Self {
        ParkingLot {
            slots,
            transactions: TransactionLog::new(),
            minute_rate,
            clock,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        self.slots.all()
    }

    pub fn transactions(&self) -> &[ParkingTransaction] {
        self.transactions.all()
    }

    pub fn recent_transactions(&self, limit: usize) -> Vec<ParkingTransaction> {
        self.transactions.recent(limit)
    }

    pub fn minute_rate(&self) -> u64 {
        self.minute_rate
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ========================================================================
    // GATE OPERATIONS
    // ========================================================================

    /// Admit a vehicle into the first AVAILABLE slot
    pub fn enter(&mut self, plate: &str) -> LotResult<Slot> {
        let plate = normalize_plate(plate)?;

        if self.slots.find_by_plate(&plate).is_some() {
            tracing::info!(plate = %plate, "entry rejected: already parked");
            return Err(LotError::DuplicatePlate(plate));
        }

        let now = self.clock.now();
        let slot = match self.slots.first_available_mut() {
            Some(slot) => slot,
            None => {
                tracing::info!(plate = %plate, "entry rejected: lot full");
                return Err(LotError::LotFull);
            }
        };

        slot.occupy(plate.clone(), now);
        let slot = slot.clone();
        self.transactions.record_entry(&plate, &slot.label, now);

        tracing::info!(plate = %plate, slot = %slot.label, "vehicle entered");
        Ok(slot)
    }

    /// Price the stay of a parked vehicle without changing anything
    pub fn request_exit(&self, plate: &str) -> LotResult<Invoice> {
        let plate = normalize_plate(plate)?;

        let slot = self
            .slots
            .find_by_plate(&plate)
            .ok_or_else(|| LotError::PlateNotFound(plate.clone()))?;
        let entry_time = slot
            .entry_time
            .ok_or_else(|| LotError::MissingEntryTime(plate.clone()))?;

        let invoice = Invoice::new(
            plate,
            slot.id,
            slot.label.clone(),
            entry_time,
            self.clock.now(),
            self.minute_rate,
        );

        tracing::info!(
            plate = %invoice.plate_number,
            slot = %invoice.slot_label,
            minutes = invoice.duration_minutes,
            total = invoice.total_cost,
            "exit requested"
        );
        Ok(invoice)
    }

    /// Payment went through: free the slot and close the session
    ///
    /// The invoice must still describe the vehicle's current stay and its
    /// figures must be the ones `request_exit` would issue. Returns the
    /// completed transaction, or None for vehicles that were parked before
    /// the app started and so have no session.
    pub fn confirm_exit(&mut self, invoice: &Invoice) -> LotResult<Option<ParkingTransaction>> {
        let stale = || LotError::StaleInvoice {
            plate: invoice.plate_number.clone(),
            slot_label: invoice.slot_label.clone(),
        };

        let slot = self.slots.get(invoice.slot_id).ok_or_else(stale)?;
        let same_stay = slot.is_occupied_by(&invoice.plate_number)
            && slot.label == invoice.slot_label
            && slot.entry_time == Some(invoice.entry_time);
        // A rate change since the invoice was issued also makes it stale
        if !same_stay || invoice.rate_per_minute != self.minute_rate {
            tracing::warn!(plate = %invoice.plate_number, slot = %invoice.slot_label, "stale invoice rejected");
            return Err(stale());
        }
        self.check_invoice_figures(invoice)?;

        if let Some(slot) = self.slots.get_mut(invoice.slot_id) {
            slot.release();
        }
        let completed = self.transactions.complete(
            &invoice.plate_number,
            invoice.exit_time,
            invoice.total_cost,
        );

        tracing::info!(
            plate = %invoice.plate_number,
            slot = %invoice.slot_label,
            paid = invoice.total_cost,
            "exit confirmed"
        );
        Ok(completed)
    }

    /// exit within [entry, now], minutes and total recomputed from the times
    fn check_invoice_figures(&self, invoice: &Invoice) -> LotResult<()> {
        let minutes = billable_minutes(invoice.entry_time, invoice.exit_time);
        let total = compute_cost(invoice.entry_time, invoice.exit_time, invoice.rate_per_minute);

        let valid = invoice.exit_time >= invoice.entry_time
            && invoice.exit_time <= self.clock.now()
            && invoice.duration_minutes == minutes
            && invoice.total_cost == total;
        if !valid {
            tracing::warn!(
                plate = %invoice.plate_number,
                claimed = invoice.total_cost,
                expected = total,
                "invoice figures rejected"
            );
            return Err(LotError::InvalidInvoice(invoice.plate_number.clone()));
        }
        Ok(())
    }

    // ========================================================================
    // SETTINGS
    // ========================================================================

    pub fn set_minute_rate(&mut self, rate: u64) -> LotResult<()> {
        if rate == 0 {
            return Err(LotError::InvalidRate);
        }
        tracing::info!(old = self.minute_rate, new = rate, "minute rate updated");
        self.minute_rate = rate;
        Ok(())
    }

    pub fn add_slot(&mut self, label: &str, floor: i32) -> LotResult<Slot> {
        let slot = self.slots.add_slot(label, floor)?.clone();
        tracing::info!(slot = %slot.label, floor, "slot added");
        Ok(slot)
    }

    pub fn set_slot_status(&mut self, id: u32, status: SlotStatus) -> LotResult<Slot> {
        let slot = self.slots.set_status(id, status)?.clone();
        tracing::info!(slot = %slot.label, status = %status, "slot status changed");
        Ok(slot)
    }

    pub fn suggested_label(&self) -> String {
        self.slots.suggested_label()
    }

    // ========================================================================
    // REPORTING
    // ========================================================================

    pub fn stats(&self) -> ParkingStats {
        let total_slots = self.slots.len();
        let occupied = self.slots.count_by_status(SlotStatus::Occupied);
        let occupancy_percent = if self.slots.is_empty() {
            0
        } else {
            ((occupied as f64 / total_slots as f64) * 100.0).round() as u32
        };

        ParkingStats {
            total_slots,
            occupied,
            available: self.slots.count_by_status(SlotStatus::Available),
            reserved: self.slots.count_by_status(SlotStatus::Reserved),
            maintenance: self.slots.count_by_status(SlotStatus::Maintenance),
            revenue: self.transactions.revenue(),
            occupancy_percent,
        }
    }
}

/// Plates are matched trimmed and upper-cased
pub fn normalize_plate(plate: &str) -> LotResult<String> {
    let plate = plate.trim().to_uppercase();
    if plate.is_empty() {
        return Err(LotError::EmptyPlate);
    }
    Ok(plate)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ledger::TransactionStatus;
    use chrono::{Duration, TimeZone};

    fn lot_with(slots: u32, rate: u64) -> (ParkingLot, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 2, 10, 8, 0, 0).unwrap());
        let lot = ParkingLot::with_clock(
            SlotRegistry::with_capacity(slots),
            rate,
            Arc::new(clock.clone()),
        );
        (lot, clock)
    }

    #[test]
    fn test_same_plate_twice_fails() {
        let (mut lot, _) = lot_with(5, 10);

        lot.enter("KSA-1234").unwrap();
        let second = lot.enter("ksa-1234 ");

        assert_eq!(second, Err(LotError::DuplicatePlate("KSA-1234".to_string())));
        assert_eq!(lot.stats().occupied, 1);
        assert_eq!(lot.transactions().len(), 1);
    }

    #[test]
    fn test_full_lot_rejects_entry() {
        let (mut lot, _) = lot_with(2, 10);
        lot.enter("P-1").unwrap();
        lot.enter("P-2").unwrap();

        assert_eq!(lot.enter("P-3"), Err(LotError::LotFull));
        assert_eq!(lot.transactions().len(), 2);
    }

    #[test]
    fn test_empty_plate_rejected() {
        let (mut lot, _) = lot_with(2, 10);

        assert_eq!(lot.enter("   "), Err(LotError::EmptyPlate));
        assert_eq!(lot.request_exit(""), Err(LotError::EmptyPlate));
    }

    #[test]
    fn test_first_available_slot_in_order() {
        let (mut lot, _) = lot_with(4, 10);
        lot.set_slot_status(1, SlotStatus::Maintenance).unwrap();
        lot.set_slot_status(2, SlotStatus::Reserved).unwrap();

        let slot = lot.enter("P-1").unwrap();
        assert_eq!(slot.label, "A-3");

        let slot = lot.enter("P-2").unwrap();
        assert_eq!(slot.label, "A-4");

        assert_eq!(lot.enter("P-3"), Err(LotError::LotFull));
    }

    #[test]
    fn test_ninety_second_stay_costs_two_minutes() {
        let (mut lot, clock) = lot_with(3, 10);

        lot.enter("KSA-5555").unwrap();
        clock.advance(Duration::seconds(90));
        let invoice = lot.request_exit("KSA-5555").unwrap();

        assert_eq!(invoice.duration_minutes, 2);
        assert_eq!(invoice.rate_per_minute, 10);
        assert_eq!(invoice.total_cost, 20);
        assert_eq!(invoice.slot_label, "A-1");
    }

    #[test]
    fn test_request_exit_does_not_mutate() {
        let (mut lot, clock) = lot_with(3, 10);
        lot.enter("KSA-5555").unwrap();
        clock.advance(Duration::minutes(3));

        let before = lot.stats();
        lot.request_exit("KSA-5555").unwrap();

        assert_eq!(lot.stats(), before);
        assert!(lot.transactions()[0].is_active());
        assert!(lot.slots()[0].is_occupied_by("KSA-5555"));
    }

    #[test]
    fn test_unknown_plate_on_exit() {
        let (lot, _) = lot_with(3, 10);

        assert_eq!(
            lot.request_exit("NOPE-1"),
            Err(LotError::PlateNotFound("NOPE-1".to_string()))
        );
    }

    #[test]
    fn test_missing_entry_time_on_exit() {
        let mut broken = Slot::new(1, "A-1".to_string(), 1);
        broken.status = SlotStatus::Occupied;
        broken.occupied_by = Some("KSA-0001".to_string());
        let lot = ParkingLot::new(SlotRegistry::from_slots(vec![broken]), 10);

        assert_eq!(
            lot.request_exit("KSA-0001"),
            Err(LotError::MissingEntryTime("KSA-0001".to_string()))
        );
    }

    #[test]
    fn test_confirm_exit_frees_slot_and_completes_transaction() {
        let (mut lot, clock) = lot_with(3, 10);
        lot.enter("KSA-7777").unwrap();
        clock.advance(Duration::minutes(12));

        let invoice = lot.request_exit("KSA-7777").unwrap();
        let completed = lot.confirm_exit(&invoice).unwrap().unwrap();

        assert_eq!(completed.status, TransactionStatus::Completed);
        assert_eq!(completed.cost, Some(120));
        assert_eq!(completed.exit_time, Some(invoice.exit_time));

        let slot = &lot.slots()[0];
        assert_eq!(slot.status, SlotStatus::Available);
        assert!(slot.occupied_by.is_none());
        assert!(slot.entry_time.is_none());
    }

    #[test]
    fn test_confirming_twice_is_stale() {
        let (mut lot, _) = lot_with(3, 10);
        lot.enter("KSA-7777").unwrap();
        let invoice = lot.request_exit("KSA-7777").unwrap();
        lot.confirm_exit(&invoice).unwrap();

        let again = lot.confirm_exit(&invoice);
        assert_eq!(
            again,
            Err(LotError::StaleInvoice {
                plate: "KSA-7777".to_string(),
                slot_label: "A-1".to_string(),
            })
        );
        assert_eq!(lot.stats().revenue, 10);
    }

    #[test]
    fn test_old_invoice_rejected_after_reentry() {
        let (mut lot, clock) = lot_with(3, 10);
        lot.enter("P-1").unwrap();
        clock.advance(Duration::minutes(1));
        let old_invoice = lot.request_exit("P-1").unwrap();
        lot.confirm_exit(&old_invoice).unwrap();

        clock.advance(Duration::hours(3));
        let slot = lot.enter("P-1").unwrap();
        assert_eq!(slot.id, old_invoice.slot_id);
        clock.advance(Duration::hours(2));

        assert_eq!(
            lot.confirm_exit(&old_invoice),
            Err(LotError::StaleInvoice {
                plate: "P-1".to_string(),
                slot_label: "A-1".to_string(),
            })
        );
        assert!(lot.slots()[0].is_occupied_by("P-1"));
        assert!(lot.transactions()[1].is_active());
        assert_eq!(lot.stats().revenue, 10);

        let invoice = lot.request_exit("P-1").unwrap();
        assert_eq!(invoice.total_cost, 1200);
        assert!(lot.confirm_exit(&invoice).is_ok());
        assert_eq!(lot.stats().revenue, 1210);
    }

    #[test]
    fn test_edited_invoice_figures_rejected() {
        let (mut lot, clock) = lot_with(3, 10);
        lot.enter("P-1").unwrap();
        clock.advance(Duration::hours(5));
        let invoice = lot.request_exit("P-1").unwrap();
        assert_eq!(invoice.total_cost, 3000);

        let mut free = invoice.clone();
        free.total_cost = 0;
        assert_eq!(lot.confirm_exit(&free), Err(LotError::InvalidInvoice("P-1".to_string())));

        let mut short = invoice.clone();
        short.duration_minutes = 1;
        assert_eq!(lot.confirm_exit(&short), Err(LotError::InvalidInvoice("P-1".to_string())));

        // Consistent figures, but the exit is before the entry
        let backwards = Invoice::new(
            invoice.plate_number.clone(),
            invoice.slot_id,
            invoice.slot_label.clone(),
            invoice.entry_time,
            invoice.entry_time - Duration::minutes(30),
            10,
        );
        assert_eq!(lot.confirm_exit(&backwards), Err(LotError::InvalidInvoice("P-1".to_string())));

        // Consistent figures, but the exit has not happened yet
        let future = Invoice::new(
            invoice.plate_number.clone(),
            invoice.slot_id,
            invoice.slot_label.clone(),
            invoice.entry_time,
            lot.now() + Duration::hours(1),
            10,
        );
        assert_eq!(lot.confirm_exit(&future), Err(LotError::InvalidInvoice("P-1".to_string())));

        assert_eq!(lot.stats().occupied, 1);
        assert_eq!(lot.stats().revenue, 0);
        assert!(lot.confirm_exit(&invoice).is_ok());
        assert_eq!(lot.stats().revenue, 3000);
    }

    #[test]
    fn test_invoice_stale_after_rate_change() {
        let (mut lot, clock) = lot_with(2, 10);
        lot.enter("P-1").unwrap();
        clock.advance(Duration::minutes(4));
        let invoice = lot.request_exit("P-1").unwrap();

        lot.set_minute_rate(20).unwrap();
        assert!(matches!(lot.confirm_exit(&invoice), Err(LotError::StaleInvoice { .. })));

        let invoice = lot.request_exit("P-1").unwrap();
        assert_eq!(invoice.total_cost, 80);
        assert!(lot.confirm_exit(&invoice).is_ok());
    }

    #[test]
    fn test_seeded_vehicle_exits_without_transaction() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 2, 10, 8, 0, 0).unwrap());
        let mut registry = SlotRegistry::with_capacity(2);
        registry
            .get_mut(2)
            .unwrap()
            .occupy("KSA-2020".to_string(), clock.now() - Duration::minutes(30));
        let mut lot = ParkingLot::with_clock(registry, 10, Arc::new(clock));

        let invoice = lot.request_exit("KSA-2020").unwrap();
        assert_eq!(invoice.total_cost, 300);

        assert_eq!(lot.confirm_exit(&invoice), Ok(None));
        assert_eq!(lot.stats().occupied, 0);
        assert_eq!(lot.stats().revenue, 0);
    }

    #[test]
    fn test_revenue_matches_completed_costs() {
        let (mut lot, clock) = lot_with(5, 10);
        for plate in ["P-1", "P-2", "P-3"] {
            lot.enter(plate).unwrap();
        }
        clock.advance(Duration::seconds(61));

        for plate in ["P-1", "P-3"] {
            let invoice = lot.request_exit(plate).unwrap();
            lot.confirm_exit(&invoice).unwrap();
        }

        let completed_sum: u64 = lot
            .transactions()
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .filter_map(|tx| tx.cost)
            .sum();

        assert_eq!(completed_sum, 40);
        assert_eq!(lot.stats().revenue, completed_sum);
    }

    #[test]
    fn test_rate_change_applies_to_next_invoice() {
        let (mut lot, clock) = lot_with(2, 10);
        lot.enter("P-1").unwrap();
        clock.advance(Duration::minutes(2));

        assert_eq!(lot.set_minute_rate(0), Err(LotError::InvalidRate));
        lot.set_minute_rate(25).unwrap();

        assert_eq!(lot.request_exit("P-1").unwrap().total_cost, 50);
    }

    #[test]
    fn test_stats() {
        let (mut lot, _) = lot_with(4, 10);
        lot.enter("P-1").unwrap();
        lot.set_slot_status(4, SlotStatus::Maintenance).unwrap();
        lot.add_slot("b-1", 2).unwrap();

        let stats = lot.stats();
        assert_eq!(stats.total_slots, 5);
        assert_eq!(stats.occupied, 1);
        assert_eq!(stats.available, 3);
        assert_eq!(stats.maintenance, 1);
        assert_eq!(stats.occupancy_percent, 20);
    }
}
