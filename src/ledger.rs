// 📒 Transaction Log - one record per parking session
//
// Append-only: sessions are opened ACTIVE on entry and closed COMPLETED on
// payment. Nothing is ever removed.
//
// Invariant: exit_time and cost are present iff status is COMPLETED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Active,
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "ACTIVE",
            TransactionStatus::Completed => "COMPLETED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingTransaction {
    /// Stable identity (UUID)
    pub id: String,
    pub plate_number: String,
    pub slot_label: String,
    pub entry_time: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,

    pub status: TransactionStatus,
}

impl ParkingTransaction {
    /// Open a new ACTIVE session
    pub fn open(plate_number: String, slot_label: String, entry_time: DateTime<Utc>) -> Self {
        ParkingTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            plate_number,
            slot_label,
            entry_time,
            exit_time: None,
            cost: None,
            status: TransactionStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Close the session with its exit time and amount paid
    pub fn complete(&mut self, exit_time: DateTime<Utc>, cost: u64) {
        self.exit_time = Some(exit_time);
        self.cost = Some(cost);
        self.status = TransactionStatus::Completed;
    }

    pub fn is_consistent(&self) -> bool {
        let completed = self.status == TransactionStatus::Completed;
        completed == self.exit_time.is_some() && completed == self.cost.is_some()
    }
}

// ============================================================================
// TRANSACTION LOG
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    entries: Vec<ParkingTransaction>,
}

impl TransactionLog {
    pub fn new() -> Self {
        TransactionLog { entries: Vec::new() }
    }

    /// Append an ACTIVE session and return it
    pub fn record_entry(
        &mut self,
        plate_number: &str,
        slot_label: &str,
        entry_time: DateTime<Utc>,
    ) -> &ParkingTransaction {
        self.entries.push(ParkingTransaction::open(
            plate_number.to_string(),
            slot_label.to_string(),
            entry_time,
        ));
        &self.entries[self.entries.len() - 1]
    }

    /// Mark the ACTIVE session(s) of a plate COMPLETED
    ///
    /// Returns the last session completed, or None when the plate had no open
    /// session (vehicles that were already parked at startup).
    pub fn complete(
        &mut self,
        plate_number: &str,
        exit_time: DateTime<Utc>,
        cost: u64,
    ) -> Option<ParkingTransaction> {
        let mut completed = None;
        for tx in self
            .entries
            .iter_mut()
            .filter(|tx| tx.is_active() && tx.plate_number == plate_number)
        {
            tx.complete(exit_time, cost);
            completed = Some(tx.clone());
        }
        completed
    }

    pub fn all(&self) -> &[ParkingTransaction] {
        &self.entries
    }

    /// Newest first, at most `limit`
    pub fn recent(&self, limit: usize) -> Vec<ParkingTransaction> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|tx| tx.is_active()).count()
    }

    /// Sum of all recorded costs (only COMPLETED sessions carry one)
    pub fn revenue(&self) -> u64 {
        self.entries.iter().filter_map(|tx| tx.cost).sum()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_record_and_complete() {
        let mut log = TransactionLog::new();
        let entry = Utc::now();

        let id = log.record_entry("KSA-1111", "A-1", entry).id.clone();
        assert!(!id.is_empty());
        assert_eq!(log.active_count(), 1);

        let done = log.complete("KSA-1111", entry + Duration::minutes(5), 50).unwrap();
        assert_eq!(done.id, id);
        assert_eq!(done.status, TransactionStatus::Completed);
        assert_eq!(done.cost, Some(50));
        assert!(done.is_consistent());
        assert_eq!(log.active_count(), 0);
    }

    #[test]
    fn test_complete_unknown_plate_is_noop() {
        let mut log = TransactionLog::new();
        log.record_entry("KSA-1111", "A-1", Utc::now());

        assert!(log.complete("KSA-9999", Utc::now(), 10).is_none());
        assert_eq!(log.revenue(), 0);
        assert_eq!(log.active_count(), 1);
    }

    #[test]
    fn test_revenue_sums_completed_costs() {
        let mut log = TransactionLog::new();
        let now = Utc::now();
        log.record_entry("A", "A-1", now);
        log.record_entry("B", "A-2", now);
        log.record_entry("C", "A-3", now);

        log.complete("A", now, 20);
        log.complete("C", now, 130);

        assert_eq!(log.revenue(), 150);
        assert!(log.all().iter().all(|tx| tx.is_consistent()));
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut log = TransactionLog::new();
        let now = Utc::now();
        for plate in ["P1", "P2", "P3"] {
            log.record_entry(plate, "A-1", now);
        }

        let recent: Vec<String> = log.recent(2).into_iter().map(|tx| tx.plate_number).collect();
        assert_eq!(recent, vec!["P3".to_string(), "P2".to_string()]);
    }
}
