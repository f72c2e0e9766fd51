// 🅿️ Slot Registry - ordered physical parking spaces
//
// Invariant: a slot carries an occupant plate and an entry time
// if and only if its status is OCCUPIED.
//
// List order matters: allocation always takes the first AVAILABLE slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LotError, LotResult};

// ============================================================================
// SLOT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    /// Free for the next vehicle
    Available,

    /// A vehicle is parked here
    Occupied,

    /// Held back by an admin, never allocated
    Reserved,

    /// Out of service, never allocated
    Maintenance,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "AVAILABLE",
            SlotStatus::Occupied => "OCCUPIED",
            SlotStatus::Reserved => "RESERVED",
            SlotStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SLOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// 1-based position at creation time
    pub id: u32,

    /// Display label, e.g. "A-7"
    pub label: String,

    pub floor: i32,

    pub status: SlotStatus,

    /// Plate of the parked vehicle (OCCUPIED only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupied_by: Option<String>,

    /// When the parked vehicle arrived (OCCUPIED only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_time: Option<DateTime<Utc>>,
}

impl Slot {
    /// Create an empty, AVAILABLE slot
    pub fn new(id: u32, label: String, floor: i32) -> Self {
        Slot {
            id,
            label,
            floor,
            status: SlotStatus::Available,
            occupied_by: None,
            entry_time: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }

    /// Check if this slot is held by the given plate
    pub fn is_occupied_by(&self, plate: &str) -> bool {
        self.occupied_by.as_deref() == Some(plate)
    }

    /// Park a vehicle here (AVAILABLE → OCCUPIED)
    pub fn occupy(&mut self, plate: String, at: DateTime<Utc>) {
        self.status = SlotStatus::Occupied;
        self.occupied_by = Some(plate);
        self.entry_time = Some(at);
    }

    /// Free the slot (OCCUPIED → AVAILABLE)
    pub fn release(&mut self) {
        self.status = SlotStatus::Available;
        self.occupied_by = None;
        self.entry_time = None;
    }

    /// Plate and entry time are present iff OCCUPIED
    pub fn is_consistent(&self) -> bool {
        let occupied = self.status == SlotStatus::Occupied;
        occupied == self.occupied_by.is_some() && occupied == self.entry_time.is_some()
    }
}

// ============================================================================
// SLOT REGISTRY
// ============================================================================

/// All slots of the lot, in display order. Slots are never removed.
#[derive(Debug, Clone, Default)]
pub struct SlotRegistry {
    slots: Vec<Slot>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        SlotRegistry { slots: Vec::new() }
    }

    pub fn from_slots(slots: Vec<Slot>) -> Self {
        SlotRegistry { slots }
    }

    /// Create `count` AVAILABLE slots labelled A-1..A-count on floor 1
    pub fn with_capacity(count: u32) -> Self {
        let slots = (1..=count)
            .map(|i| Slot::new(i, format!("A-{}", i), 1))
            .collect();
        SlotRegistry { slots }
    }

    pub fn all(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    /// First AVAILABLE slot in list order
    pub fn first_available_mut(&mut self) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.is_available())
    }

    pub fn find_by_plate(&self, plate: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.is_occupied_by(plate))
    }

    pub fn count_by_status(&self, status: SlotStatus) -> usize {
        self.slots.iter().filter(|s| s.status == status).count()
    }

    /// Append a new AVAILABLE slot (id = count + 1)
    pub fn add_slot(&mut self, label: &str, floor: i32) -> LotResult<&Slot> {
        let label = label.trim().to_uppercase();
        if label.is_empty() {
            return Err(LotError::EmptyLabel);
        }
        if floor < 1 {
            return Err(LotError::InvalidFloor(floor));
        }
        if self.slots.iter().any(|s| s.label == label) {
            return Err(LotError::DuplicateLabel(label));
        }

        let id = self.slots.len() as u32 + 1;
        self.slots.push(Slot::new(id, label, floor));
        Ok(&self.slots[self.slots.len() - 1])
    }

    /// Admin status change for a slot without a vehicle in it
    pub fn set_status(&mut self, id: u32, status: SlotStatus) -> LotResult<&Slot> {
        if status == SlotStatus::Occupied {
            return Err(LotError::InvalidStatusChange(status.to_string()));
        }

        let slot = self.get_mut(id).ok_or(LotError::SlotNotFound(id))?;
        if slot.status == SlotStatus::Occupied {
            return Err(LotError::SlotOccupied(slot.label.clone()));
        }

        slot.status = status;
        Ok(slot)
    }

    /// Next label in the A-n series, based on the last slot
    ///
    /// Only the leading digits after the dash count: "A-24" → "A-25",
    /// "A-12B" → "A-13". A last label without a number counts as 0.
    pub fn suggested_label(&self) -> String {
        let next = match self.slots.last() {
            Some(last) => {
                last.label
                    .split('-')
                    .nth(1)
                    .map(|n| {
                        n.trim_start()
                            .chars()
                            .take_while(|c| c.is_ascii_digit())
                            .collect::<String>()
                    })
                    .and_then(|digits| digits.parse::<u32>().ok())
                    .unwrap_or(0)
                    + 1
            }
            None => 1,
        };
        format!("A-{}", next)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_labels_and_order() {
        let registry = SlotRegistry::with_capacity(3);

        let labels: Vec<&str> = registry.all().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["A-1", "A-2", "A-3"]);
        assert!(registry.all().iter().all(|s| s.is_available() && s.is_consistent()));
    }

    #[test]
    fn test_occupy_and_release_keep_invariant() {
        let mut slot = Slot::new(1, "A-1".to_string(), 1);

        slot.occupy("KSA-1234".to_string(), Utc::now());
        assert_eq!(slot.status, SlotStatus::Occupied);
        assert!(slot.is_occupied_by("KSA-1234"));
        assert!(slot.is_consistent());

        slot.release();
        assert!(slot.is_available());
        assert!(slot.occupied_by.is_none());
        assert!(slot.entry_time.is_none());
        assert!(slot.is_consistent());
    }

    #[test]
    fn test_add_slot_normalizes_and_rejects_duplicates() {
        let mut registry = SlotRegistry::with_capacity(2);

        let slot = registry.add_slot("  b-1 ", 2).unwrap();
        assert_eq!(slot.id, 3);
        assert_eq!(slot.label, "B-1");
        assert_eq!(slot.floor, 2);

        assert_eq!(
            registry.add_slot("B-1", 1),
            Err(LotError::DuplicateLabel("B-1".to_string()))
        );
        assert_eq!(registry.add_slot("   ", 1), Err(LotError::EmptyLabel));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_add_slot_rejects_floor_below_one() {
        let mut registry = SlotRegistry::with_capacity(1);

        assert_eq!(registry.add_slot("B-1", 0), Err(LotError::InvalidFloor(0)));
        assert_eq!(registry.add_slot("B-1", -2), Err(LotError::InvalidFloor(-2)));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(2).is_none());
    }

    #[test]
    fn test_suggested_label() {
        assert_eq!(SlotRegistry::new().suggested_label(), "A-1");
        assert_eq!(SlotRegistry::with_capacity(24).suggested_label(), "A-25");

        let mut registry = SlotRegistry::new();
        registry.add_slot("VIP", 1).unwrap();
        assert_eq!(registry.suggested_label(), "A-1");
    }

    #[test]
    fn test_suggested_label_uses_leading_digits() {
        let mut registry = SlotRegistry::with_capacity(2);
        registry.add_slot("A-12B", 1).unwrap();
        assert_eq!(registry.suggested_label(), "A-13");

        registry.add_slot("B-X7", 1).unwrap();
        assert_eq!(registry.suggested_label(), "A-1");
    }

    #[test]
    fn test_set_status_rules() {
        let mut registry = SlotRegistry::with_capacity(2);

        let slot = registry.set_status(1, SlotStatus::Maintenance).unwrap();
        assert_eq!(slot.status, SlotStatus::Maintenance);

        assert_eq!(
            registry.set_status(2, SlotStatus::Occupied),
            Err(LotError::InvalidStatusChange("OCCUPIED".to_string()))
        );
        assert_eq!(
            registry.set_status(9, SlotStatus::Reserved),
            Err(LotError::SlotNotFound(9))
        );

        registry.get_mut(2).unwrap().occupy("KSA-1000".to_string(), Utc::now());
        assert_eq!(
            registry.set_status(2, SlotStatus::Reserved),
            Err(LotError::SlotOccupied("A-2".to_string()))
        );
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&SlotStatus::Maintenance).unwrap();
        assert_eq!(json, "\"MAINTENANCE\"");

        let parsed: SlotStatus = serde_json::from_str("\"RESERVED\"").unwrap();
        assert_eq!(parsed, SlotStatus::Reserved);
    }
}
