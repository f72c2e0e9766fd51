// ⚠️ Error types - what can go wrong at the kiosk, the settings page and the AI call
//
// Lot operations fail with LotError (shown to the operator as-is).
// The AI collaborator fails with AnalysisError, which never reaches the user:
// callers swap it for the fallback analysis.

use thiserror::Error;

use crate::access::View;

/// Errors raised by lot operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LotError {
    /// Plate was blank after trimming
    #[error("Plate number is required")]
    EmptyPlate,

    /// Vehicle is already parked
    #[error("Vehicle {0} is already parked in the lot")]
    DuplicatePlate(String),

    /// No AVAILABLE slot left
    #[error("The lot is completely full")]
    LotFull,

    /// No slot is occupied by this plate
    #[error("Vehicle {0} was not found in the lot")]
    PlateNotFound(String),

    /// Slot is occupied but its entry time was never recorded
    #[error("Entry time is not recorded for vehicle {0}")]
    MissingEntryTime(String),

    /// Invoice no longer matches the slot it was issued for
    #[error("Invoice for {plate} no longer matches slot {slot_label}")]
    StaleInvoice { plate: String, slot_label: String },

    /// Invoice figures do not add up (edited or forged before payment)
    #[error("Invoice for {0} does not match the lot's billing")]
    InvalidInvoice(String),

    #[error("Slot {0} does not exist")]
    SlotNotFound(u32),

    /// Admin tried to change the status of a slot with a car in it
    #[error("Slot {0} is occupied")]
    SlotOccupied(String),

    /// OCCUPIED can only be reached through vehicle entry
    #[error("Slot status cannot be set to {0}")]
    InvalidStatusChange(String),

    #[error("Slot label is required")]
    EmptyLabel,

    #[error("Slot {0} already exists")]
    DuplicateLabel(String),

    #[error("Floor must be 1 or higher, got {0}")]
    InvalidFloor(i32),

    #[error("Minute rate must be greater than zero")]
    InvalidRate,

    #[error("Invalid username or password")]
    InvalidCredentials,

    /// No session, or a session the server does not know
    #[error("Login required")]
    LoginRequired,

    #[error("{} is not available for this role", .0.title())]
    AccessDenied(View),
}

pub type LotResult<T> = std::result::Result<T, LotError>;

/// Errors from the remote text-generation service
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no API key configured for the analysis service")]
    MissingApiKey,

    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analysis service returned HTTP {0}")]
    Status(u16),

    #[error("analysis reply had no text content")]
    EmptyReply,

    #[error("analysis reply is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
