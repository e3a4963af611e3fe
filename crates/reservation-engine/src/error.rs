//! Error types for reservation-engine operations.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::reservation::ReservationStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("No table available for a party of {party_size} on {date} at {}", .time.format("%H:%M"))]
    NoAvailability {
        party_size: u32,
        date: NaiveDate,
        time: NaiveTime,
    },

    #[error("Table unavailable: {0}")]
    TableUnavailable(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl EngineError {
    pub(crate) fn table_not_found(id: &str) -> Self {
        EngineError::NotFound {
            kind: "Table",
            id: id.to_string(),
        }
    }

    pub(crate) fn reservation_not_found(id: &str) -> Self {
        EngineError::NotFound {
            kind: "Reservation",
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
