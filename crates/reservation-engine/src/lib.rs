//! # reservation-engine
//!
//! Table availability and reservation booking for restaurant agents.
//!
//! The engine owns a restaurant's tables and reservations, finds the
//! best-fitting free table for a party, and guarantees that no two active
//! reservations ever hold the same table at overlapping times. Calendar and
//! messaging integrations are best-effort: their failures are logged and
//! never undo a booking.
//!
//! ## Modules
//!
//! - [`table`]: table registry
//! - [`reservation`]: reservation records, status state machine, store
//! - [`availability`]: free-table search and the daily slot grid
//! - [`booking`]: [`BookingEngine`], the write path
//! - [`adapter`]: calendar and messaging collaborator traits
//! - [`template`]: guest message rendering
//! - [`config`]: restaurant configuration
//! - [`clock`]: injectable time source
//! - [`time_format`]: `YYYY-MM-DD` / `HH:MM` parsing and serde adapters
//! - [`logging`]: `tracing` subscriber setup
//! - [`error`]: error types

pub mod adapter;
pub mod availability;
pub mod booking;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod reservation;
pub mod table;
pub mod template;
pub mod time_format;

pub use adapter::{AdapterError, CalendarAdapter, CalendarEvent, CalendarEventPatch, Notifier};
pub use availability::{check_availability, find_available_tables, DayAvailability, TimeSlot};
pub use booking::{BookingEngine, BookingRequest, DaySummary, ReservationPatch};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{MessageTemplates, RestaurantConfig};
pub use error::EngineError;
pub use reservation::{
    Reservation, ReservationFilter, ReservationSource, ReservationStatus, ReservationStore,
};
pub use table::{NewTable, Table, TablePatch, TableRegistry};
