//! Reservation records, the status state machine, and the reservation store.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::time_format::hhmm;

/// Longest seating a reservation may hold a table for.
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// Lifecycle status of a reservation.
///
/// ```text
/// confirmed ──► seated ──► completed
///     │            │
///     ├──► cancelled
///     └──► no_show ◄┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirmed,
    Seated,
    Completed,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 5] = [
        ReservationStatus::Confirmed,
        ReservationStatus::Seated,
        ReservationStatus::Completed,
        ReservationStatus::Cancelled,
        ReservationStatus::NoShow,
    ];

    /// Active reservations hold their tables; nothing else does.
    pub fn is_active(self) -> bool {
        matches!(self, ReservationStatus::Confirmed | ReservationStatus::Seated)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn can_transition_to(self, to: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, to),
            (Confirmed, Seated)
                | (Seated, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (Seated, NoShow)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Seated => "seated",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel the booking came in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationSource {
    #[default]
    Phone,
    WalkIn,
    Website,
    Email,
    ThirdParty,
    Other,
}

/// A booking for one party. `date` and `time` are restaurant wall-clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// UUID v4 assigned at creation.
    pub id: String,
    pub guest_name: String,
    /// Empty when the guest left no number; no messages are sent then.
    pub guest_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<String>,
    /// Guests to seat. Always at least one.
    pub party_size: u32,
    pub date: NaiveDate,
    /// Seating start, serialized as `HH:MM`.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Length of the seating, 1 to [`MAX_DURATION_MINUTES`].
    pub duration_minutes: u32,
    /// Primary table. For multi-table bookings this is the first of `table_ids`.
    pub table_id: Option<String>,
    /// Non-empty only when the party spans several tables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_ids: Vec<String>,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    /// Birthday, anniversary and the like.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    pub source: ReservationSource,
    /// Provider id of the calendar event, once one was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_event_id: Option<String>,
    /// Set only after the provider accepted the confirmation.
    pub sms_confirmation_sent: bool,
    /// Set only after the provider accepted the reminder.
    pub sms_reminder_sent: bool,
    /// Staff-only notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every change, including status transitions.
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Exclusive end of the seating.
    pub fn end(&self) -> NaiveDateTime {
        self.start() + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Every table this reservation holds.
    pub fn occupied_tables(&self) -> impl Iterator<Item = &str> {
        let single = if self.table_ids.is_empty() {
            self.table_id.as_deref()
        } else {
            None
        };
        self.table_ids.iter().map(String::as_str).chain(single)
    }

    pub fn uses_table(&self, table_id: &str) -> bool {
        self.occupied_tables().any(|id| id == table_id)
    }
}

/// Query over the store. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationFilter {
    pub date: Option<NaiveDate>,
    /// Inclusive.
    pub date_from: Option<NaiveDate>,
    /// Inclusive.
    pub date_to: Option<NaiveDate>,
    pub status: Option<ReservationStatus>,
    /// Matches the primary table and membership in multi-table sets.
    pub table_id: Option<String>,
    /// Case-insensitive substring.
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub party_size: Option<u32>,
}

impl ReservationFilter {
    pub fn on_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn matches(&self, r: &Reservation) -> bool {
        if self.date.is_some_and(|d| r.date != d) {
            return false;
        }
        if self.date_from.is_some_and(|d| r.date < d) {
            return false;
        }
        if self.date_to.is_some_and(|d| r.date > d) {
            return false;
        }
        if self.status.is_some_and(|s| r.status != s) {
            return false;
        }
        if let Some(table_id) = &self.table_id {
            if !r.uses_table(table_id) {
                return false;
            }
        }
        if let Some(name) = &self.guest_name {
            if !r.guest_name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(phone) = &self.guest_phone {
            if &r.guest_phone != phone {
                return false;
            }
        }
        if self.party_size.is_some_and(|p| r.party_size != p) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReservationStore {
    reservations: HashMap<String, Reservation>,
}

impl ReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed reservation. Availability is checked by the caller.
    pub fn insert(&mut self, reservation: Reservation) -> Result<Reservation> {
        if self.reservations.contains_key(&reservation.id) {
            return Err(EngineError::Conflict(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        self.reservations
            .insert(reservation.id.clone(), reservation.clone());
        Ok(reservation)
    }

    pub fn get(&self, id: &str) -> Result<Reservation> {
        self.reservations
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::reservation_not_found(id))
    }

    /// Matching reservations, newest date and time first.
    pub fn list(&self, filter: &ReservationFilter) -> Vec<Reservation> {
        let mut matched: Vec<Reservation> = self
            .reservations
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            (b.date, b.time, b.created_at, &b.id).cmp(&(a.date, a.time, a.created_at, &a.id))
        });
        matched
    }

    /// One day's reservations in service order (earliest first).
    pub fn for_date(&self, date: NaiveDate) -> Vec<Reservation> {
        let mut day: Vec<Reservation> = self
            .reservations
            .values()
            .filter(|r| r.date == date)
            .cloned()
            .collect();
        day.sort_by(|a, b| (a.time, &a.id).cmp(&(b.time, &b.id)));
        day
    }

    /// Active reservations starting at or after `from`, soonest first.
    pub fn upcoming(&self, from: NaiveDateTime, limit: usize) -> Vec<Reservation> {
        let mut next: Vec<Reservation> = self
            .reservations
            .values()
            .filter(|r| r.status.is_active() && r.start() >= from)
            .cloned()
            .collect();
        next.sort_by(|a, b| (a.start(), &a.id).cmp(&(b.start(), &b.id)));
        next.truncate(limit);
        next
    }

    /// Borrowing iterator for the availability engine.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    /// Apply `f` to a reservation in place and return the updated copy.
    pub fn modify<F>(&mut self, id: &str, now: DateTime<Utc>, f: F) -> Result<Reservation>
    where
        F: FnOnce(&mut Reservation),
    {
        let reservation = self
            .reservations
            .get_mut(id)
            .ok_or_else(|| EngineError::reservation_not_found(id))?;
        f(reservation);
        reservation.updated_at = now;
        Ok(reservation.clone())
    }

    /// Move a reservation to `to` if the state machine allows it.
    pub fn transition(
        &mut self,
        id: &str,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let reservation = self
            .reservations
            .get_mut(id)
            .ok_or_else(|| EngineError::reservation_not_found(id))?;
        let from = reservation.status;
        if !from.can_transition_to(to) {
            return Err(EngineError::InvalidStateTransition { from, to });
        }
        reservation.status = to;
        reservation.updated_at = now;
        Ok(reservation.clone())
    }

    pub fn remove(&mut self, id: &str) -> Result<Reservation> {
        self.reservations
            .remove(id)
            .ok_or_else(|| EngineError::reservation_not_found(id))
    }

    /// Whether an active reservation on or after `from` holds `table_id`.
    pub fn has_future_active_for_table(&self, table_id: &str, from: NaiveDate) -> bool {
        self.reservations
            .values()
            .any(|r| r.status.is_active() && r.date >= from && r.uses_table(table_id))
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}
