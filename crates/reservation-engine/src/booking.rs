//! BookingEngine - the reservation write path
//!
//! One engine serves one restaurant profile. All tables and reservations live
//! behind a single `RwLock`; every mutation takes the write lock, so the
//! availability check and the insert that depends on it happen atomically.
//!
//! # Booking Flow
//!
//! ```text
//! create_reservation(request)
//!     ├─ 1. Validate the request
//!     ├─ 2. Resolve the seating duration
//!     ├─ 3. [write lock] Find available tables
//!     ├─ 4. [write lock] Verify the requested table(s) or pick the best fit
//!     ├─ 5. [write lock] Insert with status = confirmed
//!     ├─ 6. Create the calendar event (best-effort, bounded)
//!     ├─ 7. Send the confirmation message (best-effort, bounded)
//!     └─ 8. [write lock] Record event id / SMS flag and return
//! ```
//!
//! The lock is never held across an adapter call.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapter::{self, CalendarAdapter, CalendarEvent, CalendarEventPatch, Notifier};
use crate::availability::{self, AvailabilityQuery, DayAvailability};
use crate::clock::{Clock, SystemClock};
use crate::config::RestaurantConfig;
use crate::error::{EngineError, Result};
use crate::reservation::{
    Reservation, ReservationFilter, ReservationSource, ReservationStatus, ReservationStore,
    MAX_DURATION_MINUTES,
};
use crate::table::{NewTable, Table, TablePatch, TableRegistry};
use crate::template::{self, TemplateVars};
use crate::time_format::{hhmm, hhmm_option};

/// Incoming booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub guest_name: String,
    pub guest_phone: String,
    #[serde(default)]
    pub guest_email: Option<String>,
    pub party_size: u32,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Falls back to the configured default duration.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    /// Requested table. Omit to let the engine pick the best fit.
    #[serde(default)]
    pub table_id: Option<String>,
    /// Requested tables for a party spread over several tables.
    #[serde(default)]
    pub table_ids: Vec<String>,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub source: ReservationSource,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BookingRequest {
    pub fn new(
        guest_name: impl Into<String>,
        guest_phone: impl Into<String>,
        party_size: u32,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Self {
        Self {
            guest_name: guest_name.into(),
            guest_phone: guest_phone.into(),
            guest_email: None,
            party_size,
            date,
            time,
            duration_minutes: None,
            table_id: None,
            table_ids: Vec::new(),
            special_requests: None,
            occasion: None,
            source: ReservationSource::default(),
            notes: None,
        }
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn at_table(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    pub fn at_tables<I, S>(mut self, table_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_ids = table_ids.into_iter().map(Into::into).collect();
        self
    }

    fn validate(&self) -> Result<()> {
        validate_party_size(self.party_size)?;
        validate_guest_name(&self.guest_name)?;
        if let Some(duration) = self.duration_minutes {
            validate_duration(duration)?;
        }
        Ok(())
    }
}

/// Changes to an existing reservation. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationPatch {
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_email: Option<Option<String>>,
    pub party_size: Option<u32>,
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm_option")]
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<u32>,
    pub table_id: Option<String>,
    pub table_ids: Option<Vec<String>>,
    pub special_requests: Option<Option<String>>,
    pub occasion: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl ReservationPatch {
    fn validate(&self) -> Result<()> {
        if let Some(party_size) = self.party_size {
            validate_party_size(party_size)?;
        }
        if let Some(name) = &self.guest_name {
            validate_guest_name(name)?;
        }
        if let Some(duration) = self.duration_minutes {
            validate_duration(duration)?;
        }
        Ok(())
    }

    fn retimes(&self, current: &Reservation) -> bool {
        self.date.is_some_and(|d| d != current.date)
            || self.time.is_some_and(|t| t != current.time)
            || self
                .duration_minutes
                .is_some_and(|m| m != current.duration_minutes)
    }

    /// Whether applying the patch can change which tables are needed.
    fn reschedules(&self, current: &Reservation) -> bool {
        self.retimes(current)
            || self.party_size.is_some_and(|p| p != current.party_size)
            || self.table_id.is_some()
            || self.table_ids.is_some()
    }
}

/// Per-day headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    /// Every reservation on the date, whatever its status.
    pub total_reservations: usize,
    /// Guests from confirmed, seated and completed reservations.
    pub expected_covers: u64,
    /// Only statuses that occur on the date are present.
    pub by_status: BTreeMap<ReservationStatus, usize>,
}

/// Tables chosen for a booking.
#[derive(Debug)]
struct Assignment {
    table_id: String,
    /// Empty for single-table bookings.
    table_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct Profile {
    tables: TableRegistry,
    reservations: ReservationStore,
}

pub struct BookingEngine {
    config: RestaurantConfig,
    state: RwLock<Profile>,
    calendar: Option<Arc<dyn CalendarAdapter>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for BookingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEngine")
            .field("restaurant", &self.config.name)
            .field("calendar", &self.calendar.as_ref().map(|_| "<CalendarAdapter>"))
            .field("notifier", &self.notifier.as_ref().map(|_| "<Notifier>"))
            .finish()
    }
}

impl BookingEngine {
    /// Create an engine without calendar or messaging integrations.
    pub fn new(config: RestaurantConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(restaurant = %config.name, "Booking engine created");
        Ok(Self {
            config,
            state: RwLock::new(Profile::default()),
            calendar: None,
            notifier: None,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarAdapter>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RestaurantConfig {
        &self.config
    }

    // ========== Tables ==========

    pub fn add_table(&self, table: NewTable) -> Result<Table> {
        let table = self.state.write().tables.add(table)?;
        tracing::info!(table_id = %table.id, number = table.number, capacity = table.capacity, "Table added");
        Ok(table)
    }

    pub fn get_table(&self, id: &str) -> Result<Table> {
        self.state.read().tables.get(id)
    }

    pub fn list_tables(&self, active_only: bool, section: Option<&str>) -> Vec<Table> {
        self.state.read().tables.list(active_only, section)
    }

    /// Patch a table. Deactivating it, or shrinking it below a party that is
    /// booked on it today or later, is refused with `Conflict`.
    pub fn update_table(&self, id: &str, patch: TablePatch) -> Result<Table> {
        let today = self.clock.today(self.config.timezone);
        let mut guard = self.state.write();
        let state = &mut *guard;
        let current = state.tables.get(id)?;
        let deactivating = current.is_active && patch.is_active == Some(false);
        let shrinking = patch.capacity.is_some_and(|c| c < current.capacity);
        if deactivating || shrinking {
            ensure_table_change_keeps_seatings(
                &state.tables,
                &state.reservations,
                &current,
                patch.capacity.unwrap_or(current.capacity),
                deactivating,
                today,
            )?;
        }
        let table = state.tables.update(id, patch)?;
        tracing::info!(table_id = %table.id, "Table updated");
        Ok(table)
    }

    /// Remove a table that no current or future seating depends on.
    pub fn delete_table(&self, id: &str) -> Result<Table> {
        let today = self.clock.today(self.config.timezone);
        let mut state = self.state.write();
        if !state.tables.contains(id) {
            return Err(EngineError::table_not_found(id));
        }
        if state.reservations.has_future_active_for_table(id, today) {
            return Err(EngineError::Conflict(format!(
                "table {id} has upcoming reservations"
            )));
        }
        let table = state.tables.remove(id)?;
        tracing::info!(table_id = %table.id, number = table.number, "Table deleted");
        Ok(table)
    }

    // ========== Availability ==========

    pub fn find_available_tables(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: u32,
        party_size: u32,
    ) -> Result<Vec<Table>> {
        validate_party_size(party_size)?;
        validate_duration(duration_minutes)?;
        let query = AvailabilityQuery::new(date, time, duration_minutes, party_size)
            .with_buffer(self.config.buffer_between_reservations_minutes);
        let state = self.state.read();
        let tables =
            availability::find_available_tables(state.tables.iter(), state.reservations.iter(), &query);
        tracing::debug!(%date, %time, duration_minutes, party_size, found = tables.len(), "Availability searched");
        Ok(tables)
    }

    pub fn check_availability(
        &self,
        date: NaiveDate,
        party_size: Option<u32>,
    ) -> Result<DayAvailability> {
        if let Some(party_size) = party_size {
            validate_party_size(party_size)?;
        }
        let state = self.state.read();
        Ok(availability::check_availability(
            &self.config,
            state.tables.iter(),
            state.reservations.iter(),
            date,
            party_size,
        ))
    }

    // ========== Reservations ==========

    pub async fn create_reservation(&self, request: BookingRequest) -> Result<Reservation> {
        request.validate()?;
        let duration = request
            .duration_minutes
            .unwrap_or(self.config.default_duration_minutes);
        let now = self.clock.now();

        let reservation = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            let query =
                AvailabilityQuery::new(request.date, request.time, duration, request.party_size)
                    .with_buffer(self.config.buffer_between_reservations_minutes);
            let assignment = assign_tables(
                &state.tables,
                &state.reservations,
                &query,
                request.table_id.as_deref(),
                &request.table_ids,
            )?;

            state.reservations.insert(Reservation {
                id: Uuid::new_v4().to_string(),
                guest_name: request.guest_name.trim().to_string(),
                guest_phone: request.guest_phone.trim().to_string(),
                guest_email: request.guest_email,
                party_size: request.party_size,
                date: request.date,
                time: request.time,
                duration_minutes: duration,
                table_id: Some(assignment.table_id),
                table_ids: assignment.table_ids,
                status: ReservationStatus::Confirmed,
                special_requests: request.special_requests,
                occasion: request.occasion,
                source: request.source,
                calendar_event_id: None,
                sms_confirmation_sent: false,
                sms_reminder_sent: false,
                notes: request.notes,
                created_at: now,
                updated_at: now,
            })?
        };

        tracing::info!(
            reservation_id = %reservation.id,
            table_id = reservation.table_id.as_deref().unwrap_or_default(),
            party_size = reservation.party_size,
            date = %reservation.date,
            time = %reservation.time.format("%H:%M"),
            "Reservation confirmed"
        );

        let event_id = self.create_calendar_event(&reservation).await;
        let sms_sent = self
            .send_guest_message(&reservation, &self.config.templates.confirmation, "confirmation")
            .await;
        if event_id.is_none() && !sms_sent {
            return Ok(reservation);
        }

        let recorded = self
            .state
            .write()
            .reservations
            .modify(&reservation.id, self.clock.now(), |r| {
                if event_id.is_some() {
                    r.calendar_event_id = event_id.clone();
                }
                r.sms_confirmation_sent |= sms_sent;
            });
        match recorded {
            Ok(updated) => Ok(updated),
            // Deleted while the side effects ran; report what was booked.
            Err(_) => Ok(Reservation {
                calendar_event_id: event_id,
                sms_confirmation_sent: sms_sent,
                ..reservation
            }),
        }
    }

    pub fn get_reservation(&self, id: &str) -> Result<Reservation> {
        self.state.read().reservations.get(id)
    }

    pub fn list_reservations(&self, filter: &ReservationFilter) -> Vec<Reservation> {
        self.state.read().reservations.list(filter)
    }

    /// The day's reservations in service order.
    pub fn reservations_for_date(&self, date: NaiveDate) -> Vec<Reservation> {
        self.state.read().reservations.for_date(date)
    }

    /// Active reservations from now on, soonest first.
    pub fn upcoming_reservations(&self, limit: usize) -> Vec<Reservation> {
        let now = self.clock.local_now(self.config.timezone);
        self.state.read().reservations.upcoming(now, limit)
    }

    /// Apply `patch`. Changes to time, party size or tables are re-checked
    /// against the other reservations and rejected if they would double-book.
    pub async fn update_reservation(&self, id: &str, patch: ReservationPatch) -> Result<Reservation> {
        patch.validate()?;
        let now = self.clock.now();

        let (updated, retimed) = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            let current = state.reservations.get(id)?;
            let retimed = patch.retimes(&current);

            let assignment = if patch.reschedules(&current) {
                if current.status.is_terminal() {
                    return Err(EngineError::Validation(format!(
                        "cannot reschedule a {} reservation",
                        current.status
                    )));
                }
                let query = AvailabilityQuery::new(
                    patch.date.unwrap_or(current.date),
                    patch.time.unwrap_or(current.time),
                    patch.duration_minutes.unwrap_or(current.duration_minutes),
                    patch.party_size.unwrap_or(current.party_size),
                )
                .with_buffer(self.config.buffer_between_reservations_minutes)
                .excluding(id);
                let (table_id, table_ids) = if patch.table_id.is_some() || patch.table_ids.is_some() {
                    (patch.table_id.clone(), patch.table_ids.clone().unwrap_or_default())
                } else {
                    (current.table_id.clone(), current.table_ids.clone())
                };
                Some(assign_tables(
                    &state.tables,
                    &state.reservations,
                    &query,
                    table_id.as_deref(),
                    &table_ids,
                )?)
            } else {
                None
            };

            let updated = state.reservations.modify(id, now, |r| {
                apply_patch(r, patch);
                if let Some(assignment) = assignment {
                    r.table_id = Some(assignment.table_id);
                    r.table_ids = assignment.table_ids;
                }
            })?;
            (updated, retimed)
        };

        tracing::info!(reservation_id = %updated.id, retimed, "Reservation updated");

        if retimed {
            if let (Some(calendar), Some(event_id)) = (&self.calendar, &updated.calendar_event_id) {
                let patch = CalendarEventPatch {
                    summary: Some(event_summary(&updated)),
                    description: Some(self.event_description(&updated)),
                    start: Some(updated.start()),
                    end: Some(updated.end()),
                };
                let result = adapter::with_timeout(
                    self.config.side_effect_timeout(),
                    calendar.update_event(event_id, &patch),
                )
                .await;
                if let Err(e) = result {
                    tracing::warn!(reservation_id = %updated.id, error = %e, "Calendar update failed");
                }
            }
        }

        Ok(updated)
    }

    /// Cancel a confirmed reservation. Cancelling twice is a no-op.
    pub async fn cancel_reservation(&self, id: &str, notify: bool) -> Result<Reservation> {
        let now = self.clock.now();
        let cancelled = {
            let mut state = self.state.write();
            let current = state.reservations.get(id)?;
            if current.status == ReservationStatus::Cancelled {
                return Ok(current);
            }
            state
                .reservations
                .transition(id, ReservationStatus::Cancelled, now)?
        };

        tracing::info!(reservation_id = %cancelled.id, "Reservation cancelled");

        if let (Some(calendar), Some(event_id)) = (&self.calendar, &cancelled.calendar_event_id) {
            let result =
                adapter::with_timeout(self.config.side_effect_timeout(), calendar.cancel_event(event_id))
                    .await;
            if let Err(e) = result {
                tracing::warn!(reservation_id = %cancelled.id, error = %e, "Calendar cancellation failed");
            }
        }
        if notify {
            self.send_guest_message(&cancelled, &self.config.templates.cancellation, "cancellation")
                .await;
        }

        Ok(cancelled)
    }

    pub fn seat_reservation(&self, id: &str) -> Result<Reservation> {
        self.transition(id, ReservationStatus::Seated)
    }

    pub fn complete_reservation(&self, id: &str) -> Result<Reservation> {
        self.transition(id, ReservationStatus::Completed)
    }

    pub fn mark_no_show(&self, id: &str) -> Result<Reservation> {
        self.transition(id, ReservationStatus::NoShow)
    }

    fn transition(&self, id: &str, to: ReservationStatus) -> Result<Reservation> {
        let now = self.clock.now();
        let reservation = self.state.write().reservations.transition(id, to, now)?;
        tracing::info!(reservation_id = %reservation.id, status = %to, "Reservation status changed");
        Ok(reservation)
    }

    /// Permanently remove a reservation and its calendar event.
    pub async fn delete_reservation(&self, id: &str) -> Result<Reservation> {
        let existing = self.state.read().reservations.get(id)?;

        if let (Some(calendar), Some(event_id)) = (&self.calendar, &existing.calendar_event_id) {
            let result =
                adapter::with_timeout(self.config.side_effect_timeout(), calendar.delete_event(event_id))
                    .await;
            if let Err(e) = result {
                tracing::warn!(reservation_id = %existing.id, error = %e, "Calendar deletion failed");
            }
        }

        let removed = self.state.write().reservations.remove(id)?;
        tracing::info!(reservation_id = %removed.id, "Reservation deleted");
        Ok(removed)
    }

    /// Text a reminder to every confirmed guest whose seating starts within the
    /// configured lead time. Returns how many reminders went out.
    pub async fn send_reminders(&self) -> usize {
        if !self.config.enable_sms_confirmations || self.notifier.is_none() {
            return 0;
        }
        let now = self.clock.local_now(self.config.timezone);
        let horizon = now + Duration::minutes(i64::from(self.config.reminder_lead_minutes));

        let mut due: Vec<Reservation> = self
            .state
            .read()
            .reservations
            .iter()
            .filter(|r| {
                r.status == ReservationStatus::Confirmed
                    && !r.sms_reminder_sent
                    && r.start() >= now
                    && r.start() <= horizon
            })
            .cloned()
            .collect();
        due.sort_by_key(|r| r.start());

        let mut sent = 0;
        for reservation in due {
            if !self
                .send_guest_message(&reservation, &self.config.templates.reminder, "reminder")
                .await
            {
                continue;
            }
            sent += 1;
            let recorded = self
                .state
                .write()
                .reservations
                .modify(&reservation.id, self.clock.now(), |r| r.sms_reminder_sent = true);
            if recorded.is_err() {
                tracing::debug!(reservation_id = %reservation.id, "Reservation removed before reminder flag was recorded");
            }
        }
        if sent > 0 {
            tracing::info!(sent, "Reminders sent");
        }
        sent
    }

    pub fn day_summary(&self, date: NaiveDate) -> DaySummary {
        let day = self.state.read().reservations.for_date(date);
        let mut by_status = BTreeMap::new();
        for r in &day {
            *by_status.entry(r.status).or_insert(0) += 1;
        }
        let expected_covers = day
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    ReservationStatus::Confirmed
                        | ReservationStatus::Seated
                        | ReservationStatus::Completed
                )
            })
            .map(|r| u64::from(r.party_size))
            .sum();
        DaySummary {
            date,
            total_reservations: day.len(),
            expected_covers,
            by_status,
        }
    }

    // ========== Side effects ==========

    async fn create_calendar_event(&self, reservation: &Reservation) -> Option<String> {
        let calendar = self.calendar.as_ref()?;
        let event = CalendarEvent {
            summary: event_summary(reservation),
            description: self.event_description(reservation),
            start: reservation.start(),
            end: reservation.end(),
            reminder_minutes: self.config.calendar_reminder_minutes,
        };
        match adapter::with_timeout(self.config.side_effect_timeout(), calendar.create_event(&event))
            .await
        {
            Ok(event_id) => Some(event_id),
            Err(e) => {
                tracing::warn!(reservation_id = %reservation.id, error = %e, "Calendar event creation failed");
                None
            }
        }
    }

    /// Render and send one guest message. Returns whether it was delivered.
    async fn send_guest_message(
        &self,
        reservation: &Reservation,
        template_text: &str,
        kind: &'static str,
    ) -> bool {
        if !self.config.enable_sms_confirmations || reservation.guest_phone.is_empty() {
            return false;
        }
        let Some(notifier) = &self.notifier else {
            return false;
        };
        let text = template::render(
            template_text,
            &TemplateVars::for_reservation(reservation, &self.config.name),
        );
        match adapter::with_timeout(
            self.config.side_effect_timeout(),
            notifier.send_message(&reservation.guest_phone, &text),
        )
        .await
        {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(reservation_id = %reservation.id, kind, "Message not accepted by provider");
                false
            }
            Err(e) => {
                tracing::warn!(reservation_id = %reservation.id, kind, error = %e, "Message delivery failed");
                false
            }
        }
    }

    fn event_description(&self, reservation: &Reservation) -> String {
        let tables: Vec<String> = {
            let state = self.state.read();
            reservation
                .occupied_tables()
                .map(|id| match state.tables.get(id) {
                    Ok(table) => table.name,
                    Err(_) => id.to_string(),
                })
                .collect()
        };
        let mut lines = vec![
            format!("Guest: {}", reservation.guest_name),
            format!("Phone: {}", reservation.guest_phone),
            format!("Party size: {}", reservation.party_size),
            format!("Tables: {}", tables.join(", ")),
        ];
        if let Some(occasion) = &reservation.occasion {
            lines.push(format!("Occasion: {occasion}"));
        }
        if let Some(requests) = &reservation.special_requests {
            lines.push(format!("Special requests: {requests}"));
        }
        lines.join("\n")
    }
}

fn event_summary(reservation: &Reservation) -> String {
    format!(
        "Reservation: {} (party of {})",
        reservation.guest_name, reservation.party_size
    )
}

/// Check requested tables, or pick the smallest table that fits.
fn assign_tables(
    tables: &TableRegistry,
    reservations: &ReservationStore,
    query: &AvailabilityQuery<'_>,
    table_id: Option<&str>,
    table_ids: &[String],
) -> Result<Assignment> {
    let requested: Vec<&str> = if table_ids.is_empty() {
        table_id.into_iter().collect()
    } else {
        if let Some(primary) = table_id {
            if !table_ids.iter().any(|id| id == primary) {
                return Err(EngineError::Validation(format!(
                    "table {primary} is not one of the requested tables"
                )));
            }
        }
        table_ids.iter().map(String::as_str).collect()
    };

    match requested.as_slice() {
        [] => {
            let available =
                availability::find_available_tables(tables.iter(), reservations.iter(), query);
            let best = available.into_iter().next().ok_or(EngineError::NoAvailability {
                party_size: query.party_size,
                date: query.date,
                time: query.time,
            })?;
            Ok(Assignment {
                table_id: best.id,
                table_ids: Vec::new(),
            })
        }
        [single] => {
            let table = tables.get(single)?;
            let available =
                availability::find_available_tables(tables.iter(), reservations.iter(), query);
            if available.iter().any(|t| t.id == table.id) {
                return Ok(Assignment {
                    table_id: table.id,
                    table_ids: Vec::new(),
                });
            }
            let reason = if !table.is_active {
                "is inactive".to_string()
            } else if table.capacity < query.party_size {
                format!(
                    "seats {} but the party is {}",
                    table.capacity, query.party_size
                )
            } else {
                "is already booked for that time".to_string()
            };
            Err(EngineError::TableUnavailable(format!(
                "table {} {reason}",
                table.number
            )))
        }
        many => {
            let mut seen = HashSet::new();
            for id in many {
                if !seen.insert(*id) {
                    return Err(EngineError::Validation(format!(
                        "table {id} requested more than once"
                    )));
                }
            }
            let free = availability::free_tables(tables.iter(), reservations.iter(), query);
            let mut combined: u64 = 0;
            for id in many {
                let table = tables.get(id)?;
                if !free.iter().any(|t| t.id == table.id) {
                    let reason = if table.is_active {
                        "is already booked for that time"
                    } else {
                        "is inactive"
                    };
                    return Err(EngineError::TableUnavailable(format!(
                        "table {} {reason}",
                        table.number
                    )));
                }
                combined += u64::from(table.capacity);
            }
            if combined < u64::from(query.party_size) {
                return Err(EngineError::TableUnavailable(format!(
                    "combined capacity {combined} cannot seat a party of {}",
                    query.party_size
                )));
            }
            Ok(Assignment {
                table_id: many[0].to_string(),
                table_ids: many.iter().map(|id| id.to_string()).collect(),
            })
        }
    }
}

/// Refuse a table change that would leave an upcoming active reservation on
/// an inactive table or on tables that no longer seat its party.
fn ensure_table_change_keeps_seatings(
    tables: &TableRegistry,
    reservations: &ReservationStore,
    table: &Table,
    new_capacity: u32,
    deactivating: bool,
    today: NaiveDate,
) -> Result<()> {
    let affected = reservations
        .iter()
        .filter(|r| r.status.is_active() && r.date >= today && r.uses_table(&table.id));
    for r in affected {
        if deactivating {
            return Err(EngineError::Conflict(format!(
                "table {} is held by reservation {} on {}",
                table.number, r.id, r.date
            )));
        }
        let seats: u64 = r
            .occupied_tables()
            .map(|id| {
                if id == table.id {
                    u64::from(new_capacity)
                } else {
                    tables.get(id).map_or(0, |t| u64::from(t.capacity))
                }
            })
            .sum();
        if seats < u64::from(r.party_size) {
            return Err(EngineError::Conflict(format!(
                "table {} would no longer seat the party of {} booked on {}",
                table.number, r.party_size, r.date
            )));
        }
    }
    Ok(())
}

fn apply_patch(r: &mut Reservation, patch: ReservationPatch) {
    if let Some(guest_name) = patch.guest_name {
        r.guest_name = guest_name.trim().to_string();
    }
    if let Some(guest_phone) = patch.guest_phone {
        r.guest_phone = guest_phone.trim().to_string();
    }
    if let Some(guest_email) = patch.guest_email {
        r.guest_email = guest_email;
    }
    if let Some(party_size) = patch.party_size {
        r.party_size = party_size;
    }
    if let Some(date) = patch.date {
        r.date = date;
    }
    if let Some(time) = patch.time {
        r.time = time;
    }
    if let Some(duration) = patch.duration_minutes {
        r.duration_minutes = duration;
    }
    if let Some(special_requests) = patch.special_requests {
        r.special_requests = special_requests;
    }
    if let Some(occasion) = patch.occasion {
        r.occasion = occasion;
    }
    if let Some(notes) = patch.notes {
        r.notes = notes;
    }
}

fn validate_party_size(party_size: u32) -> Result<()> {
    if party_size == 0 {
        return Err(EngineError::Validation(
            "party size must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_duration(minutes: u32) -> Result<()> {
    if minutes == 0 {
        return Err(EngineError::Validation(
            "duration must be at least one minute".to_string(),
        ));
    }
    if minutes > MAX_DURATION_MINUTES {
        return Err(EngineError::Validation(format!(
            "duration of {minutes} minutes exceeds the {MAX_DURATION_MINUTES} minute maximum"
        )));
    }
    Ok(())
}

fn validate_guest_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation("guest name is required".to_string()));
    }
    Ok(())
}
