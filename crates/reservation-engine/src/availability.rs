//! Table availability for a time window, and the day's slot grid.
//!
//! Everything here is a pure function over borrowed tables and reservations.
//! Windows are half-open `[start, end)`: a seating that ends at 19:30 does not
//! block one that starts at 19:30. An optional turnover buffer widens every
//! window on both sides of the comparison.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::RestaurantConfig;
use crate::reservation::Reservation;
use crate::table::Table;
use crate::time_format::hhmm;

/// A half-open `[start, end)` wall-clock interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(date: NaiveDate, time: NaiveTime, duration_minutes: u32) -> Self {
        let start = date.and_time(time);
        Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    pub fn of(reservation: &Reservation) -> Self {
        Self::new(reservation.date, reservation.time, reservation.duration_minutes)
    }

    /// Strict overlap, widened by `buffer_minutes`. Touching windows never
    /// conflict when the buffer is zero.
    pub fn conflicts_with(&self, other: &Window, buffer_minutes: u32) -> bool {
        let buffer = Duration::minutes(i64::from(buffer_minutes));
        self.start < other.end + buffer && other.start < self.end + buffer
    }
}

/// Parameters of one availability search.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityQuery<'a> {
    pub date: NaiveDate,
    /// Requested start.
    pub time: NaiveTime,
    pub duration_minutes: u32,
    /// Minimum seats a table needs.
    pub party_size: u32,
    /// Turnover gap required between seatings on one table.
    pub buffer_minutes: u32,
    /// Ignore this reservation's own windows (used when rescheduling it).
    pub exclude_reservation: Option<&'a str>,
}

impl<'a> AvailabilityQuery<'a> {
    pub fn new(date: NaiveDate, time: NaiveTime, duration_minutes: u32, party_size: u32) -> Self {
        Self {
            date,
            time,
            duration_minutes,
            party_size,
            buffer_minutes: 0,
            exclude_reservation: None,
        }
    }

    pub fn with_buffer(mut self, buffer_minutes: u32) -> Self {
        self.buffer_minutes = buffer_minutes;
        self
    }

    pub fn excluding(mut self, reservation_id: &'a str) -> Self {
        self.exclude_reservation = Some(reservation_id);
        self
    }

    pub fn window(&self) -> Window {
        Window::new(self.date, self.time, self.duration_minutes)
    }
}

/// Windows held on each table by active reservations that reach into `span`.
///
/// Selection is by window rather than by date, so a seating that started on
/// an earlier day still blocks the tables it holds.
#[derive(Debug, Default)]
pub struct Occupancy<'r> {
    by_table: HashMap<&'r str, Vec<Window>>,
}

impl<'r> Occupancy<'r> {
    pub fn build<I>(
        reservations: I,
        span: &Window,
        buffer_minutes: u32,
        exclude: Option<&str>,
    ) -> Self
    where
        I: IntoIterator<Item = &'r Reservation>,
    {
        let mut by_table: HashMap<&'r str, Vec<Window>> = HashMap::new();
        for r in reservations {
            if !r.status.is_active() {
                continue;
            }
            if exclude.is_some_and(|id| id == r.id) {
                continue;
            }
            let window = Window::of(r);
            if !window.conflicts_with(span, buffer_minutes) {
                continue;
            }
            for table_id in r.occupied_tables() {
                by_table.entry(table_id).or_default().push(window);
            }
        }
        for windows in by_table.values_mut() {
            windows.sort();
        }
        Self { by_table }
    }

    /// Whether `table_id` has no window conflicting with `candidate`.
    pub fn is_free(&self, table_id: &str, candidate: &Window, buffer_minutes: u32) -> bool {
        let Some(windows) = self.by_table.get(table_id) else {
            return true;
        };
        // Windows are sorted by start; anything starting at or after the
        // widened candidate end cannot conflict.
        let buffer = Duration::minutes(i64::from(buffer_minutes));
        let reach = candidate.end + buffer;
        let upto = windows.partition_point(|w| w.start < reach);
        !windows[..upto]
            .iter()
            .any(|w| w.conflicts_with(candidate, buffer_minutes))
    }
}

/// Active tables that seat the party and are free for the whole window,
/// smallest sufficient capacity first.
pub fn find_available_tables<'t, 'r, T, R>(
    tables: T,
    reservations: R,
    query: &AvailabilityQuery<'_>,
) -> Vec<Table>
where
    T: IntoIterator<Item = &'t Table>,
    R: IntoIterator<Item = &'r Reservation>,
{
    let occupancy = Occupancy::build(
        reservations,
        &query.window(),
        query.buffer_minutes,
        query.exclude_reservation,
    );
    available_from(tables, &occupancy, query)
}

/// Active tables free for the window regardless of capacity. Used to validate
/// multi-table requests, where each table may be smaller than the party.
pub fn free_tables<'t, 'r, T, R>(
    tables: T,
    reservations: R,
    query: &AvailabilityQuery<'_>,
) -> Vec<Table>
where
    T: IntoIterator<Item = &'t Table>,
    R: IntoIterator<Item = &'r Reservation>,
{
    let query = AvailabilityQuery {
        party_size: 1,
        ..*query
    };
    find_available_tables(tables, reservations, &query)
}

fn available_from<'t, T>(tables: T, occupancy: &Occupancy<'_>, query: &AvailabilityQuery<'_>) -> Vec<Table>
where
    T: IntoIterator<Item = &'t Table>,
{
    let candidate = query.window();
    let mut available: Vec<Table> = tables
        .into_iter()
        .filter(|t| t.is_active && t.capacity >= query.party_size)
        .filter(|t| occupancy.is_free(&t.id, &candidate, query.buffer_minutes))
        .cloned()
        .collect();
    available.sort_by_key(|t| (t.capacity, t.number));
    available
}

/// Availability at one grid point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Slot start, serialized as `HH:MM`.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// At least one table can take the party for a default-length seating.
    pub available: bool,
    /// Free tables in best-fit order.
    pub available_table_ids: Vec<String>,
    /// Seats across `available_table_ids`.
    pub total_capacity: u64,
}

/// The slot grid for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    /// Opening time to closing time (exclusive), one entry per interval.
    pub slots: Vec<TimeSlot>,
}

/// Grid points from `opening` (inclusive) to `closing` (exclusive).
pub fn slot_grid(opening: NaiveTime, closing: NaiveTime, interval_minutes: u32) -> Vec<NaiveTime> {
    if interval_minutes == 0 {
        return Vec::new();
    }
    let open = opening.num_seconds_from_midnight() / 60;
    let close = closing.num_seconds_from_midnight() / 60;
    (open..close)
        .step_by(interval_minutes as usize)
        .filter_map(|minute| NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0))
        .collect()
}

/// Availability for every slot of `date` using the default seating duration.
pub fn check_availability<'t, 'r, T, R>(
    config: &RestaurantConfig,
    tables: T,
    reservations: R,
    date: NaiveDate,
    party_size: Option<u32>,
) -> DayAvailability
where
    T: IntoIterator<Item = &'t Table>,
    R: IntoIterator<Item = &'r Reservation>,
{
    let tables: Vec<&Table> = tables.into_iter().collect();
    // Covers every slot's window: the first starts at opening, the last ends
    // before closing plus one seating.
    let span = Window {
        start: date.and_time(config.opening_time),
        end: date.and_time(config.closing_time)
            + Duration::minutes(i64::from(config.default_duration_minutes)),
    };
    let occupancy = Occupancy::build(
        reservations,
        &span,
        config.buffer_between_reservations_minutes,
        None,
    );
    let party_size = party_size.unwrap_or(1);

    let slots = slot_grid(
        config.opening_time,
        config.closing_time,
        config.time_slot_interval_minutes,
    )
    .into_iter()
    .map(|time| {
        let query = AvailabilityQuery::new(date, time, config.default_duration_minutes, party_size)
            .with_buffer(config.buffer_between_reservations_minutes);
        let available = available_from(tables.iter().copied(), &occupancy, &query);
        TimeSlot {
            time,
            available: !available.is_empty(),
            total_capacity: available.iter().map(|t| u64::from(t.capacity)).sum(),
            available_table_ids: available.into_iter().map(|t| t.id).collect(),
        }
    })
    .collect();

    DayAvailability { date, slots }
}
