//! Shared fixtures: fake integrations, a pinned clock, and builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use parking_lot::Mutex;
use reservation_engine::{
    AdapterError, BookingEngine, CalendarAdapter, CalendarEvent, CalendarEventPatch, FixedClock,
    NewTable, Notifier, Reservation, ReservationSource, ReservationStatus, RestaurantConfig, Table,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

pub fn date(s: &str) -> NaiveDate {
    reservation_engine::time_format::parse_date(s).unwrap()
}

pub fn time(s: &str) -> NaiveTime {
    reservation_engine::time_format::parse_time(s).unwrap()
}

/// The service date most tests book on. Later than [`clock`]'s "today".
pub const SERVICE_DATE: &str = "2026-03-16";

/// 2026-03-10 12:00 UTC.
pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()))
}

pub fn engine() -> BookingEngine {
    engine_with(RestaurantConfig::default())
}

pub fn engine_with(config: RestaurantConfig) -> BookingEngine {
    BookingEngine::new(config).unwrap().with_clock(clock())
}

pub fn add_table(engine: &BookingEngine, number: u32, capacity: u32) -> Table {
    engine
        .add_table(NewTable::new(number, capacity, "main"))
        .unwrap()
}

/// A bare reservation record for store-level tests.
pub fn reservation(id: &str, date_str: &str, time_str: &str, duration: u32, table: &str) -> Reservation {
    let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    Reservation {
        id: id.to_string(),
        guest_name: format!("Guest {id}"),
        guest_phone: "+15550100".to_string(),
        guest_email: None,
        party_size: 2,
        date: date(date_str),
        time: time(time_str),
        duration_minutes: duration,
        table_id: Some(table.to_string()),
        table_ids: Vec::new(),
        status: ReservationStatus::Confirmed,
        special_requests: None,
        occasion: None,
        source: ReservationSource::Phone,
        calendar_event_id: None,
        sms_confirmation_sent: false,
        sms_reminder_sent: false,
        notes: None,
        created_at: created,
        updated_at: created,
    }
}

// ── Fake calendar ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingCalendar {
    pub created: Mutex<Vec<CalendarEvent>>,
    pub updated: Mutex<Vec<(String, CalendarEventPatch)>>,
    pub cancelled: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl RecordingCalendar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let calendar = Self::default();
        calendar.fail.store(true, Ordering::SeqCst);
        Arc::new(calendar)
    }

    pub fn hanging(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    async fn call(&self) -> Result<(), AdapterError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AdapterError::Failed("calendar offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarAdapter for RecordingCalendar {
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, AdapterError> {
        self.call().await?;
        let mut created = self.created.lock();
        created.push(event.clone());
        Ok(format!("evt-{}", created.len()))
    }

    async fn update_event(
        &self,
        event_id: &str,
        patch: &CalendarEventPatch,
    ) -> Result<(), AdapterError> {
        self.call().await?;
        self.updated.lock().push((event_id.to_string(), patch.clone()));
        Ok(())
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), AdapterError> {
        self.call().await?;
        self.deleted.lock().push(event_id.to_string());
        Ok(())
    }

    async fn cancel_event(&self, event_id: &str) -> Result<(), AdapterError> {
        self.call().await?;
        self.cancelled.lock().push(event_id.to_string());
        Ok(())
    }
}

// ── Fake notifier ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, phone_number: &str, text: &str) -> Result<bool, AdapterError> {
        if self.fail {
            return Err(AdapterError::Failed("gateway rejected request".to_string()));
        }
        self.sent
            .lock()
            .push((phone_number.to_string(), text.to_string()));
        Ok(true)
    }
}
