//! Calendar and messaging collaborators.
//!
//! The engine only talks to these through the traits below. Every call is
//! bounded by a timeout and its failure is logged by the caller, never
//! surfaced as a booking error.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Adapter call failed: {0}")]
    Failed(String),

    #[error("Adapter call timed out after {0:?}")]
    Timeout(Duration),
}

/// An event to create on the restaurant calendar. Times are wall-clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Guest name and party size.
    pub summary: String,
    /// Contact details, tables, occasion and special requests, one per line.
    pub description: String,
    pub start: NaiveDateTime,
    /// Exclusive.
    pub end: NaiveDateTime,
    /// Popup reminder lead time.
    pub reminder_minutes: u32,
}

/// Changes to an existing event. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarEventPatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

#[async_trait]
pub trait CalendarAdapter: Send + Sync {
    /// Returns the provider's event id.
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, AdapterError>;

    async fn update_event(
        &self,
        event_id: &str,
        patch: &CalendarEventPatch,
    ) -> Result<(), AdapterError>;

    async fn delete_event(&self, event_id: &str) -> Result<(), AdapterError>;

    /// Mark the event cancelled without deleting it.
    async fn cancel_event(&self, event_id: &str) -> Result<(), AdapterError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns whether the provider accepted the message.
    async fn send_message(&self, phone_number: &str, text: &str) -> Result<bool, AdapterError>;
}

/// Run an adapter call, turning an elapsed deadline into [`AdapterError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::Timeout(limit)),
    }
}
