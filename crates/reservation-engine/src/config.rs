//! Restaurant configuration.
//!
//! The engine keeps its own copy of the configuration, so edits made after an
//! engine is built never reach existing reservations.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::reservation::MAX_DURATION_MINUTES;
use crate::time_format::{self, hhmm};

/// Operating parameters of one restaurant profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantConfig {
    pub name: String,
    #[serde(with = "hhmm")]
    pub opening_time: NaiveTime,
    /// Exclusive upper bound of the slot grid.
    #[serde(with = "hhmm")]
    pub closing_time: NaiveTime,
    pub time_slot_interval_minutes: u32,
    pub default_duration_minutes: u32,
    /// Turnover time kept free after each seating.
    pub buffer_between_reservations_minutes: u32,
    pub enable_sms_confirmations: bool,
    /// Only used to decide what "today" is.
    pub timezone: Tz,
    pub calendar_reminder_minutes: u32,
    pub side_effect_timeout_secs: u64,
    pub reminder_lead_minutes: u32,
    pub templates: MessageTemplates,
}

impl Default for RestaurantConfig {
    fn default() -> Self {
        Self {
            name: "Restaurant".to_string(),
            opening_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap_or(NaiveTime::MIN),
            closing_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
            time_slot_interval_minutes: 30,
            default_duration_minutes: 90,
            buffer_between_reservations_minutes: 0,
            enable_sms_confirmations: false,
            timezone: Tz::UTC,
            calendar_reminder_minutes: 60,
            side_effect_timeout_secs: 5,
            reminder_lead_minutes: 120,
            templates: MessageTemplates::default(),
        }
    }
}

/// Guest-facing message templates. See [`crate::template::render`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub confirmation: String,
    pub reminder: String,
    pub cancellation: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            confirmation: "Hi {{guestName}}, your table for {{partySize}} at {{restaurantName}} \
                           is confirmed for {{date}} at {{time}}."
                .to_string(),
            reminder: "Reminder: {{guestName}}, we look forward to seeing your party of \
                       {{partySize}} at {{restaurantName}} today at {{time}}."
                .to_string(),
            cancellation: "Hi {{guestName}}, your reservation at {{restaurantName}} on {{date}} \
                           at {{time}} has been cancelled."
                .to_string(),
        }
    }
}

impl RestaurantConfig {
    pub fn side_effect_timeout(&self) -> Duration {
        Duration::from_secs(self.side_effect_timeout_secs)
    }

    /// Reject configurations the slot grid and booking path cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.closing_time <= self.opening_time {
            return Err(EngineError::Validation(format!(
                "closing time {} must be after opening time {}",
                self.closing_time.format(time_format::TIME_FORMAT),
                self.opening_time.format(time_format::TIME_FORMAT)
            )));
        }
        if self.time_slot_interval_minutes == 0 {
            return Err(EngineError::Validation(
                "time slot interval must be at least one minute".to_string(),
            ));
        }
        if self.default_duration_minutes == 0 {
            return Err(EngineError::Validation(
                "default duration must be at least one minute".to_string(),
            ));
        }
        if self.default_duration_minutes > MAX_DURATION_MINUTES {
            return Err(EngineError::Validation(format!(
                "default duration may not exceed {MAX_DURATION_MINUTES} minutes"
            )));
        }
        if self.side_effect_timeout_secs == 0 {
            return Err(EngineError::Validation(
                "side effect timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse restaurant config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Build from `RESTAURANT_*` environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            name: std::env::var("RESTAURANT_NAME").unwrap_or(defaults.name),
            opening_time: env_time("RESTAURANT_OPENING_TIME").unwrap_or(defaults.opening_time),
            closing_time: env_time("RESTAURANT_CLOSING_TIME").unwrap_or(defaults.closing_time),
            time_slot_interval_minutes: env_parse("RESTAURANT_SLOT_INTERVAL_MINUTES")
                .unwrap_or(defaults.time_slot_interval_minutes),
            default_duration_minutes: env_parse("RESTAURANT_DEFAULT_DURATION_MINUTES")
                .unwrap_or(defaults.default_duration_minutes),
            buffer_between_reservations_minutes: env_parse("RESTAURANT_BUFFER_MINUTES")
                .unwrap_or(defaults.buffer_between_reservations_minutes),
            enable_sms_confirmations: env_parse("RESTAURANT_ENABLE_SMS")
                .unwrap_or(defaults.enable_sms_confirmations),
            timezone: env_parse("RESTAURANT_TIMEZONE").unwrap_or(defaults.timezone),
            calendar_reminder_minutes: env_parse("RESTAURANT_CALENDAR_REMINDER_MINUTES")
                .unwrap_or(defaults.calendar_reminder_minutes),
            side_effect_timeout_secs: env_parse("RESTAURANT_SIDE_EFFECT_TIMEOUT_SECS")
                .unwrap_or(defaults.side_effect_timeout_secs),
            reminder_lead_minutes: env_parse("RESTAURANT_REMINDER_LEAD_MINUTES")
                .unwrap_or(defaults.reminder_lead_minutes),
            templates: defaults.templates,
        };
        config
            .validate()
            .context("invalid restaurant config from environment")?;
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_time(key: &str) -> Option<NaiveTime> {
    std::env::var(key)
        .ok()
        .and_then(|v| time_format::parse_time(&v).ok())
}
