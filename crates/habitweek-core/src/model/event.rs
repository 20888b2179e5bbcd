use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::time::{ClockTime, TimeInterval};

pub type EventId = Uuid;

/// How often a calendar event repeats.
///
/// Every variant flattens onto exactly one weekday of the canonical week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "on", rename_all = "snake_case")]
pub enum Recurrence {
    /// Happens once, on the given date.
    Once(NaiveDate),
    /// Every week on the given weekday.
    Weekly(Weekday),
    /// Every two weeks, counting from the anchor date.
    BiWeekly(NaiveDate),
}

impl Recurrence {
    /// Weekday this recurrence occupies in the canonical week.
    pub fn day(&self) -> Weekday {
        match self {
            Recurrence::Once(date) | Recurrence::BiWeekly(date) => date.weekday(),
            Recurrence::Weekly(day) => *day,
        }
    }
}

/// A fixed calendar commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent")]
pub struct Event {
    pub id: EventId,
    pub name: String,
    /// Owning user name.
    pub user: String,
    pub interval: TimeInterval,
    pub recurrence: Recurrence,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default = "Uuid::new_v4")]
    id: EventId,
    name: String,
    /// Left empty by imports; the service fills in the importing user.
    #[serde(default)]
    user: String,
    interval: TimeInterval,
    recurrence: Recurrence,
}

impl TryFrom<RawEvent> for Event {
    type Error = ValidationError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        Event::with_id(raw.id, raw.name, raw.user, raw.interval, raw.recurrence)
    }
}

impl Event {
    /// Create an event with a fresh id.
    pub fn new(
        name: impl Into<String>,
        user: impl Into<String>,
        start: ClockTime,
        end: ClockTime,
        recurrence: Recurrence,
    ) -> Result<Self, ValidationError> {
        let interval = TimeInterval::new(start, end)?;
        Self::with_id(Uuid::new_v4(), name, user, interval, recurrence)
    }

    /// Create an event with a caller-provided id (storage and import paths).
    pub fn with_id(
        id: EventId,
        name: impl Into<String>,
        user: impl Into<String>,
        interval: TimeInterval,
        recurrence: Recurrence,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "event.name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(Self {
            id,
            name,
            user: user.into(),
            interval,
            recurrence,
        })
    }

    /// Weekly event shorthand, mostly used when building calendars in code.
    pub fn weekly(
        name: impl Into<String>,
        user: impl Into<String>,
        day: Weekday,
        start: &str,
        end: &str,
    ) -> Result<Self, ValidationError> {
        Self::new(name, user, start.parse()?, end.parse()?, Recurrence::Weekly(day))
    }

    pub fn day(&self) -> Weekday {
        self.recurrence.day()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EVENT: {} on {} {}", self.name, self.day(), self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurrence_flattens_to_weekday() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(); // a Wednesday
        assert_eq!(Recurrence::Once(date).day(), Weekday::Wed);
        assert_eq!(Recurrence::BiWeekly(date).day(), Weekday::Wed);
        assert_eq!(Recurrence::Weekly(Weekday::Fri).day(), Weekday::Fri);
    }

    #[test]
    fn event_rejects_start_after_end() {
        let err = Event::weekly("Sleep", "egor", Weekday::Mon, "23:00", "07:00");
        assert!(matches!(err, Err(ValidationError::InvalidTimeRange { .. })));
    }

    #[test]
    fn event_rejects_blank_name() {
        assert!(Event::weekly("  ", "egor", Weekday::Mon, "08:00", "09:00").is_err());
    }

    #[test]
    fn event_deserializes_normalized_record() {
        let json = r#"{
            "name": "Work",
            "user": "egor",
            "interval": {"start": "09:00", "end": "18:00"},
            "recurrence": {"kind": "weekly", "on": "Tue"}
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.day(), Weekday::Tue);
        assert_eq!(event.interval.duration_minutes(), 540);
    }

    #[test]
    fn event_deserialize_rejects_blank_name() {
        let json = r#"{
            "name": "",
            "user": "egor",
            "interval": {"start": "09:00", "end": "18:00"},
            "recurrence": {"kind": "once", "on": "2024-03-06"}
        }"#;
        assert!(serde_json::from_str::<Event>(json).is_err());
    }
}
