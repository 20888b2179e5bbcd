//! Minute-resolution time of day and half-open intervals on the canonical week.
//!
//! Everything the engine reasons about lives inside a single day,
//! `[00:00, 24:00)`. `24:00` is representable so that an interval can end at
//! midnight without wrapping.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Fixed day search order. Placement never depends on how loaded a day is.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// The implicit whole-day window.
pub const DAY: TimeInterval = TimeInterval {
    start: ClockTime(0),
    end: ClockTime(MINUTES_PER_DAY),
};

/// Index of a weekday inside [`WEEK`].
pub fn day_index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

/// Time of day as minutes since midnight, `00:00..=24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);
    pub const END_OF_DAY: ClockTime = ClockTime(MINUTES_PER_DAY);

    /// Build from minutes since midnight.
    pub fn from_minutes(minutes: u16) -> Result<Self, ValidationError> {
        if minutes > MINUTES_PER_DAY {
            return Err(ValidationError::InvalidClockTime(format!("{minutes}min")));
        }
        Ok(Self(minutes))
    }

    /// Build from hours and minutes; `24:00` is the only valid hour-24 value.
    pub fn hm(hour: u16, minute: u16) -> Result<Self, ValidationError> {
        if minute >= 60 || hour > 24 || (hour == 24 && minute != 0) {
            return Err(ValidationError::InvalidClockTime(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Truncates seconds.
    pub fn from_naive(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Adds minutes, returning `None` past the end of the day.
    pub fn checked_add(self, minutes: u16) -> Option<Self> {
        let total = self.0.checked_add(minutes)?;
        (total <= MINUTES_PER_DAY).then_some(Self(total))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidClockTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let two_digits = |part: &str| -> Result<u16, ValidationError> {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        Self::hm(two_digits(hour)?, two_digits(minute)?).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Half-open interval `[start, end)` within one day, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    start: ClockTime,
    end: ClockTime,
}

#[derive(Deserialize)]
struct RawInterval {
    start: ClockTime,
    end: ClockTime,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = ValidationError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        TimeInterval::new(raw.start, raw.end)
    }
}

impl TimeInterval {
    /// Create an interval, rejecting empty or inverted ranges.
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidTimeRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Convenience constructor from `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// Interval of `minutes` length beginning at `start`, if it fits in the day.
    pub fn starting_at(start: ClockTime, minutes: u16) -> Option<Self> {
        let end = start.checked_add(minutes)?;
        Self::new(start, end).ok()
    }

    pub fn start(&self) -> ClockTime {
        self.start
    }

    pub fn end(&self) -> ClockTime {
        self.end
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> u16 {
        self.end.0 - self.start.0
    }

    /// Check if this interval overlaps with another (touching ends do not).
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if `other` lies fully inside this interval.
    pub fn contains(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Common part of two intervals, if non-empty.
    pub fn intersect(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        TimeInterval::new(start, end).ok()
    }

    /// Check if a block of the given length fits.
    pub fn can_fit(&self, minutes: u16) -> bool {
        self.duration_minutes() >= minutes
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for TimeInterval {
    type Err = ValidationError;

    /// Parses `HH:MM-HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "interval".to_string(),
                message: format!("expected HH:MM-HH:MM, got '{s}'"),
            })?;
        Self::parse(start, end)
    }
}

/// Parses a comma-separated list of `HH:MM-HH:MM` windows.
pub fn parse_windows(s: &str) -> Result<Vec<TimeInterval>, ValidationError> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: &str, end: &str) -> TimeInterval {
        TimeInterval::parse(start, end).unwrap()
    }

    #[test]
    fn clock_time_parses_and_formats() {
        let t: ClockTime = "08:30".parse().unwrap();
        assert_eq!(t.minutes(), 510);
        assert_eq!(t.to_string(), "08:30");
        assert_eq!("24:00".parse::<ClockTime>().unwrap(), ClockTime::END_OF_DAY);
    }

    #[test]
    fn clock_time_rejects_out_of_range() {
        assert!("24:01".parse::<ClockTime>().is_err());
        assert!("12:60".parse::<ClockTime>().is_err());
        assert!("noon".parse::<ClockTime>().is_err());
        assert!(ClockTime::from_minutes(MINUTES_PER_DAY + 1).is_err());
    }

    #[test]
    fn clock_time_requires_two_digit_parts() {
        for text in ["+8:5", "8:05", "08:5", "008:00", "+08:05", "08:-5"] {
            assert!(text.parse::<ClockTime>().is_err(), "{text} should be rejected");
        }
        assert_eq!("08:05".parse::<ClockTime>().unwrap().minutes(), 8 * 60 + 5);
        assert_eq!(" 24:00 ".parse::<ClockTime>().unwrap().minutes(), MINUTES_PER_DAY);
    }

    #[test]
    fn clock_time_from_naive_truncates_seconds() {
        let t = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(ClockTime::from_naive(t).to_string(), "23:59");
    }

    #[test]
    fn interval_rejects_inverted_and_empty() {
        assert!(TimeInterval::parse("09:00", "09:00").is_err());
        assert!(TimeInterval::parse("10:00", "09:00").is_err());
    }

    #[test]
    fn interval_overlap_is_half_open() {
        assert!(!iv("08:00", "09:00").overlaps(&iv("09:00", "10:00")));
        assert!(iv("08:00", "09:01").overlaps(&iv("09:00", "10:00")));
    }

    #[test]
    fn interval_intersection() {
        let a = iv("07:00", "09:00");
        assert_eq!(a.intersect(&iv("08:00", "12:00")), Some(iv("08:00", "09:00")));
        assert_eq!(a.intersect(&iv("09:00", "12:00")), None);
        assert!(a.contains(&iv("07:30", "08:00")));
    }

    #[test]
    fn starting_at_respects_end_of_day() {
        let late: ClockTime = "23:00".parse().unwrap();
        assert_eq!(TimeInterval::starting_at(late, 60), Some(iv("23:00", "24:00")));
        assert_eq!(TimeInterval::starting_at(late, 61), None);
    }

    #[test]
    fn windows_parse_from_list() {
        let windows = parse_windows("07:00-09:00, 18:00-20:00").unwrap();
        assert_eq!(windows, vec![iv("07:00", "09:00"), iv("18:00", "20:00")]);
        assert!(parse_windows("07:00").is_err());
    }

    #[test]
    fn interval_serde_validates() {
        let json = r#"{"start":"07:00","end":"09:00"}"#;
        let parsed: TimeInterval = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, iv("07:00", "09:00"));
        let bad = r#"{"start":"09:00","end":"07:00"}"#;
        assert!(serde_json::from_str::<TimeInterval>(bad).is_err());
    }

    #[test]
    fn week_starts_on_monday() {
        assert_eq!(WEEK[0], Weekday::Mon);
        assert_eq!(day_index(Weekday::Sun), 6);
    }
}
