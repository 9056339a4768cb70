use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock time of day at minute granularity.
///
/// Stored as minutes since midnight; the `"9:00 AM"` label form only exists at
/// the boundary (JSON, chat adapters, display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Time value is empty")]
    Empty,

    #[error("Unrecognised time '{0}', expected e.g. '9:30 AM' or '13:30'")]
    Invalid(String),
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(Self((hour * 60 + minute) as u16))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Adds minutes, returning `None` when the result leaves the day.
    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        let total = self.0 as u32 + minutes;
        u16::try_from(total).ok().and_then(Self::from_minutes)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour() as u32, self.minute() as u32, 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Truncates seconds.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }

    /// Twelve-hour display label, e.g. `"9:00 AM"` or `"12:30 PM"`.
    pub fn label(self) -> String {
        let hour = self.hour();
        let suffix = if hour < 12 { "AM" } else { "PM" };
        let display_hour = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", display_hour, self.minute(), suffix)
    }

    /// Accepts twelve-hour labels (`"9:00 AM"`, `"09:00am"`) and 24-hour
    /// values (`"13:30"`).
    pub fn parse(input: &str) -> Result<Self, TimeParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TimeParseError::Empty);
        }
        let invalid = || TimeParseError::Invalid(trimmed.to_string());

        let upper = trimmed.to_ascii_uppercase();
        let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (upper.as_str(), None)
        };

        let (hour_part, minute_part) = clock.split_once(':').ok_or_else(invalid)?;
        if hour_part.is_empty() || hour_part.len() > 2 || minute_part.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = hour_part.parse().map_err(|_| invalid())?;
        let minute: u32 = minute_part.parse().map_err(|_| invalid())?;

        let hour = match meridiem {
            Some(is_pm) => {
                if !(1..=12).contains(&hour) {
                    return Err(invalid());
                }
                match (hour, is_pm) {
                    (12, false) => 0,
                    (12, true) => 12,
                    (h, false) => h,
                    (h, true) => h + 12,
                }
            }
            None => hour,
        };

        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_twelve_hour_labels() {
        assert_eq!(TimeOfDay::parse("9:00 AM").unwrap().minutes(), 9 * 60);
        assert_eq!(TimeOfDay::parse("09:30am").unwrap().minutes(), 9 * 60 + 30);
        assert_eq!(TimeOfDay::parse("12:00 PM").unwrap().minutes(), 12 * 60);
        assert_eq!(TimeOfDay::parse("12:15 AM").unwrap().minutes(), 15);
        assert_eq!(TimeOfDay::parse("1:00 pm").unwrap().minutes(), 13 * 60);
    }

    #[test]
    fn test_parse_twenty_four_hour_values() {
        assert_eq!(TimeOfDay::parse("13:30").unwrap().minutes(), 13 * 60 + 30);
        assert_eq!(TimeOfDay::parse("00:00").unwrap(), TimeOfDay::MIDNIGHT);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(TimeOfDay::parse("   "), Err(TimeParseError::Empty));
        assert!(TimeOfDay::parse("13:00 PM").is_err());
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("9:7 AM").is_err());
        assert!(TimeOfDay::parse("noon").is_err());
    }

    #[test]
    fn test_label_rendering() {
        assert_eq!(TimeOfDay::from_hm(9, 0).unwrap().label(), "9:00 AM");
        assert_eq!(TimeOfDay::from_hm(12, 30).unwrap().label(), "12:30 PM");
        assert_eq!(TimeOfDay::from_hm(0, 5).unwrap().label(), "12:05 AM");
        assert_eq!(TimeOfDay::from_hm(23, 45).unwrap().to_string(), "11:45 PM");
    }

    #[test]
    fn test_checked_add_stays_within_day() {
        let late = TimeOfDay::from_hm(23, 30).unwrap();
        assert_eq!(late.checked_add_minutes(29).unwrap().minutes(), 23 * 60 + 59);
        assert!(late.checked_add_minutes(30).is_none());
    }

    #[test]
    fn test_serde_uses_label() {
        let time = TimeOfDay::from_hm(14, 0).unwrap();
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, "\"2:00 PM\"");
        let back: TimeOfDay = serde_json::from_str("\"14:00\"").unwrap();
        assert_eq!(back, time);
    }
}
