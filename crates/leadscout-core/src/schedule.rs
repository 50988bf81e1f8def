//! Recurring and one-time schedules, trigger slots, and the fingerprint used
//! to keep identical scrapes out of the same minute.

use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::{JobTemplate, PhoneMode};
use crate::CoreError;

/// Full English weekday name, as stored in `recurring_days`.
#[must_use]
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a weekday name, case-insensitively. Short forms (`"Mon"`) are accepted.
///
/// # Errors
///
/// Returns [`CoreError::InvalidWeekday`] when the name is not a weekday.
pub fn parse_weekday(name: &str) -> Result<Weekday, CoreError> {
    name.trim()
        .parse::<Weekday>()
        .map_err(|_| CoreError::InvalidWeekday(name.to_string()))
}

/// A wall-clock trigger time, hour 0-23 and minute 0-59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotTime {
    pub hour: u8,
    pub minute: u8,
}

impl SlotTime {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSlot`] when hour or minute is out of range.
    pub fn new(hour: i64, minute: i64) -> Result<Self, CoreError> {
        match (u8::try_from(hour), u8::try_from(minute)) {
            (Ok(h), Ok(m)) if h < 24 && m < 60 => Ok(Self { hour: h, minute: m }),
            _ => Err(CoreError::InvalidSlot { hour, minute }),
        }
    }

    /// The following minute; 59 wraps into the next hour and 23:59 into 00:00.
    #[must_use]
    pub fn next_minute(self) -> Self {
        if self.minute == 59 {
            Self {
                hour: (self.hour + 1) % 24,
                minute: 0,
            }
        } else {
            Self {
                hour: self.hour,
                minute: self.minute + 1,
            }
        }
    }
}

impl std::fmt::Display for SlotTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneBucket {
    WithPhone,
    WithoutPhone,
}

impl From<&PhoneMode> for PhoneBucket {
    fn from(mode: &PhoneMode) -> Self {
        match mode {
            PhoneMode::WithPhone | PhoneMode::SpecificNumber { .. } => Self::WithPhone,
            PhoneMode::WithoutPhone => Self::WithoutPhone,
        }
    }
}

/// Filters that identify "the same" recurring scrape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub business_type: String,
    pub business_status: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: PhoneBucket,
}

impl Fingerprint {
    #[must_use]
    pub fn of(job: &JobTemplate) -> Self {
        let f = &job.filters;
        Self {
            business_type: f.business_type.trim().to_string(),
            business_status: f.business_status.trim().to_string(),
            country: f.country.trim().to_string(),
            city: f.city.trim().to_string(),
            state: f.state.trim().to_string(),
            postal_code: f.postal_code.trim().to_string(),
            phone: PhoneBucket::from(&job.phone_mode),
        }
    }
}

/// A persisted recurring or one-time trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub id: i64,
    pub public_id: Uuid,
    #[serde(with = "weekday_names")]
    pub recurring_days: Vec<Weekday>,
    pub slot: SlotTime,
    /// IANA zone id; empty means the configured default.
    pub time_zone: String,
    pub one_time: bool,
    pub paused: bool,
    /// Pagination offset multiplier, starting at 1.
    pub skip_times: i32,
    pub record_limit: i32,
    pub job: JobTemplate,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.job)
    }

    #[must_use]
    pub fn runs_on(&self, day: Weekday) -> bool {
        self.recurring_days.contains(&day)
    }

    /// Zone this schedule is evaluated in.
    ///
    /// # Errors
    ///
    /// Returns the offending id when `time_zone` is not a known IANA zone.
    pub fn zone(&self, default: Tz) -> Result<Tz, String> {
        let id = self.time_zone.trim();
        if id.is_empty() {
            return Ok(default);
        }
        id.parse::<Tz>().map_err(|_| id.to_string())
    }
}

/// A schedule about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSchedule {
    #[serde(with = "weekday_names")]
    pub recurring_days: Vec<Weekday>,
    pub slot: SlotTime,
    pub time_zone: String,
    pub one_time: bool,
    pub skip_times: i32,
    pub record_limit: i32,
    pub job: JobTemplate,
}

mod weekday_names {
    use chrono::Weekday;
    use serde::ser::SerializeSeq;
    use serde::Serializer;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(days: &Vec<Weekday>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(days.len()))?;
        for day in days {
            seq.serialize_element(super::weekday_name(*day))?;
        }
        seq.end()
    }
}
