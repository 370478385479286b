use std::fmt;

use serde::{Deserialize, Serialize};
use time::macros::time;
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::domain::IncidentRecord;
use crate::error::AppError;

/// One calendar month in UTC, bounding an aggregation window.
///
/// Both bounds are inclusive: `start()` is the first instant of day 1 and `end()` the last
/// representable instant of the final day.
///
/// Serialized as `{ "year": 2024, "month": 3 }`; deserialization re-validates through
/// `ReportingPeriod::new`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "PeriodRepr", into = "PeriodRepr")]
pub struct ReportingPeriod {
    first_day: Date,
    last_day: Date,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PeriodRepr {
    year: i32,
    month: u8,
}

impl TryFrom<PeriodRepr> for ReportingPeriod {
    type Error = AppError;

    fn try_from(repr: PeriodRepr) -> Result<Self, Self::Error> {
        Self::new(repr.year, repr.month)
    }
}

impl From<ReportingPeriod> for PeriodRepr {
    fn from(period: ReportingPeriod) -> Self {
        Self {
            year: period.year(),
            month: period.month() as u8,
        }
    }
}

/// Transient grouping key used while aggregating; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayBucketKey {
    pub host_id: String,
    pub trigger_id: String,
    pub day: Date,
}

fn invalid_period(year: i32, month: impl fmt::Display, err: impl fmt::Display) -> AppError {
    AppError::new("PERIOD_INVALID", "Invalid reporting period")
        .with_details(format!("year={year}; month={month}; err={err}"))
}

impl ReportingPeriod {
    pub fn new(year: i32, month: u8) -> Result<Self, AppError> {
        let m = Month::try_from(month).map_err(|e| invalid_period(year, month, e))?;
        Self::from_year_month(year, m)
    }

    fn from_year_month(year: i32, month: Month) -> Result<Self, AppError> {
        let first_day =
            Date::from_calendar_date(year, month, 1).map_err(|e| invalid_period(year, month, e))?;
        let (next_year, next_month) = match month {
            Month::December => (year + 1, Month::January),
            m => (year, m.next()),
        };
        let last_day = Date::from_calendar_date(next_year, next_month, 1)
            .ok()
            .and_then(|d| d.previous_day())
            .ok_or_else(|| invalid_period(year, month, "month end out of range"))?;
        Ok(Self {
            first_day,
            last_day,
        })
    }

    /// The period containing `at` (converted to UTC first).
    pub fn from_instant(at: OffsetDateTime) -> Result<Self, AppError> {
        let at = at.to_offset(UtcOffset::UTC);
        Self::from_year_month(at.year(), at.month())
    }

    pub fn previous(&self) -> Result<Self, AppError> {
        let prev = self.first_day.previous_day().ok_or_else(|| {
            invalid_period(self.year(), self.month(), "no month before this period")
        })?;
        Self::from_year_month(prev.year(), prev.month())
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> Month {
        self.first_day.month()
    }

    pub fn first_day(&self) -> Date {
        self.first_day
    }

    pub fn last_day(&self) -> Date {
        self.last_day
    }

    pub fn start(&self) -> OffsetDateTime {
        self.first_day.midnight().assume_utc()
    }

    pub fn end(&self) -> OffsetDateTime {
        self.last_day
            .with_time(time!(23:59:59.999_999_999))
            .assume_utc()
    }

    pub fn contains(&self, at: OffsetDateTime) -> bool {
        at >= self.start() && at <= self.end()
    }

    /// Every calendar day of the period, in order.
    pub fn days(&self) -> impl Iterator<Item = Date> {
        let last = self.last_day;
        std::iter::successors(Some(self.first_day), move |d| {
            d.next_day().filter(|next| *next <= last)
        })
    }

    /// Day-bucket key for an incident, or `None` when its start falls outside the period.
    pub fn bucket_key(&self, incident: &IncidentRecord) -> Option<DayBucketKey> {
        if !self.contains(incident.start) {
            return None;
        }
        Some(DayBucketKey {
            host_id: incident.host_id.clone(),
            trigger_id: incident.trigger_id.clone(),
            day: day_of(incident.start),
        })
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month() as u8)
    }
}

/// Calendar day in UTC: the instant truncated to midnight.
pub fn day_of(at: OffsetDateTime) -> Date {
    at.to_offset(UtcOffset::UTC).date()
}
