//! Period keys: the time buckets entries are aggregated over.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Error parsing a period key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid period key '{0}': expected YYYY-MM or YYYY-MM-DD")]
pub struct PeriodKeyError(pub String);

/// Granularity at which entries are bucketed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Calendar month
    #[default]
    Month,
    /// Single calendar day
    Day,
}

/// A time bucket, rendered `YYYY-MM` or `YYYY-MM-DD`.
///
/// Dates are UTC calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PeriodKey {
    /// A calendar month; `first` is always the first day of the month
    Month { first: NaiveDate },
    /// A single day
    Day(NaiveDate),
}

impl PeriodKey {
    /// Key for a calendar month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self::Month { first })
    }

    /// Key for a single day.
    pub fn day(date: NaiveDate) -> Self {
        Self::Day(date)
    }

    /// Key of the bucket a timestamp falls into.
    pub fn of(at: DateTime<Utc>, granularity: Granularity) -> Self {
        let date = at.date_naive();
        match granularity {
            Granularity::Day => Self::Day(date),
            Granularity::Month => Self::Month {
                first: date.with_day(1).unwrap_or(date),
            },
        }
    }

    /// Granularity of this key.
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Month { .. } => Granularity::Month,
            Self::Day(_) => Granularity::Day,
        }
    }

    /// Whether entries keyed `other` belong to this bucket.
    ///
    /// A month covers itself and each of its days; a day covers only itself.
    pub fn covers(&self, other: &PeriodKey) -> bool {
        match (self, other) {
            (Self::Month { first }, Self::Day(date)) => {
                first.year() == date.year() && first.month() == date.month()
            }
            _ => self == other,
        }
    }

    /// Half-open date range of this bucket, for store queries.
    pub fn range(&self) -> PeriodRange {
        match *self {
            Self::Month { first } => PeriodRange {
                start: first,
                end: first
                    .checked_add_months(chrono::Months::new(1))
                    .unwrap_or(NaiveDate::MAX),
            },
            Self::Day(date) => PeriodRange {
                start: date,
                end: date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX),
            },
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month { first } => write!(f, "{:04}-{:02}", first.year(), first.month()),
            Self::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for PeriodKey {
    type Err = PeriodKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || PeriodKeyError(s.to_string());

        match raw.len() {
            10 => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Self::Day)
                .map_err(|_| invalid()),
            7 => {
                let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                Self::month(year, month).ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = PeriodKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(key: PeriodKey) -> Self {
        key.to_string()
    }
}

/// Half-open UTC date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodRange {
    /// Whether the timestamp falls inside the range.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let date = at.date_naive();
        date >= self.start && date < self.end
    }
}
