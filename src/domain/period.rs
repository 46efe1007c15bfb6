//! Reporting periods and their calendar boundaries.
//!
//! Boundaries are computed in the shop's local offset and converted to UTC
//! instants before they reach the store.

use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta,
    Utc,
};
use std::fmt;
use std::str::FromStr;

use super::error::ShopError;

const CUSTOM_DEFAULT_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Quarter,
    Semester,
    Year,
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

/// Inclusive range of UTC instants, as handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Inclusive range of shop-local instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DateRange {
    pub fn to_utc(&self) -> TimeRange {
        TimeRange {
            start: self.start.with_timezone(&Utc),
            end: self.end.with_timezone(&Utc),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

fn local(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = naive - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    local(date.and_time(NaiveTime::MIN), offset)
}

pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    local(
        date.and_time(NaiveTime::MIN) + TimeDelta::days(1) - TimeDelta::milliseconds(1),
        offset,
    )
}

/// The whole local day `date`.
pub fn day_range(date: NaiveDate, offset: FixedOffset) -> DateRange {
    DateRange {
        start: start_of_day(date, offset),
        end: end_of_day(date, offset),
    }
}

/// Local calendar date of a stored instant.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

fn whole_days(first: NaiveDate, last: NaiveDate, offset: FixedOffset) -> DateRange {
    DateRange {
        start: start_of_day(first, offset),
        end: end_of_day(last, offset),
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Range covering `months` months starting `back` months before the month of `date`.
fn month_block(date: NaiveDate, back: u32, months: u32) -> (NaiveDate, NaiveDate) {
    let first = first_of_month(date) - Months::new(back);
    let last = first + Months::new(months) - Days::new(1);
    (first, last)
}

impl Period {
    /// Parse a period name. Custom bounds are attached by [`Period::custom`].
    pub fn from_name(name: &str) -> Result<Self, ShopError> {
        name.parse()
    }

    pub fn custom(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Period::Custom { start, end }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Day => "Aujourd'hui",
            Period::Week => "Cette semaine",
            Period::Month => "Ce mois",
            Period::Quarter => "Ce trimestre",
            Period::Semester => "Ce semestre",
            Period::Year => "Cette année",
            Period::Custom { .. } => "Période personnalisée",
        }
    }

    pub fn range(&self, now: DateTime<FixedOffset>) -> Result<DateRange, ShopError> {
        let offset = *now.offset();
        let today = now.date_naive();
        let month0 = today.month0();

        let range = match *self {
            Period::Day => day_range(today, offset),
            Period::Week => {
                let monday =
                    today - Days::new(u64::from(today.weekday().num_days_from_monday()));
                whole_days(monday, monday + Days::new(6), offset)
            }
            Period::Month => {
                let (first, last) = month_block(today, 0, 1);
                whole_days(first, last, offset)
            }
            Period::Quarter => {
                let (first, last) = month_block(today, month0 % 3, 3);
                whole_days(first, last, offset)
            }
            Period::Semester => {
                let (first, last) = month_block(today, month0 % 6, 6);
                whole_days(first, last, offset)
            }
            Period::Year => {
                let (first, last) = month_block(today, month0, 12);
                whole_days(first, last, offset)
            }
            Period::Custom { start, end } => {
                let start = match start {
                    Some(date) => start_of_day(date, offset),
                    None => now - TimeDelta::days(CUSTOM_DEFAULT_LOOKBACK_DAYS),
                };
                let end = match end {
                    Some(date) => end_of_day(date, offset),
                    None => now,
                };
                if start > end {
                    return Err(ShopError::validation(
                        "period",
                        format!(
                            "custom start {} is after end {}",
                            start.date_naive(),
                            end.date_naive()
                        ),
                    ));
                }
                DateRange { start, end }
            }
        };

        Ok(range)
    }
}

impl FromStr for Period {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jour" | "day" | "today" => Ok(Period::Day),
            "semaine" | "week" => Ok(Period::Week),
            "mois" | "month" => Ok(Period::Month),
            "trimestre" | "quarter" => Ok(Period::Quarter),
            "semestre" | "semester" => Ok(Period::Semester),
            "annee" | "année" | "year" => Ok(Period::Year),
            "custom" | "personnalise" | "personnalisé" => Ok(Period::Custom {
                start: None,
                end: None,
            }),
            other => Err(ShopError::validation(
                "period",
                format!("unknown period '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Semester => "semester",
            Period::Year => "year",
            Period::Custom { .. } => "custom",
        };
        f.write_str(name)
    }
}
