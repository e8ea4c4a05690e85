//! Calendar ranges for daily, weekly and monthly reporting periods

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

/// Half-open `[start, end)` date range of the period containing `date`.
///
/// Weeks start on Monday.
pub fn period_range(period: Period, date: NaiveDate) -> (NaiveDate, NaiveDate) {
    match period {
        Period::Daily => (date, date + Duration::days(1)),
        Period::Weekly => {
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            (monday, monday + Duration::days(7))
        }
        Period::Monthly => {
            let first = date - Duration::days(date.day0() as i64);
            let next = first
                .checked_add_months(Months::new(1))
                .unwrap_or(NaiveDate::MAX);
            (first, next)
        }
    }
}

/// Same as [`period_range`] but as midnight-aligned timestamps
pub fn period_bounds(period: Period, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let (start, end) = period_range(period, date);
    (start.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN))
}
