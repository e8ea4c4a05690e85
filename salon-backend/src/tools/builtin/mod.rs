mod availability;
mod booking;
mod catalog;

pub use availability::CheckAvailabilityTool;
pub use booking::BookAppointmentTool;
pub use catalog::{ListServicesTool, ListSpecialistsTool};

use chrono::{NaiveDate, NaiveDateTime};

/// Accepts `YYYY-MM-DD`
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Accepts `YYYY-MM-DDTHH:MM`, with a space instead of `T`, and optional seconds
pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}
