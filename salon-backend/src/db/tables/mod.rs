//! Database operations grouped by table

mod accounts;
mod agent;
mod appointments;
mod auth_sessions;
mod businesses;
mod catalog;
mod clients;
mod commissions;
mod goals;
mod inventory;
mod invoices;
mod subscriptions;
mod whatsapp;

pub use appointments::NewAppointment;
pub use inventory::StockChange;

use rusqlite::types::Type;
use std::str::FromStr;

/// Parse a TEXT column into a strum-backed enum
pub(crate) fn parse_enum<T: FromStr>(idx: usize, value: String) -> rusqlite::Result<T> {
    value.parse::<T>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected enum value '{}'", value).into(),
        )
    })
}

/// Whether the error is a UNIQUE / constraint violation
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Whether the error is a UNIQUE violation on `table.column`
pub(crate) fn is_unique_violation_on(err: &rusqlite::Error, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(message)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            message.starts_with("UNIQUE") && message.contains(column)
        }
        _ => false,
    }
}
