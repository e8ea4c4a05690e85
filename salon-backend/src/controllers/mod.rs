pub mod account;
pub mod agent;
pub mod appointments;
pub mod auth;
pub mod businesses;
pub mod catalog;
pub mod clients;
pub mod commissions;
pub mod dashboard;
pub mod health;
pub mod inventory;
pub mod invoices;
pub mod subscriptions;
pub mod webhooks;
pub mod whatsapp;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::{AppError, AppResult};

/// Wall-clock time businesses schedule in
pub fn business_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn parse_date_param(name: &str, value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| AppError::validation(format!("'{}' must be a date in YYYY-MM-DD format", name)))
        })
        .transpose()
}
