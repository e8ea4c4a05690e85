//! Invoice settings and issuing invoices for completed appointments

use crate::db::tables::is_unique_violation_on;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::invoice::normalize_prefix;
use crate::models::{AppointmentStatus, Business, Invoice, InvoiceSettings};

pub const MAX_TAX_RATE_BPS: i64 = 10_000;

pub fn update_settings(
    db: &Database,
    business: &Business,
    prefix: &str,
    tax_rate_bps: i64,
    next_number: Option<i64>,
) -> AppResult<InvoiceSettings> {
    let prefix = normalize_prefix(prefix).map_err(AppError::Validation)?;
    if !(0..=MAX_TAX_RATE_BPS).contains(&tax_rate_bps) {
        return Err(AppError::validation("Tax rate must be between 0 and 10000 basis points"));
    }
    if let Some(next) = next_number {
        if next < 1 {
            return Err(AppError::validation("Next invoice number must be at least 1"));
        }
        if let Some(highest) = db.max_invoice_number(business.id)? {
            if next <= highest {
                return Err(AppError::Validation(format!(
                    "Next invoice number must be greater than {}, the last number issued",
                    highest
                )));
            }
        }
    }
    Ok(db.upsert_invoice_settings(business.id, &prefix, tax_rate_bps, next_number)?)
}

pub fn issue_for_appointment(db: &Database, business: &Business, appointment_id: i64) -> AppResult<Invoice> {
    let appointment = db
        .get_appointment(business.id, appointment_id)?
        .ok_or_else(|| AppError::not_found("Appointment"))?;
    if appointment.status != AppointmentStatus::Completed {
        return Err(AppError::validation("Only completed appointments can be invoiced"));
    }
    if db.get_invoice_for_appointment(appointment.id)?.is_some() {
        return Err(AppError::conflict("This appointment has already been invoiced"));
    }

    let invoice = db
        .issue_invoice(business.id, appointment.id, appointment.total_amount)
        .map_err(|e| {
            if is_unique_violation_on(&e, "invoices.appointment_id") {
                AppError::conflict("This appointment has already been invoiced")
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| AppError::validation("Configure invoice settings before issuing invoices"))?;

    log::info!("[INVOICES] Issued {} for appointment {}", invoice.full_number, appointment.id);
    Ok(invoice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;
    use crate::services::appointments::{book, change_status, BookingRequest};
    use chrono::NaiveDate;

    fn completed_appointment(db: &Database, business: &Business, seed: &crate::db::test_support::Seed, hour: u32) -> i64 {
        let start = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(hour, 0, 0).unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let appt = book(
            db,
            business,
            &BookingRequest {
                client_id: seed.client_id,
                specialist_id: seed.specialist_id,
                service_id: seed.service_id,
                starts_at: start,
                notes: None,
            },
            now,
        )
        .unwrap();
        change_status(db, business, appt.id, AppointmentStatus::Confirmed).unwrap();
        change_status(db, business, appt.id, AppointmentStatus::Completed).unwrap();
        appt.id
    }

    #[test]
    fn test_next_number_cannot_reuse_issued_numbers() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        update_settings(&db, &business, "fact", 0, None).unwrap();
        let first = completed_appointment(&db, &business, &seed, 10);
        assert_eq!(issue_for_appointment(&db, &business, first).unwrap().full_number, "FACT-000001");

        assert!(matches!(
            update_settings(&db, &business, "fact", 0, Some(1)),
            Err(AppError::Validation(_))
        ));
        assert_eq!(update_settings(&db, &business, "fact", 0, Some(5)).unwrap().next_number, 5);

        let second = completed_appointment(&db, &business, &seed, 12);
        assert_eq!(issue_for_appointment(&db, &business, second).unwrap().full_number, "FACT-000005");
    }

    #[test]
    fn test_number_collision_is_not_reported_as_already_invoiced() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        update_settings(&db, &business, "fact", 0, None).unwrap();
        let first = completed_appointment(&db, &business, &seed, 10);
        issue_for_appointment(&db, &business, first).unwrap();

        // Rewind the counter underneath the service
        db.upsert_invoice_settings(business.id, "FACT", 0, Some(1)).unwrap();
        let second = completed_appointment(&db, &business, &seed, 12);
        let err = issue_for_appointment(&db, &business, second).unwrap_err();
        assert!(!matches!(err, AppError::Conflict(_)));
        assert!(db.get_invoice_for_appointment(second).unwrap().is_none());
    }

    #[test]
    fn test_settings_validation() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        assert!(matches!(
            update_settings(&db, &business, "FAC", 0, None),
            Err(AppError::Validation(_))
        ));
        assert!(update_settings(&db, &business, "fact", 10_001, None).is_err());
        assert!(update_settings(&db, &business, "fact", 1_900, Some(0)).is_err());
        assert_eq!(update_settings(&db, &business, "fact", 1_900, None).unwrap().prefix, "FACT");
    }

    #[test]
    fn test_issue_only_completed_and_once() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let appt = book(
            &db,
            &business,
            &BookingRequest {
                client_id: seed.client_id,
                specialist_id: seed.specialist_id,
                service_id: seed.service_id,
                starts_at: start,
                notes: None,
            },
            now,
        )
        .unwrap();

        assert!(matches!(
            issue_for_appointment(&db, &business, appt.id),
            Err(AppError::Validation(_))
        ));
        change_status(&db, &business, appt.id, AppointmentStatus::Confirmed).unwrap();
        change_status(&db, &business, appt.id, AppointmentStatus::Completed).unwrap();

        // Still no settings
        assert!(matches!(
            issue_for_appointment(&db, &business, appt.id),
            Err(AppError::Validation(_))
        ));

        update_settings(&db, &business, "glow", 1_900, None).unwrap();
        let invoice = issue_for_appointment(&db, &business, appt.id).unwrap();
        assert_eq!(invoice.full_number, "GLOW-000001");
        assert_eq!(invoice.total, 5_950_000);
        assert!(matches!(
            issue_for_appointment(&db, &business, appt.id),
            Err(AppError::Conflict(_))
        ));
    }
}
