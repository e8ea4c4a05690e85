//! Booking, status changes, payments and availability

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::db::tables::NewAppointment;
use crate::db::Database;
use crate::domain::scheduling::within_opening_hours;
use crate::domain::available_slots;
use crate::error::{AppError, AppResult};
use crate::models::{
    Appointment, AppointmentPayment, AppointmentStatus, AppointmentView, Business, PaymentMethod,
};
use crate::services::commissions;

/// Minutes between candidate slot start times
pub const SLOT_STEP_MINUTES: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub client_id: i64,
    pub specialist_id: i64,
    pub service_id: i64,
    pub starts_at: NaiveDateTime,
    pub notes: Option<String>,
}

pub fn book(db: &Database, business: &Business, request: &BookingRequest, now: NaiveDateTime) -> AppResult<Appointment> {
    db.get_client(business.id, request.client_id)?
        .ok_or_else(|| AppError::not_found("Client"))?;
    let specialist = db
        .get_specialist(business.id, request.specialist_id)?
        .ok_or_else(|| AppError::not_found("Specialist"))?;
    let service = db
        .get_service(business.id, request.service_id)?
        .ok_or_else(|| AppError::not_found("Service"))?;

    if !specialist.is_active {
        return Err(AppError::validation(format!("{} is not taking appointments", specialist.name)));
    }
    if !service.is_active {
        return Err(AppError::validation(format!("{} is not currently offered", service.name)));
    }
    if request.starts_at < now {
        return Err(AppError::validation("Appointments cannot be booked in the past"));
    }

    let ends_at = request.starts_at + Duration::minutes(service.duration_minutes);
    if !within_opening_hours(request.starts_at, ends_at, business.opening_time, business.closing_time) {
        return Err(AppError::validation(format!(
            "Appointments must fall between {} and {}",
            business.opening_time.format("%H:%M"),
            business.closing_time.format("%H:%M")
        )));
    }

    let new = NewAppointment {
        business_id: business.id,
        client_id: request.client_id,
        specialist_id: specialist.id,
        service_id: service.id,
        starts_at: request.starts_at,
        ends_at,
        total_amount: service.price,
        notes: request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()),
    };
    let appointment = db
        .create_appointment_if_free(&new)?
        .ok_or_else(|| AppError::conflict(format!("{} already has an appointment at that time", specialist.name)))?;

    log::info!(
        "[APPOINTMENTS] Booked appointment {} for business {} at {}",
        appointment.id,
        business.id,
        appointment.starts_at
    );
    Ok(appointment)
}

pub fn get(db: &Database, business: &Business, appointment_id: i64) -> AppResult<Appointment> {
    db.get_appointment(business.id, appointment_id)?
        .ok_or_else(|| AppError::not_found("Appointment"))
}

/// Appointments on the days `[from, to]`
pub fn list(
    db: &Database,
    business: &Business,
    from: NaiveDate,
    to: NaiveDate,
    specialist_id: Option<i64>,
) -> AppResult<Vec<AppointmentView>> {
    if to < from {
        return Err(AppError::validation("'to' must not be before 'from'"));
    }
    if (to - from).num_days() > 92 {
        return Err(AppError::validation("Date range cannot exceed 92 days"));
    }
    let start = from.and_time(NaiveTime::MIN);
    let end = (to + Duration::days(1)).and_time(NaiveTime::MIN);
    Ok(db
        .list_appointments(business.id, start, end, specialist_id)?
        .into_iter()
        .map(AppointmentView::from)
        .collect())
}

/// Apply a status transition. Completing an appointment accrues its commission.
pub fn change_status(
    db: &Database,
    business: &Business,
    appointment_id: i64,
    next: AppointmentStatus,
) -> AppResult<Appointment> {
    let current = get(db, business, appointment_id)?;
    if !current.status.can_transition_to(next) {
        return Err(AppError::validation(format!(
            "Cannot change an appointment from {} to {}",
            current.status, next
        )));
    }

    if !db.update_appointment_status(business.id, appointment_id, current.status, next)? {
        return Err(AppError::conflict("The appointment was modified concurrently, please retry"));
    }
    let updated = get(db, business, appointment_id)?;

    if next == AppointmentStatus::Completed {
        if let Some(commission) = commissions::accrue_for_appointment(db, &updated)? {
            log::info!(
                "[COMMISSIONS] Accrued {} for specialist {} on appointment {}",
                commission.amount,
                commission.specialist_id,
                updated.id
            );
        }
    }
    Ok(updated)
}

pub fn record_payment(
    db: &Database,
    business: &Business,
    appointment_id: i64,
    amount: i64,
    method: PaymentMethod,
    paid_at: NaiveDateTime,
) -> AppResult<(AppointmentView, AppointmentPayment)> {
    if amount <= 0 {
        return Err(AppError::validation("Payment amount must be greater than zero"));
    }
    let appointment = get(db, business, appointment_id)?;
    if !appointment.status.blocks_schedule() {
        return Err(AppError::validation(format!(
            "Cannot take payments on a {} appointment",
            appointment.status
        )));
    }
    if amount > appointment.balance() {
        return Err(AppError::validation(format!(
            "Payment exceeds the outstanding balance of {}",
            crate::domain::format_currency(appointment.balance(), business.currency)
        )));
    }

    let payment = db
        .add_appointment_payment(appointment_id, amount, method, paid_at)?
        .ok_or_else(|| AppError::conflict("Payment exceeds the outstanding balance"))?;
    let appointment = get(db, business, appointment_id)?;
    Ok((appointment.into(), payment))
}

/// Free start times for a specialist and service on a date
pub fn availability(
    db: &Database,
    business: &Business,
    specialist_id: i64,
    service_id: i64,
    date: NaiveDate,
    now: NaiveDateTime,
) -> AppResult<Vec<NaiveDateTime>> {
    let specialist = db
        .get_specialist(business.id, specialist_id)?
        .ok_or_else(|| AppError::not_found("Specialist"))?;
    let service = db
        .get_service(business.id, service_id)?
        .ok_or_else(|| AppError::not_found("Service"))?;
    if !specialist.is_active || !service.is_active {
        return Ok(Vec::new());
    }

    let day_start = date.and_time(NaiveTime::MIN);
    let busy = db.specialist_busy_intervals(specialist.id, day_start, day_start + Duration::days(1))?;
    Ok(available_slots(
        date,
        business.opening_time,
        business.closing_time,
        service.duration_minutes,
        SLOT_STEP_MINUTES,
        &busy,
        Some(now),
    ))
}
