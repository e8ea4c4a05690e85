use actix_web::{web, HttpResponse};
use chrono::NaiveDateTime;
use serde::Deserialize;

use super::{business_now, parse_date_param};
use crate::error::{created, ok, AppError};
use crate::middleware::AuthContext;
use crate::models::{AppointmentStatus, AppointmentView, PaymentMethod};
use crate::services::appointments::{self, BookingRequest};
use crate::services::businesses::require_business;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    from: Option<String>,
    to: Option<String>,
    specialist_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: AppointmentStatus,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    amount: i64,
    method: PaymentMethod,
    paid_at: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    specialist_id: i64,
    service_id: i64,
    date: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/businesses/{business_id}/appointments")
            .route(web::get().to(list_appointments))
            .route(web::post().to(book_appointment)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/appointments/{appointment_id}")
            .route(web::get().to(get_appointment)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/appointments/{appointment_id}/status")
            .route(web::put().to(change_status)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/appointments/{appointment_id}/payments")
            .route(web::get().to(list_payments))
            .route(web::post().to(record_payment)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/availability")
            .route(web::get().to(availability)),
    );
}

async fn list_appointments(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let today = business_now().date();
    let from = parse_date_param("from", query.from.as_deref())?.unwrap_or(today);
    let to = parse_date_param("to", query.to.as_deref())?.unwrap_or(from);
    Ok(ok(appointments::list(&state.db, &business, from, to, query.specialist_id)?))
}

async fn book_appointment(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let appointment = appointments::book(&state.db, &business, &body, business_now())?;
    Ok(created(AppointmentView::from(appointment)))
}

async fn get_appointment(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (business_id, appointment_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let appointment = appointments::get(&state.db, &business, appointment_id)?;
    Ok(ok(AppointmentView::from(appointment)))
}

async fn change_status(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<StatusRequest>,
) -> Result<HttpResponse, AppError> {
    let (business_id, appointment_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let appointment = appointments::change_status(&state.db, &business, appointment_id, body.status)?;
    Ok(ok(AppointmentView::from(appointment)))
}

async fn list_payments(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (business_id, appointment_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let appointment = appointments::get(&state.db, &business, appointment_id)?;
    Ok(ok(state.db.list_appointment_payments(appointment.id)?))
}

async fn record_payment(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<PaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let (business_id, appointment_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let paid_at = body.paid_at.unwrap_or_else(business_now);
    let (appointment, payment) =
        appointments::record_payment(&state.db, &business, appointment_id, body.amount, body.method, paid_at)?;
    Ok(created(serde_json::json!({
        "appointment": appointment,
        "payment": payment,
    })))
}

async fn availability(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let date = parse_date_param("date", Some(&query.date))?
        .ok_or_else(|| AppError::validation("'date' is required"))?;
    let slots = appointments::availability(
        &state.db,
        &business,
        query.specialist_id,
        query.service_id,
        date,
        business_now(),
    )?;
    Ok(ok(serde_json::json!({
        "date": date,
        "slots": slots,
        "times": slots.iter().map(|s| s.format("%H:%M").to_string()).collect::<Vec<_>>(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, seeded_state};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_book_pay_and_complete() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let base = format!("/api/businesses/{}/appointments", seed.business_id);

        let req = test::TestRequest::post()
            .uri(&base)
            .insert_header(bearer(&token))
            .set_json(json!({
                "client_id": seed.client_id,
                "specialist_id": seed.specialist_id,
                "service_id": seed.service_id,
                "starts_at": "2099-01-05T10:00:00"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["balance"], 5_000_000);
        let id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("{}/{}/payments", base, id))
            .insert_header(bearer(&token))
            .set_json(json!({"amount": 2_000_000, "method": "cash"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["appointment"]["payment_status"], "partial");
        assert_eq!(body["data"]["appointment"]["balance"], 3_000_000);

        let req = test::TestRequest::put()
            .uri(&format!("{}/{}/status", base, id))
            .insert_header(bearer(&token))
            .set_json(json!({"status": "completed"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        for status in ["confirmed", "completed"] {
            let req = test::TestRequest::put()
                .uri(&format!("{}/{}/status", base, id))
                .insert_header(bearer(&token))
                .set_json(json!({ "status": status }))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["data"]["status"], status);
        }
    }

    #[actix_web::test]
    async fn test_overlapping_booking_conflicts() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let base = format!("/api/businesses/{}/appointments", seed.business_id);

        for (starts_at, expected) in [("2099-01-05T10:00:00", 201), ("2099-01-05T10:30:00", 409)] {
            let req = test::TestRequest::post()
                .uri(&base)
                .insert_header(bearer(&token))
                .set_json(json!({
                    "client_id": seed.client_id,
                    "specialist_id": seed.specialist_id,
                    "service_id": seed.service_id,
                    "starts_at": starts_at
                }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }
    }

    #[actix_web::test]
    async fn test_availability_lists_times() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/businesses/{}/availability?specialist_id={}&service_id={}&date=2099-01-05",
                seed.business_id, seed.specialist_id, seed.service_id
            ))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let times = body["data"]["times"].as_array().unwrap();
        assert_eq!(times.first().unwrap(), "09:00");
        assert_eq!(times.last().unwrap(), "18:00");
    }
}
