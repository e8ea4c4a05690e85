use actix_web::{web, HttpResponse};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use super::{business_now, parse_date_param};
use crate::domain::periods::period_bounds;
use crate::domain::Period;
use crate::error::{ok, AppError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::{CommissionKind, CommissionStatus};
use crate::services::{businesses::require_business, commissions};
use crate::AppState;

#[derive(Deserialize)]
pub struct ConfigRequest {
    specialist_id: Option<i64>,
    kind: CommissionKind,
    value: i64,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    from: Option<String>,
    to: Option<String>,
    specialist_id: Option<i64>,
    status: Option<CommissionStatus>,
}

#[derive(Deserialize)]
pub struct MarkPaidRequest {
    ids: Vec<i64>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/businesses/{business_id}/commission-configs")
            .route(web::get().to(list_configs))
            .route(web::put().to(set_config)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/commission-configs/{config_id}")
            .route(web::delete().to(delete_config)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/commissions")
            .route(web::get().to(list_commissions)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/commissions/summary")
            .route(web::get().to(summary)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/commissions/mark-paid")
            .route(web::post().to(mark_paid)),
    );
}

/// `[from, to]` as days; the current month when omitted
fn resolve_range(query: &RangeQuery) -> Result<(NaiveDateTime, NaiveDateTime), AppError> {
    let from = parse_date_param("from", query.from.as_deref())?;
    let to = parse_date_param("to", query.to.as_deref())?;
    match (from, to) {
        (None, None) => Ok(period_bounds(Period::Monthly, business_now().date())),
        (from, to) => {
            let from = from.or(to).ok_or_else(|| AppError::validation("'from' is required"))?;
            let to = to.unwrap_or(from);
            if to < from {
                return Err(AppError::validation("'to' must not be before 'from'"));
            }
            Ok((
                from.and_time(NaiveTime::MIN),
                (to + Duration::days(1)).and_time(NaiveTime::MIN),
            ))
        }
    }
}

async fn list_configs(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_commission_configs(business.id)?))
}

async fn set_config(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<ConfigRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let config = commissions::set_config(&state.db, &business, body.specialist_id, body.kind, body.value)?;
    Ok(ok(config))
}

async fn delete_config(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let (business_id, config_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    if !state.db.delete_commission_config(business.id, config_id)? {
        return Err(AppError::not_found("Commission config"));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::empty()))
}

async fn list_commissions(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let (from, to) = resolve_range(&query)?;
    Ok(ok(state
        .db
        .list_commissions(business.id, from, to, query.specialist_id, query.status)?))
}

async fn summary(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let (from, to) = resolve_range(&query)?;
    Ok(ok(state.db.commission_summary(business.id, from, to)?))
}

async fn mark_paid(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<MarkPaidRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    if body.ids.is_empty() {
        return Err(AppError::validation("At least one commission id is required"));
    }
    let updated = state.db.mark_commissions_paid(business.id, &body.ids)?;
    log::info!("[COMMISSIONS] Marked {} commission(s) paid for business {}", updated, business.id);
    Ok(ok(serde_json::json!({ "updated": updated })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use crate::services::appointments::{book, change_status, BookingRequest};
    use crate::testing::{bearer, seeded_state};
    use actix_web::{test, App};
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_specialist_config_accrues_and_pays() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let base = format!("/api/businesses/{}", seed.business_id);

        let req = test::TestRequest::put()
            .uri(&format!("{}/commission-configs", base))
            .insert_header(bearer(&token))
            .set_json(json!({"specialist_id": seed.specialist_id, "kind": "percentage", "value": 4000}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["kind"], "percentage");

        let business = state.db.get_business(seed.business_id).unwrap().unwrap();
        let day = NaiveDate::from_ymd_opt(2030, 6, 3).unwrap();
        let appointment = book(
            &state.db,
            &business,
            &BookingRequest {
                client_id: seed.client_id,
                specialist_id: seed.specialist_id,
                service_id: seed.service_id,
                starts_at: day.and_hms_opt(15, 0, 0).unwrap(),
                notes: None,
            },
            day.and_hms_opt(8, 0, 0).unwrap(),
        )
        .unwrap();
        change_status(&state.db, &business, appointment.id, AppointmentStatus::Confirmed).unwrap();
        change_status(&state.db, &business, appointment.id, AppointmentStatus::Completed).unwrap();

        let req = test::TestRequest::get()
            .uri(&format!("{}/commissions?from=2030-06-01&to=2030-06-30", base))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let commission = &body["data"][0];
        assert_eq!(commission["amount"], 2_000_000);
        assert_eq!(commission["status"], "pending");

        let req = test::TestRequest::post()
            .uri(&format!("{}/commissions/mark-paid", base))
            .insert_header(bearer(&token))
            .set_json(json!({"ids": [commission["id"]]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["updated"], 1);

        let req = test::TestRequest::get()
            .uri(&format!("{}/commissions/summary?from=2030-06-01&to=2030-06-30", base))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["paid_amount"], 2_000_000);
        assert_eq!(body["data"][0]["pending_amount"], 0);
    }

    #[actix_web::test]
    async fn test_percentage_over_100_is_rejected() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let req = test::TestRequest::put()
            .uri(&format!("/api/businesses/{}/commission-configs", seed.business_id))
            .insert_header(bearer(&token))
            .set_json(json!({"kind": "percentage", "value": 12000}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
