use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::{business_now, parse_date_param};
use crate::domain::Period;
use crate::error::{created, ok, AppError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::GoalMetric;
use crate::services::{businesses::require_business, dashboard};
use crate::AppState;

#[derive(Deserialize)]
pub struct DateQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
pub struct NewGoalRequest {
    specialist_id: Option<i64>,
    metric: GoalMetric,
    period: Period,
    target: i64,
}

#[derive(Deserialize)]
pub struct TargetRequest {
    target: i64,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/businesses/{business_id}/dashboard")
            .route(web::get().to(get_dashboard)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/goals")
            .route(web::get().to(list_goals))
            .route(web::post().to(create_goal)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/goals/{goal_id}")
            .route(web::put().to(update_goal))
            .route(web::delete().to(delete_goal)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/goals/{goal_id}/progress")
            .route(web::get().to(goal_progress)),
    );
}

async fn get_dashboard(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let now = business_now();
    let date = parse_date_param("date", query.date.as_deref())?.unwrap_or(now.date());
    Ok(ok(dashboard::dashboard(&state.db, &business, date, now)?))
}

async fn list_goals(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_goals(business.id)?))
}

async fn create_goal(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<NewGoalRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let goal = dashboard::create_goal(
        &state.db,
        &business,
        body.specialist_id,
        body.metric,
        body.period,
        body.target,
    )?;
    Ok(created(goal))
}

async fn update_goal(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<TargetRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let (business_id, goal_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    if body.target < 0 {
        return Err(AppError::validation("Goal target cannot be negative"));
    }
    if !state.db.update_goal_target(business.id, goal_id, body.target)? {
        return Err(AppError::not_found("Goal"));
    }
    let goal = state
        .db
        .get_goal(business.id, goal_id)?
        .ok_or_else(|| AppError::not_found("Goal"))?;
    Ok(ok(goal))
}

async fn delete_goal(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let (business_id, goal_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    if !state.db.delete_goal(business.id, goal_id)? {
        return Err(AppError::not_found("Goal"));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::empty()))
}

async fn goal_progress(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    let (business_id, goal_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let goal = state
        .db
        .get_goal(business.id, goal_id)?
        .ok_or_else(|| AppError::not_found("Goal"))?;
    let date = parse_date_param("date", query.date.as_deref())?.unwrap_or(business_now().date());
    Ok(ok(dashboard::goal_progress(&state.db, &goal, date)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, PaymentMethod};
    use crate::services::appointments::{book, change_status, record_payment, BookingRequest};
    use crate::testing::{bearer, seeded_state};
    use actix_web::{test, App};
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_goal_progress_and_dashboard() {
        let (state, seed, token) = seeded_state();
        let business = state.db.get_business(seed.business_id).unwrap().unwrap();
        let day = NaiveDate::from_ymd_opt(2030, 6, 3).unwrap();
        let appointment = book(
            &state.db,
            &business,
            &BookingRequest {
                client_id: seed.client_id,
                specialist_id: seed.specialist_id,
                service_id: seed.service_id,
                starts_at: day.and_hms_opt(11, 0, 0).unwrap(),
                notes: None,
            },
            day.and_hms_opt(8, 0, 0).unwrap(),
        )
        .unwrap();
        change_status(&state.db, &business, appointment.id, AppointmentStatus::Confirmed).unwrap();
        record_payment(
            &state.db,
            &business,
            appointment.id,
            5_000_000,
            PaymentMethod::Card,
            day.and_hms_opt(12, 0, 0).unwrap(),
        )
        .unwrap();

        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let base = format!("/api/businesses/{}", seed.business_id);

        let req = test::TestRequest::post()
            .uri(&format!("{}/goals", base))
            .insert_header(bearer(&token))
            .set_json(json!({"metric": "revenue", "period": "monthly", "target": 20_000_000}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let goal_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::get()
            .uri(&format!("{}/goals/{}/progress?date=2030-06-15", base, goal_id))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["current"], 5_000_000);
        assert_eq!(body["data"]["progress"], 25);

        let req = test::TestRequest::get()
            .uri(&format!("{}/dashboard?date=2030-06-03", base))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["appointments_today"], 1);
        assert_eq!(body["data"]["revenue_today"]["formatted"], "$ 50.000");
    }

    #[actix_web::test]
    async fn test_bad_date_is_rejected() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let req = test::TestRequest::get()
            .uri(&format!("/api/businesses/{}/dashboard?date=03-06-2030", seed.business_id))
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
