use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{created, ok, AppError};
use crate::middleware::AuthContext;
use crate::models::{ServiceInput, SpecialistInput};
use crate::services::{businesses::require_business, catalog};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    active: bool,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/businesses/{business_id}/specialists")
            .route(web::get().to(list_specialists))
            .route(web::post().to(create_specialist)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/specialists/{specialist_id}")
            .route(web::put().to(update_specialist)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/services")
            .route(web::get().to(list_services))
            .route(web::post().to(create_service)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/services/{service_id}")
            .route(web::put().to(update_service)),
    );
}

async fn list_specialists(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_specialists(business.id, query.active)?))
}

async fn create_specialist(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<SpecialistInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(created(catalog::create_specialist(&state.db, &business, &body)?))
}

async fn update_specialist(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<SpecialistInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let (business_id, specialist_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    Ok(ok(catalog::update_specialist(&state.db, &business, specialist_id, &body)?))
}

async fn list_services(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_services(business.id, query.active)?))
}

async fn create_service(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<ServiceInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(created(catalog::create_service(&state.db, &business, &body)?))
}

async fn update_service(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<ServiceInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let (business_id, service_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    Ok(ok(catalog::update_service(&state.db, &business, service_id, &body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, seeded_state};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_create_and_list_services() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/businesses/{}/services", seed.business_id))
            .insert_header(bearer(&token))
            .set_json(json!({"name": "Pedicure", "duration_minutes": 45, "price": 4_000_000}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);

        let req = test::TestRequest::get()
            .uri(&format!("/api/businesses/{}/services?active=true", seed.business_id))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_zero_duration_is_rejected() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let req = test::TestRequest::post()
            .uri(&format!("/api/businesses/{}/services", seed.business_id))
            .insert_header(bearer(&token))
            .set_json(json!({"name": "Nada", "duration_minutes": 0, "price": 0}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
