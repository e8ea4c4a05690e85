use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{created, ok, AppError};
use crate::middleware::AuthContext;
use crate::models::{ClientInput, MedicalRecordInput};
use crate::services::{businesses::require_business, clients};
use crate::AppState;

#[derive(Deserialize)]
pub struct ClientQuery {
    search: Option<String>,
    phone: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/businesses/{business_id}/clients")
            .route("", web::get().to(list_clients))
            .route("", web::post().to(create_client))
            .route("/{client_id}", web::get().to(get_client))
            .route("/{client_id}", web::put().to(update_client))
            .route("/{client_id}/medical-records", web::get().to(list_medical_records))
            .route("/{client_id}/medical-records", web::post().to(create_medical_record))
            .route(
                "/{client_id}/medical-records/{record_id}",
                web::put().to(update_medical_record),
            ),
    );
}

async fn list_clients(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<ClientQuery>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    if let Some(phone) = query.phone.as_deref() {
        let found = state
            .db
            .find_client_by_phone(business.id, &clients::normalize_phone(phone))?;
        return Ok(ok(found.into_iter().collect::<Vec<_>>()));
    }
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(ok(state.db.list_clients(business.id, search)?))
}

async fn create_client(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<ClientInput>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(created(clients::create_client(&state.db, &business, &body)?))
}

async fn get_client(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (business_id, client_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let client = state
        .db
        .get_client(business.id, client_id)?
        .ok_or_else(|| AppError::not_found("Client"))?;
    Ok(ok(client))
}

async fn update_client(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<ClientInput>,
) -> Result<HttpResponse, AppError> {
    let (business_id, client_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    Ok(ok(clients::update_client(&state.db, &business, client_id, &body)?))
}

async fn list_medical_records(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (business_id, client_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    state
        .db
        .get_client(business.id, client_id)?
        .ok_or_else(|| AppError::not_found("Client"))?;
    Ok(ok(state.db.list_medical_records(business.id, client_id)?))
}

async fn create_medical_record(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<MedicalRecordInput>,
) -> Result<HttpResponse, AppError> {
    let (business_id, client_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let record = clients::add_medical_record(&state.db, &business, client_id, &body, auth.user_id)?;
    Ok(created(record))
}

async fn update_medical_record(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64, i64)>,
    body: web::Json<MedicalRecordInput>,
) -> Result<HttpResponse, AppError> {
    let (business_id, client_id, record_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let owned = state
        .db
        .list_medical_records(business.id, client_id)?
        .iter()
        .any(|r| r.id == record_id);
    if !owned {
        return Err(AppError::not_found("Medical record"));
    }
    let record = state
        .db
        .update_medical_record(business.id, record_id, &body)?
        .ok_or_else(|| AppError::not_found("Medical record"))?;
    Ok(ok(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, seeded_state};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_lookup_by_phone_normalizes_digits() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/businesses/{}/clients?phone=%2B57%20300%20111%202233", seed.business_id))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["full_name"], "Sofia Gomez");
    }

    #[actix_web::test]
    async fn test_medical_record_flow() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let base = format!("/api/businesses/{}/clients/{}/medical-records", seed.business_id, seed.client_id);

        let req = test::TestRequest::post()
            .uri(&base)
            .insert_header(bearer(&token))
            .set_json(json!({"allergies": "Latex"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let record_id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["created_by"], seed.user_id);

        let req = test::TestRequest::put()
            .uri(&format!("{}/{}", base, record_id))
            .insert_header(bearer(&token))
            .set_json(json!({"allergies": "Latex", "notes": "Sensitive skin"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["notes"], "Sensitive skin");

        let req = test::TestRequest::get().uri(&base).insert_header(bearer(&token)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_empty_medical_record_is_rejected() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let req = test::TestRequest::post()
            .uri(&format!(
                "/api/businesses/{}/clients/{}/medical-records",
                seed.business_id, seed.client_id
            ))
            .insert_header(bearer(&token))
            .set_json(json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
