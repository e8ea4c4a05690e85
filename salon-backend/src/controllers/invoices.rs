use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{created, ok, AppError};
use crate::middleware::AuthContext;
use crate::services::{businesses::require_business, invoices};
use crate::AppState;

const LIST_LIMIT: i64 = 200;

#[derive(Deserialize)]
pub struct SettingsRequest {
    prefix: String,
    #[serde(default)]
    tax_rate_bps: i64,
    next_number: Option<i64>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/businesses/{business_id}/invoice-settings")
            .route(web::get().to(get_settings))
            .route(web::put().to(update_settings)),
    );
    cfg.service(web::resource("/api/businesses/{business_id}/invoices").route(web::get().to(list_invoices)));
    cfg.service(
        web::resource("/api/businesses/{business_id}/invoices/{invoice_id}")
            .route(web::get().to(get_invoice)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/appointments/{appointment_id}/invoice")
            .route(web::post().to(issue_invoice)),
    );
}

async fn get_settings(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let settings = state
        .db
        .get_invoice_settings(business.id)?
        .ok_or_else(|| AppError::not_found("Invoice settings"))?;
    Ok(ok(settings))
}

async fn update_settings(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<SettingsRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let settings = invoices::update_settings(&state.db, &business, &body.prefix, body.tax_rate_bps, body.next_number)?;
    Ok(ok(settings))
}

async fn list_invoices(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_invoices(business.id, LIST_LIMIT)?))
}

async fn get_invoice(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (business_id, invoice_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let invoice = state
        .db
        .get_invoice(business.id, invoice_id)?
        .ok_or_else(|| AppError::not_found("Invoice"))?;
    Ok(ok(invoice))
}

async fn issue_invoice(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (business_id, appointment_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    Ok(created(invoices::issue_for_appointment(&state.db, &business, appointment_id)?))
}
