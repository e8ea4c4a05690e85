use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::error::{created, ok, AppError, ApiResponse};
use crate::middleware::session_auth::extract_token;
use crate::middleware::AuthContext;
use crate::services::auth;
use crate::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    account_name: String,
    full_name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}

/// Password hashing runs on the blocking pool
async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> Result<HttpResponse, AppError> {
    let db = state.db.clone();
    let ttl_hours = state.config.session_ttl_hours;
    let body = body.into_inner();
    let grant = web::block(move || {
        auth::register(
            &db,
            &body.account_name,
            &body.full_name,
            &body.email,
            &body.password,
            ttl_hours,
        )
    })
    .await??;
    Ok(created(grant))
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse, AppError> {
    let db = state.db.clone();
    let ttl_hours = state.config.session_ttl_hours;
    let body = body.into_inner();
    let grant = web::block(move || auth::login(&db, &body.email, &body.password, ttl_hours)).await??;
    Ok(ok(grant))
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let token = extract_token(&req).ok_or_else(|| AppError::Unauthorized("No authorization token provided".to_string()))?;
    auth::logout(&state.db, &token)?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::empty()))
}

async fn me(state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, AppError> {
    let user = state
        .db
        .get_user(auth.user_id)?
        .ok_or_else(|| AppError::not_found("User"))?;
    let account = state
        .db
        .get_account(auth.account_id)?
        .ok_or_else(|| AppError::not_found("Account"))?;
    Ok(ok(serde_json::json!({ "user": user, "account": account })))
}
