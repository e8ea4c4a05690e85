use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{created, ok, AppError};
use crate::middleware::AuthContext;
use crate::models::UserRole;
use crate::services::auth;
use crate::AppState;

#[derive(Deserialize)]
pub struct RenameRequest {
    name: String,
}

#[derive(Deserialize)]
pub struct NewMemberRequest {
    full_name: String,
    email: String,
    password: String,
    #[serde(default = "default_member_role")]
    role: UserRole,
}

fn default_member_role() -> UserRole {
    UserRole::Staff
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/account")
            .route("", web::get().to(get_account))
            .route("", web::put().to(rename_account))
            .route("/members", web::get().to(list_members))
            .route("/members", web::post().to(add_member)),
    );
}

async fn get_account(state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, AppError> {
    let account = state
        .db
        .get_account(auth.account_id)?
        .ok_or_else(|| AppError::not_found("Account"))?;
    let subscription = state.db.get_subscription(auth.account_id)?;
    let businesses = state.db.count_businesses(auth.account_id)?;
    Ok(ok(serde_json::json!({
        "account": account,
        "subscription": subscription,
        "businesses": businesses,
    })))
}

async fn rename_account(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<RenameRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_owner()?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Account name is required"));
    }
    state.db.rename_account(auth.account_id, name)?;
    let account = state
        .db
        .get_account(auth.account_id)?
        .ok_or_else(|| AppError::not_found("Account"))?;
    Ok(ok(account))
}

async fn list_members(state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, AppError> {
    Ok(ok(state.db.list_users(auth.account_id)?))
}

async fn add_member(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<NewMemberRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_owner()?;
    let db = state.db.clone();
    let account_id = auth.account_id;
    let body = body.into_inner();
    let user = web::block(move || {
        auth::add_member(
            &db,
            account_id,
            &body.full_name,
            &body.email,
            &body.password,
            body.role,
        )
    })
    .await??;
    log::info!("[AUTH] Added {} member {} to account {}", user.role, user.id, auth.account_id);
    Ok(created(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, seeded_state};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_owner_adds_staff_member() {
        let (state, _seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/account/members")
            .insert_header(bearer(&token))
            .set_json(json!({"full_name": "Laura P", "email": "laura@glow.co", "password": "password9"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["role"], "staff");
        assert!(body["data"].get("password_hash").is_none());

        let req = test::TestRequest::get()
            .uri("/api/account/members")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_requires_session() {
        let (state, _seed, _token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let req = test::TestRequest::get().uri("/api/account").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }
}
