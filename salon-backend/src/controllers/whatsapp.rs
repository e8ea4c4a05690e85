use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{created, ok, AppError};
use crate::middleware::AuthContext;
use crate::services::businesses::require_business;
use crate::services::whatsapp as whatsapp_service;
use crate::AppState;

const DEFAULT_MESSAGE_LIMIT: i64 = 50;
const MAX_MESSAGE_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct MessagesQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SendRequest {
    text: String,
}

#[derive(Deserialize)]
pub struct AgentToggleRequest {
    enabled: bool,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/businesses/{business_id}/whatsapp/conversations")
            .route("", web::get().to(list_conversations))
            .route("/{conversation_id}/messages", web::get().to(list_messages))
            .route("/{conversation_id}/messages", web::post().to(send_message))
            .route("/{conversation_id}/agent", web::put().to(toggle_agent)),
    );
}

async fn list_conversations(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_conversations(business.id)?))
}

async fn list_messages(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    query: web::Query<MessagesQuery>,
) -> Result<HttpResponse, AppError> {
    let (business_id, conversation_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let conversation = whatsapp_service::require_conversation(&state.db, &business, conversation_id)?;
    let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).clamp(1, MAX_MESSAGE_LIMIT);
    Ok(ok(state.db.list_whatsapp_messages(conversation.id, limit)?))
}

async fn send_message(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<SendRequest>,
) -> Result<HttpResponse, AppError> {
    let (business_id, conversation_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let conversation = whatsapp_service::require_conversation(&state.db, &business, conversation_id)?;
    let messenger = state.messenger()?;
    let message = whatsapp_service::send_text(&state.db, messenger, &business, &conversation, &body.text).await?;
    Ok(created(message))
}

async fn toggle_agent(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<AgentToggleRequest>,
) -> Result<HttpResponse, AppError> {
    let (business_id, conversation_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    if !state.db.set_conversation_agent(business.id, conversation_id, body.enabled)? {
        return Err(AppError::not_found("Conversation"));
    }
    Ok(ok(whatsapp_service::require_conversation(&state.db, &business, conversation_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;
    use crate::testing::{bearer, owner_token, RecordingMessenger, StateBuilder};
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_operator_send_and_toggle() {
        let (db, seed) = seeded_db();
        let token = owner_token(&db, &seed);
        let conversation = db.upsert_conversation(seed.business_id, "573001112233", Some("Sofia")).unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let state = StateBuilder::new(db).messenger(messenger.clone()).build();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let base = format!(
            "/api/businesses/{}/whatsapp/conversations/{}",
            seed.business_id, conversation.id
        );

        let req = test::TestRequest::post()
            .uri(&format!("{}/messages", base))
            .insert_header(bearer(&token))
            .set_json(json!({"text": "Hola Sofia, tu cita está confirmada"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["direction"], "outbound");
        assert_eq!(messenger.sent.lock()[0].1, "573001112233");

        let req = test::TestRequest::put()
            .uri(&format!("{}/agent", base))
            .insert_header(bearer(&token))
            .set_json(json!({"enabled": false}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["agent_enabled"], false);

        let req = test::TestRequest::get()
            .uri(&format!("{}/messages", base))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }
}
