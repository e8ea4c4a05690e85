use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::business_now;
use crate::error::{ok, AppError, ApiResponse};
use crate::payments::verify_signature;
use crate::services::{subscriptions, whatsapp as whatsapp_service};
use crate::whatsapp::payload::VerifyQuery;
use crate::whatsapp::{verify_hub_signature, WebhookPayload};
use crate::AppState;

#[derive(Deserialize)]
pub struct PaymentQuery {
    #[serde(rename = "data.id")]
    data_id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    topic: Option<String>,
    id: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/webhooks")
            .route("/payments", web::post().to(payment_webhook))
            .route("/whatsapp", web::get().to(whatsapp_verify))
            .route("/whatsapp", web::post().to(whatsapp_webhook)),
    );
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn json_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn payment_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<PaymentQuery>,
    body: web::Bytes,
) -> HttpResponse {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let data_id = query
        .data_id
        .clone()
        .or_else(|| json_string(&payload["data"]["id"]))
        .or_else(|| query.id.clone());
    let kind = json_string(&payload["type"])
        .or_else(|| query.kind.clone())
        .or_else(|| json_string(&payload["topic"]))
        .or_else(|| query.topic.clone())
        .unwrap_or_default();

    if let Err(e) = verify_signature(
        state.config.payment_webhook_secret.as_deref(),
        header(&req, "x-signature"),
        header(&req, "x-request-id"),
        data_id.as_deref(),
    ) {
        log::warn!("[PAYMENTS] Rejected webhook ({}): {}", kind, e);
        return HttpResponse::Unauthorized().json(ApiResponse::<()>::failure(e.to_string()));
    }

    let Some(data_id) = data_id else {
        log::warn!("[PAYMENTS] Signed webhook without data id, ignoring");
        return HttpResponse::Ok().json(ApiResponse::<()>::empty());
    };
    let Some(gateway) = state.gateway.as_deref() else {
        log::error!("[PAYMENTS] Webhook received but the payment gateway is not configured");
        return HttpResponse::Ok().json(ApiResponse::<()>::empty());
    };

    match subscriptions::handle_notification(&state.db, gateway, &kind, &data_id, Utc::now()).await {
        Ok(outcome) => log::info!("[PAYMENTS] Notification {} {}: {:?}", kind, data_id, outcome),
        Err(e) => log::error!("[PAYMENTS] Failed to process notification {} {}: {}", kind, data_id, e),
    }
    HttpResponse::Ok().json(ApiResponse::<()>::empty())
}

async fn whatsapp_verify(state: web::Data<AppState>, query: web::Query<VerifyQuery>) -> HttpResponse {
    let expected = state.config.whatsapp_verify_token.as_deref();
    let subscribed = query.mode.as_deref() == Some("subscribe");
    let token_matches = expected.is_some() && query.verify_token.as_deref() == expected;

    match (subscribed && token_matches, query.challenge.as_deref()) {
        (true, Some(challenge)) => {
            log::info!("[WHATSAPP] Webhook verified");
            HttpResponse::Ok().content_type("text/plain").body(challenge.to_string())
        }
        _ => {
            log::warn!("[WHATSAPP] Webhook verification failed");
            HttpResponse::Forbidden().json(ApiResponse::<()>::failure("Verification failed"))
        }
    }
}

async fn whatsapp_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    if let Some(secret) = state.config.whatsapp_app_secret.as_deref() {
        if let Err(e) = verify_hub_signature(secret, header(&req, "x-hub-signature-256"), &body) {
            log::warn!("[WHATSAPP] Rejected webhook: {}", e);
            return Err(AppError::Unauthorized(e.to_string()));
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::validation(format!("Invalid webhook payload: {}", e)))?;
    let summary = whatsapp_service::process_webhook(&state.db, &payload);

    if !summary.replies.is_empty() {
        match state.messenger.clone() {
            Some(messenger) => {
                for reply in summary.replies.iter().cloned() {
                    let agent = state.agent.clone();
                    let messenger = messenger.clone();
                    tokio::spawn(async move {
                        if let Err(e) = agent.answer_whatsapp(messenger.as_ref(), &reply, business_now()).await {
                            log::error!(
                                "[WHATSAPP] Auto-reply for conversation {} failed: {}",
                                reply.conversation.id,
                                e
                            );
                        }
                    });
                }
            }
            None => log::warn!(
                "[WHATSAPP] {} message(s) need a reply but outbound messaging is not configured",
                summary.replies.len()
            ),
        }
    }

    Ok(ok(serde_json::json!({
        "stored": summary.stored,
        "duplicates": summary.duplicates,
        "skipped": summary.skipped,
        "failed": summary.failed,
        "statuses": summary.statuses,
    })))
}
