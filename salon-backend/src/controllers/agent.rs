use actix_web::{web, HttpResponse};
use chrono::Utc;
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::business_now;
use crate::agent::runtime::IDLE_FALLBACK_MESSAGE;
use crate::agent::tts::MAX_CHUNK_CHARS;
use crate::agent::{chunk_text, AgentEvent};
use crate::error::{created, ok, AppError, ApiResponse};
use crate::middleware::AuthContext;
use crate::services::agent_links::{self, NewAgentLink};
use crate::services::businesses::require_business;
use crate::AppState;

const MAX_CHAT_MESSAGE_CHARS: usize = 2000;
const MAX_SPEECH_CHARS: usize = 4000;

#[derive(Deserialize)]
pub struct ChatRequest {
    token: String,
    session_id: Option<String>,
    message: String,
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    token: String,
    session_id: String,
    message_id: i64,
    rating: i64,
    comment: Option<String>,
}

#[derive(Deserialize)]
pub struct SpeechRequest {
    token: String,
    text: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/businesses/{business_id}/agent-links")
            .route(web::get().to(list_links))
            .route(web::post().to(create_link)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}/agent-links/{link_id}").route(web::delete().to(revoke_link)),
    );
    cfg.service(
        web::scope("/api/agent")
            .route("/chat", web::post().to(chat))
            .route("/feedback", web::post().to(feedback))
            .route("/speech", web::post().to(speech)),
    );
}

async fn list_links(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_agent_links(business.id)?))
}

async fn create_link(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<NewAgentLink>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let link = agent_links::create_link(&state.db, &business, &body, Utc::now())?;
    Ok(created(link))
}

async fn revoke_link(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let (business_id, link_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    agent_links::revoke_link(&state.db, &business, link_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::empty()))
}

/// Cancels the turn when the response stream goes away
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// SSE frames for one turn. Ends after a terminal event, or with the
/// fallback message when nothing arrives within `idle`.
fn event_stream(
    rx: mpsc::Receiver<AgentEvent>,
    cancel: CancellationToken,
    idle: Duration,
) -> impl Stream<Item = Result<web::Bytes, actix_web::Error>> {
    stream::unfold(Some((rx, CancelOnDrop(cancel))), move |state| async move {
        let (mut rx, guard) = state?;
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) => {
                let frame = web::Bytes::from(event.to_sse_frame());
                let next = if event.is_terminal() { None } else { Some((rx, guard)) };
                Some((Ok::<_, actix_web::Error>(frame), next))
            }
            Ok(None) => None,
            Err(_) => {
                log::warn!("[AGENT] No event within {:?}, sending fallback", idle);
                guard.0.cancel();
                let fallback = AgentEvent::Message(IDLE_FALLBACK_MESSAGE.to_string());
                Some((Ok::<_, actix_web::Error>(web::Bytes::from(fallback.to_sse_frame())), None))
            }
        }
    })
}

async fn chat(state: web::Data<AppState>, body: web::Json<ChatRequest>) -> Result<HttpResponse, AppError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::validation("Message is required"));
    }
    if message.chars().count() > MAX_CHAT_MESSAGE_CHARS {
        return Err(AppError::validation(format!(
            "Message must be at most {} characters",
            MAX_CHAT_MESSAGE_CHARS
        )));
    }

    let link = agent_links::resolve_link(&state.db, &body.token, Utc::now())?;
    let session = agent_links::open_or_resume_session(&state.db, &link, body.session_id.as_deref())?;
    let business = state
        .db
        .get_business(link.business_id)?
        .ok_or_else(|| AppError::not_found("Business"))?;

    let session_id = session.id.clone();
    let (rx, cancel) = state
        .agent
        .spawn_chat_turn(session, business, message.to_string(), business_now());
    let idle = Duration::from_secs(state.config.agent_idle_timeout_secs.max(1));

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Session-Id", session_id))
        .streaming(event_stream(rx, cancel, idle)))
}

async fn feedback(state: web::Data<AppState>, body: web::Json<FeedbackRequest>) -> Result<HttpResponse, AppError> {
    let link = agent_links::resolve_link(&state.db, &body.token, Utc::now())?;
    let feedback = agent_links::submit_feedback(
        &state.db,
        &link,
        &body.session_id,
        body.message_id,
        body.rating,
        body.comment.as_deref(),
    )?;
    Ok(created(feedback))
}

async fn speech(state: web::Data<AppState>, body: web::Json<SpeechRequest>) -> Result<HttpResponse, AppError> {
    agent_links::resolve_link(&state.db, &body.token, Utc::now())?;
    if body.text.chars().count() > MAX_SPEECH_CHARS {
        return Err(AppError::validation(format!(
            "Text must be at most {} characters",
            MAX_SPEECH_CHARS
        )));
    }
    let chunks = chunk_text(&body.text, MAX_CHUNK_CHARS);
    if chunks.is_empty() {
        return Err(AppError::validation("Text is required"));
    }

    let mut audio = Vec::new();
    for chunk in &chunks {
        let bytes = state.speech.synthesize(chunk).await.map_err(|e| {
            log::error!("[AGENT] Speech synthesis failed: {}", e);
            AppError::External("Speech synthesis failed".to_string())
        })?;
        audio.extend_from_slice(&bytes);
    }
    log::debug!("[AGENT] Synthesized {} chunk(s), {} bytes", chunks.len(), audio.len());
    Ok(HttpResponse::Ok().content_type("audio/mpeg").body(audio))
}
