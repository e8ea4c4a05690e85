//! Shareable assistant links, chat sessions and feedback

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{AgentFeedback, AgentLink, AgentSession, Business};
use crate::services::auth::generate_token;

pub const MAX_LINK_HOURS: i64 = 24 * 90;

#[derive(Debug, Deserialize)]
pub struct NewAgentLink {
    pub label: Option<String>,
    pub expires_in_hours: Option<i64>,
    pub max_sessions: Option<i64>,
}

pub fn create_link(db: &Database, business: &Business, input: &NewAgentLink, now: DateTime<Utc>) -> AppResult<AgentLink> {
    let expires_at = match input.expires_in_hours {
        Some(hours) if !(1..=MAX_LINK_HOURS).contains(&hours) => {
            return Err(AppError::validation(format!(
                "expires_in_hours must be between 1 and {}",
                MAX_LINK_HOURS
            )));
        }
        Some(hours) => Some(now + Duration::hours(hours)),
        None => None,
    };
    if input.max_sessions.is_some_and(|max| max < 1) {
        return Err(AppError::validation("max_sessions must be at least 1"));
    }
    let label = input.label.as_deref().map(str::trim).filter(|l| !l.is_empty());

    let link = db.create_agent_link(business.id, &generate_token(), label, expires_at, input.max_sessions)?;
    log::info!("[AGENT] Created link {} for business {}", link.id, business.id);
    Ok(link)
}

pub fn revoke_link(db: &Database, business: &Business, link_id: i64) -> AppResult<()> {
    if !db.revoke_agent_link(business.id, link_id)? {
        return Err(AppError::not_found("Agent link"));
    }
    log::info!("[AGENT] Revoked link {} of business {}", link_id, business.id);
    Ok(())
}

/// Resolve a public link token, rejecting revoked or expired links
pub fn resolve_link(db: &Database, token: &str, now: DateTime<Utc>) -> AppResult<AgentLink> {
    let link = db
        .get_agent_link_by_token(token.trim())?
        .ok_or_else(|| AppError::Unauthorized("Invalid assistant link".to_string()))?;
    if let Some(reason) = link.unusable_reason(now) {
        return Err(AppError::forbidden(reason));
    }
    Ok(link)
}

/// Resume a session of this link, or open a new one counted against its limit
pub fn open_or_resume_session(db: &Database, link: &AgentLink, session_id: Option<&str>) -> AppResult<AgentSession> {
    if let Some(id) = session_id.map(str::trim).filter(|id| !id.is_empty()) {
        return match db.get_agent_session(id)? {
            Some(session) if session.link_id == link.id => Ok(session),
            _ => Err(AppError::not_found("Session")),
        };
    }

    if !link.can_open_session() {
        return Err(AppError::forbidden("This link has reached its session limit"));
    }
    let id = uuid::Uuid::new_v4().to_string();
    let session = db
        .open_agent_session(link, &id)?
        .ok_or_else(|| AppError::forbidden("This link has reached its session limit"))?;
    log::info!("[AGENT] Opened session {} on link {}", session.id, link.id);
    Ok(session)
}

pub fn submit_feedback(
    db: &Database,
    link: &AgentLink,
    session_id: &str,
    message_id: i64,
    rating: i64,
    comment: Option<&str>,
) -> AppResult<AgentFeedback> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::validation("Rating must be between 1 and 5"));
    }
    let session = open_or_resume_session(db, link, Some(session_id))?;
    let message = db
        .get_agent_message(&session.id, message_id)?
        .ok_or_else(|| AppError::not_found("Message"))?;
    if message.role != "assistant" {
        return Err(AppError::validation("Only assistant messages can be rated"));
    }
    let comment = comment.map(str::trim).filter(|c| !c.is_empty());
    Ok(db.insert_agent_feedback(&session.id, message.id, rating, comment)?)
}
