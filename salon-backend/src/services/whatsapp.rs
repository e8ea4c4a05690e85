//! Inbound webhook processing and operator messaging

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Business, Conversation, MessageDirection, WhatsAppMessage};
use crate::services::clients::normalize_phone;
use crate::whatsapp::payload::{ChangeValue, InboundMessage};
use crate::whatsapp::{extract_message_content, WebhookPayload, WhatsAppMessenger};

pub const MAX_MESSAGE_LEN: usize = 4096;

/// An inbound message the booking assistant should answer
#[derive(Debug, Clone)]
pub struct PendingReply {
    pub business: Business,
    pub conversation: Conversation,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct WebhookSummary {
    pub stored: usize,
    pub duplicates: usize,
    pub skipped: usize,
    /// Messages that could not be stored; the sender's retry picks them up
    pub failed: usize,
    pub statuses: usize,
    pub replies: Vec<PendingReply>,
}

/// Store every message and status in a webhook delivery. Messages for unknown
/// phone numbers are skipped. A failure only loses the message it happened on;
/// replies for everything stored in the delivery are always returned.
pub fn process_webhook(db: &Database, payload: &WebhookPayload) -> WebhookSummary {
    let mut summary = WebhookSummary::default();

    for entry in &payload.entry {
        for change in &entry.changes {
            if !change.field.is_empty() && change.field != "messages" {
                log::debug!("[WHATSAPP] Ignoring change field '{}'", change.field);
                continue;
            }
            process_change(db, &change.value, &mut summary);
        }
    }

    log::info!(
        "[WHATSAPP] Webhook processed: {} stored, {} duplicate, {} skipped, {} failed, {} statuses",
        summary.stored,
        summary.duplicates,
        summary.skipped,
        summary.failed,
        summary.statuses
    );
    summary
}

fn process_change(db: &Database, value: &ChangeValue, summary: &mut WebhookSummary) {
    for status in &value.statuses {
        match db.update_message_status(&status.id, &status.status) {
            Ok(true) => summary.statuses += 1,
            Ok(false) => {}
            Err(e) => log::error!("[WHATSAPP] Failed to update status of {}: {}", status.id, e),
        }
    }

    if value.messages.is_empty() {
        return;
    }

    let business = match value.metadata.phone_number_id.as_deref() {
        Some(id) => match db.get_business_by_whatsapp_number(id) {
            Ok(business) => business,
            Err(e) => {
                log::error!("[WHATSAPP] Business lookup for {} failed: {}", id, e);
                summary.failed += value.messages.len();
                return;
            }
        },
        None => None,
    };
    let Some(business) = business else {
        log::warn!(
            "[WHATSAPP] No business for phone number id {:?}, skipping {} message(s)",
            value.metadata.phone_number_id,
            value.messages.len()
        );
        summary.skipped += value.messages.len();
        return;
    };

    for message in &value.messages {
        if let Err(e) = handle_message(db, &business, value, message, summary) {
            log::error!("[WHATSAPP] Failed to store message {}: {}", message.id, e);
            summary.failed += 1;
        }
    }
}

fn handle_message(
    db: &Database,
    business: &Business,
    value: &ChangeValue,
    message: &InboundMessage,
    summary: &mut WebhookSummary,
) -> AppResult<()> {
    let content = extract_message_content(message);
    if content.trim().is_empty() {
        log::debug!("[WHATSAPP] Empty {} message {}, skipping", message.message_type, message.id);
        summary.skipped += 1;
        return Ok(());
    }

    let phone = normalize_phone(&message.from);
    if phone.is_empty() {
        log::warn!("[WHATSAPP] Message {} has no sender number, skipping", message.id);
        summary.skipped += 1;
        return Ok(());
    }
    let contact_name = value
        .contacts
        .iter()
        .find(|c| normalize_phone(&c.wa_id) == phone)
        .and_then(|c| c.profile.as_ref())
        .map(|p| p.name.as_str());

    let conversation = db.upsert_conversation(business.id, &phone, contact_name)?;
    let stored = db.insert_whatsapp_message(
        conversation.id,
        MessageDirection::Inbound,
        &message.message_type,
        &content,
        Some(&message.id),
    )?;
    if stored.is_none() {
        log::debug!("[WHATSAPP] Duplicate delivery of {}", message.id);
        summary.duplicates += 1;
        return Ok(());
    }
    summary.stored += 1;

    if conversation.agent_enabled && message.is_textual() {
        summary.replies.push(PendingReply {
            business: business.clone(),
            conversation,
            text: content,
        });
    }
    Ok(())
}

pub fn require_conversation(db: &Database, business: &Business, conversation_id: i64) -> AppResult<Conversation> {
    db.get_conversation(business.id, conversation_id)?
        .ok_or_else(|| AppError::not_found("Conversation"))
}

/// Send a text through the business number and store it as outbound
pub async fn send_text(
    db: &Database,
    messenger: &dyn WhatsAppMessenger,
    business: &Business,
    conversation: &Conversation,
    body: &str,
) -> AppResult<WhatsAppMessage> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::validation("Message text is required"));
    }
    if body.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::validation(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    let phone_number_id = business
        .whatsapp_phone_number_id
        .as_deref()
        .ok_or_else(|| AppError::validation("This business has no WhatsApp number configured"))?;

    let wa_id = messenger
        .send_text(phone_number_id, &conversation.phone, body)
        .await
        .map_err(AppError::External)?;

    db.insert_whatsapp_message(conversation.id, MessageDirection::Outbound, "text", body, Some(&wa_id))?
        .ok_or_else(|| AppError::conflict("Message was already stored"))
}
