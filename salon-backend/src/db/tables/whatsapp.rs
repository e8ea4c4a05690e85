//! WhatsApp conversation and message database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::parse_enum;
use crate::db::Database;
use crate::models::{Conversation, MessageDirection, WhatsAppMessage};

const CONVERSATION_COLUMNS: &str = "id, business_id, phone, contact_name, agent_enabled, last_message_at, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, direction, message_type, content, wa_message_id, status, created_at";

impl Database {
    /// Find or create the conversation for (business, phone), refreshing the
    /// contact name when the provider sends one.
    pub fn upsert_conversation(
        &self,
        business_id: i64,
        phone: &str,
        contact_name: Option<&str>,
    ) -> SqliteResult<Conversation> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO whatsapp_conversations (business_id, phone, contact_name, agent_enabled, last_message_at, created_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)
             ON CONFLICT(business_id, phone) DO UPDATE SET
                contact_name = COALESCE(excluded.contact_name, whatsapp_conversations.contact_name),
                last_message_at = excluded.last_message_at",
            rusqlite::params![business_id, phone, contact_name, now],
        )?;
        conn.query_row(
            &format!(
                "SELECT {} FROM whatsapp_conversations WHERE business_id = ?1 AND phone = ?2",
                CONVERSATION_COLUMNS
            ),
            rusqlite::params![business_id, phone],
            Self::row_to_conversation,
        )
    }

    pub fn get_conversation(&self, business_id: i64, id: i64) -> SqliteResult<Option<Conversation>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM whatsapp_conversations WHERE id = ?1 AND business_id = ?2",
                CONVERSATION_COLUMNS
            ),
            [id, business_id],
            Self::row_to_conversation,
        )
        .optional()
    }

    pub fn list_conversations(&self, business_id: i64) -> SqliteResult<Vec<Conversation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM whatsapp_conversations WHERE business_id = ?1 ORDER BY last_message_at DESC",
            CONVERSATION_COLUMNS
        ))?;
        let rows = stmt
            .query_map([business_id], Self::row_to_conversation)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn set_conversation_agent(&self, business_id: i64, id: i64, enabled: bool) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE whatsapp_conversations SET agent_enabled = ?1 WHERE id = ?2 AND business_id = ?3",
            rusqlite::params![enabled, id, business_id],
        )?;
        Ok(rows > 0)
    }

    /// Store a message. Returns `None` when a message with the same provider
    /// id was already stored.
    pub fn insert_whatsapp_message(
        &self,
        conversation_id: i64,
        direction: MessageDirection,
        message_type: &str,
        content: &str,
        wa_message_id: Option<&str>,
    ) -> SqliteResult<Option<WhatsAppMessage>> {
        let conn = self.conn.lock();
        let now = Utc::now();
        let status = match direction {
            MessageDirection::Inbound => None,
            MessageDirection::Outbound => Some("sent"),
        };
        let rows = conn.execute(
            "INSERT OR IGNORE INTO whatsapp_messages
             (conversation_id, direction, message_type, content, wa_message_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                conversation_id,
                direction.as_ref(),
                message_type,
                content,
                wa_message_id,
                status,
                now
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        let id = conn.last_insert_rowid();

        conn.execute(
            "UPDATE whatsapp_conversations SET last_message_at = ?1 WHERE id = ?2",
            rusqlite::params![now, conversation_id],
        )?;

        Ok(Some(WhatsAppMessage {
            id,
            conversation_id,
            direction,
            message_type: message_type.to_string(),
            content: content.to_string(),
            wa_message_id: wa_message_id.map(str::to_string),
            status: status.map(str::to_string),
            created_at: now,
        }))
    }

    /// Apply a delivery status callback to a stored outbound message
    pub fn update_message_status(&self, wa_message_id: &str, status: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE whatsapp_messages SET status = ?1 WHERE wa_message_id = ?2",
            rusqlite::params![status, wa_message_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_whatsapp_messages(&self, conversation_id: i64, limit: i64) -> SqliteResult<Vec<WhatsAppMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM (
                SELECT {} FROM whatsapp_messages WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id",
            MESSAGE_COLUMNS, MESSAGE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([conversation_id, limit], |row: &Row| {
                Ok(WhatsAppMessage {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    direction: parse_enum(2, row.get(2)?)?,
                    message_type: row.get(3)?,
                    content: row.get(4)?,
                    wa_message_id: row.get(5)?,
                    status: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_to_conversation(row: &Row) -> SqliteResult<Conversation> {
        Ok(Conversation {
            id: row.get(0)?,
            business_id: row.get(1)?,
            phone: row.get(2)?,
            contact_name: row.get(3)?,
            agent_enabled: row.get(4)?,
            last_message_at: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}
