//! Booking assistant link, session, transcript and feedback operations

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use crate::db::Database;
use crate::models::{AgentFeedback, AgentLink, AgentMessage, AgentSession};

const LINK_COLUMNS: &str =
    "id, business_id, token, label, expires_at, max_sessions, session_count, is_active, created_at";

impl Database {
    pub fn create_agent_link(
        &self,
        business_id: i64,
        token: &str,
        label: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        max_sessions: Option<i64>,
    ) -> SqliteResult<AgentLink> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO agent_links (business_id, token, label, expires_at, max_sessions, session_count, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 1, ?6)",
            rusqlite::params![business_id, token, label, expires_at, max_sessions, now],
        )?;

        Ok(AgentLink {
            id: conn.last_insert_rowid(),
            business_id,
            token: token.to_string(),
            label: label.map(str::to_string),
            expires_at,
            max_sessions,
            session_count: 0,
            is_active: true,
            created_at: now,
        })
    }

    pub fn get_agent_link_by_token(&self, token: &str) -> SqliteResult<Option<AgentLink>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM agent_links WHERE token = ?1", LINK_COLUMNS),
            [token],
            Self::row_to_agent_link,
        )
        .optional()
    }

    pub fn list_agent_links(&self, business_id: i64) -> SqliteResult<Vec<AgentLink>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agent_links WHERE business_id = ?1 ORDER BY created_at DESC",
            LINK_COLUMNS
        ))?;
        let rows = stmt
            .query_map([business_id], Self::row_to_agent_link)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn revoke_agent_link(&self, business_id: i64, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE agent_links SET is_active = 0 WHERE id = ?1 AND business_id = ?2",
            [id, business_id],
        )?;
        Ok(rows > 0)
    }

    /// Count a new session against the link and create it.
    ///
    /// Returns `None` when the link is inactive, expired or out of sessions.
    pub fn open_agent_session(&self, link: &AgentLink, session_id: &str) -> SqliteResult<Option<AgentSession>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let claimed = tx.execute(
            "UPDATE agent_links SET session_count = session_count + 1
             WHERE id = ?1 AND is_active = 1
               AND (expires_at IS NULL OR expires_at > ?2)
               AND (max_sessions IS NULL OR session_count < max_sessions)",
            rusqlite::params![link.id, now],
        )?;
        if claimed == 0 {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO agent_sessions (id, link_id, business_id, created_at, last_activity_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![session_id, link.id, link.business_id, now],
        )?;
        tx.commit()?;

        Ok(Some(AgentSession {
            id: session_id.to_string(),
            link_id: link.id,
            business_id: link.business_id,
            created_at: now,
            last_activity_at: now,
        }))
    }

    pub fn get_agent_session(&self, id: &str) -> SqliteResult<Option<AgentSession>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, link_id, business_id, created_at, last_activity_at FROM agent_sessions WHERE id = ?1",
            [id],
            |row| {
                Ok(AgentSession {
                    id: row.get(0)?,
                    link_id: row.get(1)?,
                    business_id: row.get(2)?,
                    created_at: row.get(3)?,
                    last_activity_at: row.get(4)?,
                })
            },
        )
        .optional()
    }

    pub fn insert_agent_message(&self, session_id: &str, role: &str, content: &str) -> SqliteResult<AgentMessage> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO agent_messages (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![session_id, role, content, now],
        )?;
        let id = conn.last_insert_rowid();
        conn.execute(
            "UPDATE agent_sessions SET last_activity_at = ?1 WHERE id = ?2",
            rusqlite::params![now, session_id],
        )?;

        Ok(AgentMessage {
            id,
            session_id: session_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Most recent `limit` messages, oldest first
    pub fn list_agent_messages(&self, session_id: &str, limit: i64) -> SqliteResult<Vec<AgentMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, created_at FROM (
                SELECT id, session_id, role, content, created_at FROM agent_messages
                WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![session_id, limit], Self::row_to_agent_message)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_agent_message(&self, session_id: &str, id: i64) -> SqliteResult<Option<AgentMessage>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, session_id, role, content, created_at FROM agent_messages WHERE id = ?1 AND session_id = ?2",
            rusqlite::params![id, session_id],
            Self::row_to_agent_message,
        )
        .optional()
    }

    pub fn insert_agent_feedback(
        &self,
        session_id: &str,
        message_id: i64,
        rating: i64,
        comment: Option<&str>,
    ) -> SqliteResult<AgentFeedback> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO agent_feedback (session_id, message_id, rating, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![session_id, message_id, rating, comment, now],
        )?;

        Ok(AgentFeedback {
            id: conn.last_insert_rowid(),
            session_id: session_id.to_string(),
            message_id,
            rating,
            comment: comment.map(str::to_string),
            created_at: now,
        })
    }

    fn row_to_agent_link(row: &Row) -> SqliteResult<AgentLink> {
        Ok(AgentLink {
            id: row.get(0)?,
            business_id: row.get(1)?,
            token: row.get(2)?,
            label: row.get(3)?,
            expires_at: row.get(4)?,
            max_sessions: row.get(5)?,
            session_count: row.get(6)?,
            is_active: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn row_to_agent_message(row: &Row) -> SqliteResult<AgentMessage> {
        Ok(AgentMessage {
            id: row.get(0)?,
            session_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
