//! Admin session database operations

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult};

use crate::db::Database;
use crate::models::{AuthSession, User};

impl Database {
    pub fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> SqliteResult<AuthSession> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![token, user_id, now, expires_at],
        )?;

        Ok(AuthSession {
            id: conn.last_insert_rowid(),
            token: token.to_string(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Resolve a token to its session and user, ignoring expired sessions
    pub fn validate_session(&self, token: &str) -> SqliteResult<Option<(AuthSession, User)>> {
        let session = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT id, token, user_id, created_at, expires_at FROM auth_sessions
                 WHERE token = ?1 AND expires_at > ?2",
                rusqlite::params![token, Utc::now()],
                |row| {
                    Ok(AuthSession {
                        id: row.get(0)?,
                        token: row.get(1)?,
                        user_id: row.get(2)?,
                        created_at: row.get(3)?,
                        expires_at: row.get(4)?,
                    })
                },
            )
            .optional()?
        };

        let Some(session) = session else {
            return Ok(None);
        };

        Ok(self.get_user(session.user_id)?.map(|user| (session, user)))
    }

    pub fn delete_session(&self, token: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?;
        Ok(rows > 0)
    }

    pub fn delete_expired_sessions(&self) -> SqliteResult<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM auth_sessions WHERE expires_at <= ?1",
            rusqlite::params![Utc::now()],
        )
    }
}
