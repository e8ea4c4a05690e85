use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shareable token granting temporary access to the booking assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLink {
    pub id: i64,
    pub business_id: i64,
    pub token: String,
    pub label: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_sessions: Option<i64>,
    pub session_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl AgentLink {
    /// Why the link cannot be used right now, if anything
    pub fn unusable_reason(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if !self.is_active {
            return Some("This link has been revoked");
        }
        if self.expires_at.is_some_and(|at| now >= at) {
            return Some("This link has expired");
        }
        None
    }

    pub fn can_open_session(&self) -> bool {
        self.max_sessions.is_none_or(|max| self.session_count < max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    /// Public uuid handed to the chat client
    pub id: String,
    pub link_id: i64,
    pub business_id: i64,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: i64,
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFeedback {
    pub id: i64,
    pub session_id: String,
    pub message_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link() -> AgentLink {
        AgentLink {
            id: 1,
            business_id: 1,
            token: "abc".to_string(),
            label: None,
            expires_at: None,
            max_sessions: None,
            session_count: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_link_expiry_and_revocation() {
        let now = Utc::now();
        assert!(link().unusable_reason(now).is_none());

        let mut expired = link();
        expired.expires_at = Some(now - Duration::minutes(1));
        assert_eq!(expired.unusable_reason(now), Some("This link has expired"));

        let mut revoked = link();
        revoked.is_active = false;
        assert_eq!(revoked.unusable_reason(now), Some("This link has been revoked"));
    }

    #[test]
    fn test_session_limit() {
        let mut limited = link();
        limited.max_sessions = Some(2);
        limited.session_count = 1;
        assert!(limited.can_open_session());
        limited.session_count = 2;
        assert!(!limited.can_open_session());
        assert!(link().can_open_session());
    }
}
