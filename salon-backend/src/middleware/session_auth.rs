// Session authentication for protected routes.
// Handlers take an `AuthContext` argument; extraction fails with 401 when the
// bearer token is missing, unknown or expired.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::db::Database;
use crate::error::AppError;
use crate::models::UserRole;
use crate::AppState;

/// The authenticated caller behind a request
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: i64,
    pub account_id: i64,
    pub role: UserRole,
}

impl AuthContext {
    /// Owner/admin gate for endpoints that change configuration
    pub fn require_manager(&self) -> Result<(), AppError> {
        if self.role.can_manage() {
            Ok(())
        } else {
            Err(AppError::forbidden("Only owners and admins can do this"))
        }
    }

    pub fn require_owner(&self) -> Result<(), AppError> {
        if self.role == UserRole::Owner {
            Ok(())
        } else {
            Err(AppError::forbidden("Only the account owner can do this"))
        }
    }
}

pub fn extract_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim_start_matches("Bearer ").trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn validate_request(db: &Database, req: &HttpRequest) -> Result<AuthContext, AppError> {
    let token = extract_token(req)
        .ok_or_else(|| AppError::Unauthorized("No authorization token provided".to_string()))?;

    match db.validate_session(&token)? {
        Some((_, user)) => Ok(AuthContext {
            user_id: user.id,
            account_id: user.account_id,
            role: user.role,
        }),
        None => Err(AppError::Unauthorized("Invalid or expired session".to_string())),
    }
}

impl FromRequest for AuthContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<AppState>>() {
            Some(state) => validate_request(&state.db, req),
            None => {
                log::error!("[AUTH] AppState missing from app data");
                Err(AppError::Unauthorized("Authentication unavailable".to_string()))
            }
        };
        ready(result)
    }
}
