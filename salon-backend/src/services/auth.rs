//! Registration, login and account membership

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;

use crate::db::tables::is_constraint_violation;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const TRIAL_DAYS: i64 = 14;

#[derive(Debug, Serialize)]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            log::error!("[AUTH] Password hashing failed: {}", e);
            AppError::External("Password hashing failed".to_string())
        })
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// 32 random bytes, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid {
        return Err(AppError::validation("A valid email is required"));
    }
    Ok(email)
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn open_session(db: &Database, user: User, ttl_hours: i64) -> AppResult<SessionGrant> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);
    db.create_session(user.id, &token, expires_at)?;
    Ok(SessionGrant {
        token,
        expires_at,
        user,
    })
}

/// Create a tenant, its owner, a trial subscription and a first session
pub fn register(
    db: &Database,
    account_name: &str,
    full_name: &str,
    email: &str,
    password: &str,
    ttl_hours: i64,
) -> AppResult<SessionGrant> {
    let account_name = required(account_name, "Account name")?;
    let full_name = required(full_name, "Full name")?;
    let email = normalize_email(email)?;
    validate_password(password)?;

    if db.get_user_by_email(&email)?.is_some() {
        return Err(AppError::conflict("An account with this email already exists"));
    }

    let hash = hash_password(password)?;
    let trial_ends_at = Utc::now() + Duration::days(TRIAL_DAYS);
    let (account, owner) = db
        .create_account_with_owner(&account_name, &full_name, &email, &hash, trial_ends_at)
        .map_err(|e| {
            if is_constraint_violation(&e) {
                AppError::conflict("An account with this email already exists")
            } else {
                e.into()
            }
        })?;

    log::info!("[AUTH] Registered account {} ({})", account.id, account.name);
    open_session(db, owner, ttl_hours)
}

pub fn login(db: &Database, email: &str, password: &str, ttl_hours: i64) -> AppResult<SessionGrant> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());
    let email = email.trim().to_lowercase();

    let user = db.get_user_by_email(&email)?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password_hash) {
        return Err(invalid());
    }

    open_session(db, user, ttl_hours)
}

pub fn logout(db: &Database, token: &str) -> AppResult<()> {
    db.delete_session(token)?;
    Ok(())
}

/// Add a staff or admin member to the caller's account
pub fn add_member(
    db: &Database,
    account_id: i64,
    full_name: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> AppResult<User> {
    if role == UserRole::Owner {
        return Err(AppError::validation("An account has exactly one owner"));
    }
    let full_name = required(full_name, "Full name")?;
    let email = normalize_email(email)?;
    validate_password(password)?;

    let hash = hash_password(password)?;
    db.create_user(account_id, &email, &full_name, role, &hash)
        .map_err(|e| {
            if is_constraint_violation(&e) {
                AppError::conflict("A user with this email already exists")
            } else {
                e.into()
            }
        })
}
