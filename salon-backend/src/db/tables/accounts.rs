//! Business account and user database operations

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::parse_enum;
use crate::db::Database;
use crate::models::{BusinessAccount, Plan, SubscriptionStatus, User, UserRole};

const USER_COLUMNS: &str = "id, account_id, email, full_name, role, password_hash, created_at";

impl Database {
    /// Create a tenant together with its owner and a trial subscription
    pub fn create_account_with_owner(
        &self,
        account_name: &str,
        full_name: &str,
        email: &str,
        password_hash: &str,
        trial_ends_at: DateTime<Utc>,
    ) -> SqliteResult<(BusinessAccount, User)> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = Utc::now();

        tx.execute(
            "INSERT INTO business_accounts (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            rusqlite::params![account_name, now],
        )?;
        let account_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO users (account_id, email, full_name, role, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                account_id,
                email,
                full_name,
                UserRole::Owner.as_ref(),
                password_hash,
                now
            ],
        )?;
        let user_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO subscriptions (account_id, plan, status, current_period_end, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            rusqlite::params![
                account_id,
                Plan::Basic.as_ref(),
                SubscriptionStatus::Trialing.as_ref(),
                trial_ends_at,
                now
            ],
        )?;

        tx.commit()?;

        Ok((
            BusinessAccount {
                id: account_id,
                name: account_name.to_string(),
                created_at: now,
                updated_at: now,
            },
            User {
                id: user_id,
                account_id,
                email: email.to_string(),
                full_name: full_name.to_string(),
                role: UserRole::Owner,
                password_hash: password_hash.to_string(),
                created_at: now,
            },
        ))
    }

    pub fn get_account(&self, id: i64) -> SqliteResult<Option<BusinessAccount>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, created_at, updated_at FROM business_accounts WHERE id = ?1",
            [id],
            |row| {
                Ok(BusinessAccount {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )
        .optional()
    }

    pub fn rename_account(&self, id: i64, name: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE business_accounts SET name = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![name, Utc::now(), id],
        )?;
        Ok(rows > 0)
    }

    /// Add a member to an existing account
    pub fn create_user(
        &self,
        account_id: i64,
        email: &str,
        full_name: &str,
        role: UserRole,
        password_hash: &str,
    ) -> SqliteResult<User> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (account_id, email, full_name, role, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![account_id, email, full_name, role.as_ref(), password_hash, now],
        )?;

        Ok(User {
            id: conn.last_insert_rowid(),
            account_id,
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    pub fn get_user(&self, id: i64) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            Self::row_to_user,
        )
        .optional()
    }

    /// Emails are stored lowercased
    pub fn get_user_by_email(&self, email: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            [email],
            Self::row_to_user,
        )
        .optional()
    }

    pub fn list_users(&self, account_id: i64) -> SqliteResult<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE account_id = ?1 ORDER BY id",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([account_id], Self::row_to_user)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(users)
    }

    pub(crate) fn row_to_user(row: &Row) -> SqliteResult<User> {
        Ok(User {
            id: row.get(0)?,
            account_id: row.get(1)?,
            email: row.get(2)?,
            full_name: row.get(3)?,
            role: parse_enum(4, row.get(4)?)?,
            password_hash: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_account_creation_seeds_owner_and_trial() {
        let db = Database::new(":memory:").unwrap();
        let trial_end = Utc::now() + Duration::days(14);
        let (account, owner) = db
            .create_account_with_owner("Glow Studio", "Ana Ruiz", "ana@glow.co", "hash", trial_end)
            .unwrap();

        assert_eq!(owner.role, UserRole::Owner);
        assert_eq!(db.get_user_by_email("ana@glow.co").unwrap().unwrap().id, owner.id);

        let subscription = db.get_subscription(account.id).unwrap().unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Trialing);
        assert_eq!(subscription.plan, Plan::Basic);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = Database::new(":memory:").unwrap();
        let trial_end = Utc::now() + Duration::days(14);
        let (account, _) = db
            .create_account_with_owner("Glow", "Ana", "ana@glow.co", "hash", trial_end)
            .unwrap();

        let err = db
            .create_user(account.id, "ana@glow.co", "Other", UserRole::Staff, "hash")
            .unwrap_err();
        assert!(super::super::is_constraint_violation(&err));
        assert_eq!(db.list_users(account.id).unwrap().len(), 1);
    }
}
