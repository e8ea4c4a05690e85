//! Subscription and subscription payment database operations

use chrono::{DateTime, Months, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::parse_enum;
use crate::db::Database;
use crate::models::{Plan, Subscription, SubscriptionPayment, SubscriptionStatus};

const SUBSCRIPTION_COLUMNS: &str =
    "id, account_id, plan, status, gateway_subscription_id, current_period_end, created_at, updated_at";

impl Database {
    pub fn get_subscription(&self, account_id: i64) -> SqliteResult<Option<Subscription>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM subscriptions WHERE account_id = ?1", SUBSCRIPTION_COLUMNS),
            [account_id],
            Self::row_to_subscription,
        )
        .optional()
    }

    pub fn get_subscription_by_gateway_id(&self, gateway_id: &str) -> SqliteResult<Option<Subscription>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM subscriptions WHERE gateway_subscription_id = ?1",
                SUBSCRIPTION_COLUMNS
            ),
            [gateway_id],
            Self::row_to_subscription,
        )
        .optional()
    }

    /// Remember the preapproval created at checkout. Status is left alone
    /// until the gateway confirms.
    pub fn set_subscription_checkout(&self, account_id: i64, plan: Plan, gateway_id: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE subscriptions SET plan = ?1, gateway_subscription_id = ?2, updated_at = ?3 WHERE account_id = ?4",
            rusqlite::params![plan.as_ref(), gateway_id, Utc::now(), account_id],
        )?;
        Ok(rows > 0)
    }

    pub fn set_subscription_status(&self, account_id: i64, status: SubscriptionStatus) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE subscriptions SET status = ?1, updated_at = ?2 WHERE account_id = ?3",
            rusqlite::params![status.as_ref(), Utc::now(), account_id],
        )?;
        Ok(rows > 0)
    }

    /// Record an approved payment and extend the paid period by one month
    /// from `max(now, current_period_end)`.
    ///
    /// Returns false when the payment was already recorded.
    pub fn apply_approved_payment(
        &self,
        account_id: i64,
        gateway_payment_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> SqliteResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO subscription_payments (account_id, gateway_payment_id, amount, status, created_at)
             VALUES (?1, ?2, ?3, 'approved', ?4)",
            rusqlite::params![account_id, gateway_payment_id, amount, now],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        let current_end: DateTime<Utc> = tx.query_row(
            "SELECT current_period_end FROM subscriptions WHERE account_id = ?1",
            [account_id],
            |row| row.get(0),
        )?;
        let from = current_end.max(now);
        let new_end = from.checked_add_months(Months::new(1)).unwrap_or(from);

        tx.execute(
            "UPDATE subscriptions SET status = ?1, current_period_end = ?2, updated_at = ?3 WHERE account_id = ?4",
            rusqlite::params![SubscriptionStatus::Active.as_ref(), new_end, now, account_id],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Store a non-approved payment notification for the audit trail
    pub fn record_subscription_payment(
        &self,
        account_id: i64,
        gateway_payment_id: &str,
        amount: i64,
        status: &str,
    ) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "INSERT OR IGNORE INTO subscription_payments (account_id, gateway_payment_id, amount, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![account_id, gateway_payment_id, amount, status, Utc::now()],
        )?;
        Ok(rows > 0)
    }

    pub fn list_subscription_payments(&self, account_id: i64) -> SqliteResult<Vec<SubscriptionPayment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, account_id, gateway_payment_id, amount, status, created_at
             FROM subscription_payments WHERE account_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map([account_id], |row| {
                Ok(SubscriptionPayment {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    gateway_payment_id: row.get(2)?,
                    amount: row.get(3)?,
                    status: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_to_subscription(row: &Row) -> SqliteResult<Subscription> {
        Ok(Subscription {
            id: row.get(0)?,
            account_id: row.get(1)?,
            plan: parse_enum(2, row.get(2)?)?,
            status: parse_enum(3, row.get(3)?)?,
            gateway_subscription_id: row.get(4)?,
            current_period_end: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;
    use chrono::Duration;

    #[test]
    fn test_approved_payment_extends_period_once() {
        let (db, seed) = seeded_db();
        let before = db.get_subscription(seed.account_id).unwrap().unwrap();
        let now = Utc::now();

        assert!(db.apply_approved_payment(seed.account_id, "pay-1", 4_990_000, now).unwrap());
        assert!(!db.apply_approved_payment(seed.account_id, "pay-1", 4_990_000, now).unwrap());

        let after = db.get_subscription(seed.account_id).unwrap().unwrap();
        assert_eq!(after.status, SubscriptionStatus::Active);
        // Trial end is in the future, so the month is added on top of it
        assert!(after.current_period_end > before.current_period_end + Duration::days(27));
        assert!(after.current_period_end < before.current_period_end + Duration::days(32));
        assert_eq!(db.list_subscription_payments(seed.account_id).unwrap().len(), 1);
    }

    #[test]
    fn test_checkout_then_lookup_by_gateway_id() {
        let (db, seed) = seeded_db();
        db.set_subscription_checkout(seed.account_id, Plan::Professional, "pre-123")
            .unwrap();

        let sub = db.get_subscription_by_gateway_id("pre-123").unwrap().unwrap();
        assert_eq!(sub.account_id, seed.account_id);
        assert_eq!(sub.plan, Plan::Professional);
        assert_eq!(sub.status, SubscriptionStatus::Trialing);

        db.set_subscription_status(seed.account_id, SubscriptionStatus::PastDue)
            .unwrap();
        let sub = db.get_subscription(seed.account_id).unwrap().unwrap();
        assert!(!sub.is_usable(Utc::now()));
    }
}
