//! Commission configuration and accrual database operations

use chrono::{NaiveDateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::parse_enum;
use crate::db::Database;
use crate::models::{Commission, CommissionConfig, CommissionKind, CommissionStatus, CommissionSummary};

const CONFIG_COLUMNS: &str = "id, business_id, specialist_id, kind, value, created_at, updated_at";
const COMMISSION_COLUMNS: &str =
    "id, business_id, specialist_id, appointment_id, base_amount, amount, status, earned_at, created_at, paid_at";

impl Database {
    /// Insert or replace the config for a scope (global when `specialist_id` is None)
    pub fn upsert_commission_config(
        &self,
        business_id: i64,
        specialist_id: Option<i64>,
        kind: CommissionKind,
        value: i64,
    ) -> SqliteResult<CommissionConfig> {
        {
            let conn = self.conn.lock();
            let now = Utc::now();
            let updated = conn.execute(
                "UPDATE commission_configs SET kind = ?1, value = ?2, updated_at = ?3
                 WHERE business_id = ?4 AND specialist_id IS ?5",
                rusqlite::params![kind.as_ref(), value, now, business_id, specialist_id],
            )?;
            if updated == 0 {
                conn.execute(
                    "INSERT INTO commission_configs (business_id, specialist_id, kind, value, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    rusqlite::params![business_id, specialist_id, kind.as_ref(), value, now],
                )?;
            }
        }

        self.get_commission_config(business_id, specialist_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Config for exactly this scope, no fallback
    pub fn get_commission_config(
        &self,
        business_id: i64,
        specialist_id: Option<i64>,
    ) -> SqliteResult<Option<CommissionConfig>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM commission_configs WHERE business_id = ?1 AND specialist_id IS ?2",
                CONFIG_COLUMNS
            ),
            rusqlite::params![business_id, specialist_id],
            Self::row_to_commission_config,
        )
        .optional()
    }

    /// Specialist config when present, otherwise the business-wide one
    pub fn resolve_commission_config(
        &self,
        business_id: i64,
        specialist_id: i64,
    ) -> SqliteResult<Option<CommissionConfig>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM commission_configs
                 WHERE business_id = ?1 AND (specialist_id = ?2 OR specialist_id IS NULL)
                 ORDER BY specialist_id IS NULL LIMIT 1",
                CONFIG_COLUMNS
            ),
            [business_id, specialist_id],
            Self::row_to_commission_config,
        )
        .optional()
    }

    pub fn list_commission_configs(&self, business_id: i64) -> SqliteResult<Vec<CommissionConfig>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM commission_configs WHERE business_id = ?1
             ORDER BY specialist_id IS NOT NULL, specialist_id",
            CONFIG_COLUMNS
        ))?;
        let rows = stmt
            .query_map([business_id], Self::row_to_commission_config)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete_commission_config(&self, business_id: i64, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM commission_configs WHERE id = ?1 AND business_id = ?2",
            [id, business_id],
        )?;
        Ok(rows > 0)
    }

    fn row_to_commission_config(row: &Row) -> SqliteResult<CommissionConfig> {
        Ok(CommissionConfig {
            id: row.get(0)?,
            business_id: row.get(1)?,
            specialist_id: row.get(2)?,
            kind: parse_enum(3, row.get(3)?)?,
            value: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // ============================================
    // Accrued commissions
    // ============================================

    /// Record a commission for an appointment. A second call for the same
    /// appointment returns the existing row unchanged.
    pub fn accrue_commission(
        &self,
        business_id: i64,
        specialist_id: i64,
        appointment_id: i64,
        base_amount: i64,
        amount: i64,
        earned_at: NaiveDateTime,
    ) -> SqliteResult<Commission> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO commissions
             (business_id, specialist_id, appointment_id, base_amount, amount, status, earned_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                business_id,
                specialist_id,
                appointment_id,
                base_amount,
                amount,
                CommissionStatus::Pending.as_ref(),
                earned_at,
                Utc::now()
            ],
        )?;
        conn.query_row(
            &format!("SELECT {} FROM commissions WHERE appointment_id = ?1", COMMISSION_COLUMNS),
            [appointment_id],
            Self::row_to_commission,
        )
    }

    pub fn list_commissions(
        &self,
        business_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
        specialist_id: Option<i64>,
        status: Option<CommissionStatus>,
    ) -> SqliteResult<Vec<Commission>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM commissions
             WHERE business_id = ?1 AND earned_at >= ?2 AND earned_at < ?3
               AND (?4 IS NULL OR specialist_id = ?4)
               AND (?5 IS NULL OR status = ?5)
             ORDER BY earned_at, id",
            COMMISSION_COLUMNS
        ))?;
        let rows = stmt
            .query_map(
                rusqlite::params![
                    business_id,
                    from,
                    to,
                    specialist_id,
                    status.map(|s| s.to_string())
                ],
                Self::row_to_commission,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Per-specialist totals for commissions earned in `[from, to)`
    pub fn commission_summary(
        &self,
        business_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> SqliteResult<Vec<CommissionSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT c.specialist_id, s.name, COUNT(*),
                    COALESCE(SUM(CASE WHEN c.status = 'pending' THEN c.amount END), 0),
                    COALESCE(SUM(CASE WHEN c.status = 'paid' THEN c.amount END), 0)
             FROM commissions c
             JOIN specialists s ON s.id = c.specialist_id
             WHERE c.business_id = ?1 AND c.earned_at >= ?2 AND c.earned_at < ?3
             GROUP BY c.specialist_id, s.name
             ORDER BY s.name",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![business_id, from, to], |row| {
                Ok(CommissionSummary {
                    specialist_id: row.get(0)?,
                    specialist_name: row.get(1)?,
                    services: row.get(2)?,
                    pending_amount: row.get(3)?,
                    paid_amount: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Mark pending commissions as paid. Returns how many rows changed.
    pub fn mark_commissions_paid(&self, business_id: i64, ids: &[i64]) -> SqliteResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE commissions SET status = 'paid', paid_at = ?1
                 WHERE id = ?2 AND business_id = ?3 AND status = 'pending'",
            )?;
            for id in ids {
                changed += stmt.execute(rusqlite::params![now, id, business_id])?;
            }
        }
        tx.commit()?;
        Ok(changed)
    }

    pub fn pending_commissions_total(&self, business_id: i64) -> SqliteResult<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM commissions WHERE business_id = ?1 AND status = 'pending'",
            [business_id],
            |row| row.get(0),
        )
    }

    fn row_to_commission(row: &Row) -> SqliteResult<Commission> {
        Ok(Commission {
            id: row.get(0)?,
            business_id: row.get(1)?,
            specialist_id: row.get(2)?,
            appointment_id: row.get(3)?,
            base_amount: row.get(4)?,
            amount: row.get(5)?,
            status: parse_enum(6, row.get(6)?)?,
            earned_at: row.get(7)?,
            created_at: row.get(8)?,
            paid_at: row.get(9)?,
        })
    }
}
