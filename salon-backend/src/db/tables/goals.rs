//! Dashboard goal database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::parse_enum;
use crate::db::Database;
use crate::domain::Period;
use crate::models::{Goal, GoalMetric};

const GOAL_COLUMNS: &str = "id, business_id, specialist_id, metric, period, target, created_at";

impl Database {
    pub fn create_goal(
        &self,
        business_id: i64,
        specialist_id: Option<i64>,
        metric: GoalMetric,
        period: Period,
        target: i64,
    ) -> SqliteResult<Goal> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO goals (business_id, specialist_id, metric, period, target, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![business_id, specialist_id, metric.as_ref(), period.as_ref(), target, now],
        )?;

        Ok(Goal {
            id: conn.last_insert_rowid(),
            business_id,
            specialist_id,
            metric,
            period,
            target,
            created_at: now,
        })
    }

    pub fn get_goal(&self, business_id: i64, id: i64) -> SqliteResult<Option<Goal>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM goals WHERE id = ?1 AND business_id = ?2", GOAL_COLUMNS),
            [id, business_id],
            Self::row_to_goal,
        )
        .optional()
    }

    pub fn list_goals(&self, business_id: i64) -> SqliteResult<Vec<Goal>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM goals WHERE business_id = ?1 ORDER BY id",
            GOAL_COLUMNS
        ))?;
        let rows = stmt
            .query_map([business_id], Self::row_to_goal)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update_goal_target(&self, business_id: i64, id: i64, target: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE goals SET target = ?1 WHERE id = ?2 AND business_id = ?3",
            [target, id, business_id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_goal(&self, business_id: i64, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM goals WHERE id = ?1 AND business_id = ?2", [id, business_id])?;
        Ok(rows > 0)
    }

    fn row_to_goal(row: &Row) -> SqliteResult<Goal> {
        Ok(Goal {
            id: row.get(0)?,
            business_id: row.get(1)?,
            specialist_id: row.get(2)?,
            metric: parse_enum(3, row.get(3)?)?,
            period: parse_enum(4, row.get(4)?)?,
            target: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}
