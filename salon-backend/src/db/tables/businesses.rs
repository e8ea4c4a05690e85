//! Business (location) database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::parse_enum;
use crate::db::Database;
use crate::models::{Business, BusinessInput};

const BUSINESS_COLUMNS: &str = "id, account_id, name, phone, address, currency, opening_time, closing_time,
     whatsapp_phone_number_id, created_at, updated_at";

impl Database {
    pub fn create_business(&self, account_id: i64, input: &BusinessInput) -> SqliteResult<Business> {
        let id = {
            let conn = self.conn.lock();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO businesses (account_id, name, phone, address, currency, opening_time, closing_time,
                 whatsapp_phone_number_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    account_id,
                    input.name,
                    input.phone,
                    input.address,
                    input.currency.as_ref(),
                    input.opening_time,
                    input.closing_time,
                    input.whatsapp_phone_number_id,
                    now
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.get_business(id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_business(&self, id: i64) -> SqliteResult<Option<Business>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM businesses WHERE id = ?1", BUSINESS_COLUMNS),
            [id],
            Self::row_to_business,
        )
        .optional()
    }

    /// Tenant-scoped lookup: `None` when the business belongs to another account
    pub fn get_account_business(&self, account_id: i64, id: i64) -> SqliteResult<Option<Business>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM businesses WHERE id = ?1 AND account_id = ?2",
                BUSINESS_COLUMNS
            ),
            [id, account_id],
            Self::row_to_business,
        )
        .optional()
    }

    pub fn list_businesses(&self, account_id: i64) -> SqliteResult<Vec<Business>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM businesses WHERE account_id = ?1 ORDER BY name",
            BUSINESS_COLUMNS
        ))?;
        let rows = stmt
            .query_map([account_id], Self::row_to_business)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count_businesses(&self, account_id: i64) -> SqliteResult<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM businesses WHERE account_id = ?1",
            [account_id],
            |row| row.get(0),
        )
    }

    /// Route an inbound WhatsApp webhook to its business
    pub fn get_business_by_whatsapp_number(&self, phone_number_id: &str) -> SqliteResult<Option<Business>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM businesses WHERE whatsapp_phone_number_id = ?1",
                BUSINESS_COLUMNS
            ),
            [phone_number_id],
            Self::row_to_business,
        )
        .optional()
    }

    pub fn update_business(&self, id: i64, input: &BusinessInput) -> SqliteResult<Option<Business>> {
        let rows = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE businesses SET name = ?1, phone = ?2, address = ?3, currency = ?4, opening_time = ?5,
                 closing_time = ?6, whatsapp_phone_number_id = ?7, updated_at = ?8 WHERE id = ?9",
                rusqlite::params![
                    input.name,
                    input.phone,
                    input.address,
                    input.currency.as_ref(),
                    input.opening_time,
                    input.closing_time,
                    input.whatsapp_phone_number_id,
                    Utc::now(),
                    id
                ],
            )?
        };
        if rows == 0 {
            return Ok(None);
        }
        self.get_business(id)
    }

    pub fn delete_business(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM businesses WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    fn row_to_business(row: &Row) -> SqliteResult<Business> {
        Ok(Business {
            id: row.get(0)?,
            account_id: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            address: row.get(4)?,
            currency: parse_enum(5, row.get(5)?)?,
            opening_time: row.get(6)?,
            closing_time: row.get(7)?,
            whatsapp_phone_number_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}
