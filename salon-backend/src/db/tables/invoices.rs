//! Invoice numbering and invoice database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use crate::db::Database;
use crate::models::invoice::{compute_tax, format_invoice_number};
use crate::models::{Invoice, InvoiceSettings};

const INVOICE_COLUMNS: &str = "id, business_id, appointment_id, number, full_number, subtotal, tax, total, issued_at";

impl Database {
    pub fn get_invoice_settings(&self, business_id: i64) -> SqliteResult<Option<InvoiceSettings>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT business_id, prefix, next_number, tax_rate_bps, updated_at
             FROM invoice_settings WHERE business_id = ?1",
            [business_id],
            |row| {
                Ok(InvoiceSettings {
                    business_id: row.get(0)?,
                    prefix: row.get(1)?,
                    next_number: row.get(2)?,
                    tax_rate_bps: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()
    }

    /// Insert or replace the settings. `next_number` is only overwritten when given.
    pub fn upsert_invoice_settings(
        &self,
        business_id: i64,
        prefix: &str,
        tax_rate_bps: i64,
        next_number: Option<i64>,
    ) -> SqliteResult<InvoiceSettings> {
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO invoice_settings (business_id, prefix, next_number, tax_rate_bps, updated_at)
                 VALUES (?1, ?2, COALESCE(?3, 1), ?4, ?5)
                 ON CONFLICT(business_id) DO UPDATE SET
                    prefix = excluded.prefix,
                    next_number = COALESCE(?3, invoice_settings.next_number),
                    tax_rate_bps = excluded.tax_rate_bps,
                    updated_at = excluded.updated_at",
                rusqlite::params![business_id, prefix, next_number, tax_rate_bps, Utc::now()],
            )?;
        }

        self.get_invoice_settings(business_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Take the next number and insert the invoice in one transaction.
    ///
    /// Returns `None` when the business has no invoice settings.
    pub fn issue_invoice(
        &self,
        business_id: i64,
        appointment_id: i64,
        subtotal: i64,
    ) -> SqliteResult<Option<Invoice>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let settings: Option<(String, i64, i64)> = tx
            .query_row(
                "SELECT prefix, next_number, tax_rate_bps FROM invoice_settings WHERE business_id = ?1",
                [business_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((prefix, number, tax_rate_bps)) = settings else {
            return Ok(None);
        };

        let tax = compute_tax(subtotal, tax_rate_bps);
        let full_number = format_invoice_number(&prefix, number);
        let now = Utc::now();

        tx.execute(
            "INSERT INTO invoices (business_id, appointment_id, number, full_number, subtotal, tax, total, issued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                business_id,
                appointment_id,
                number,
                full_number,
                subtotal,
                tax,
                subtotal + tax,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE invoice_settings SET next_number = next_number + 1 WHERE business_id = ?1",
            [business_id],
        )?;
        tx.commit()?;

        Ok(Some(Invoice {
            id,
            business_id,
            appointment_id,
            number,
            full_number,
            subtotal,
            tax,
            total: subtotal + tax,
            issued_at: now,
        }))
    }

    pub fn get_invoice(&self, business_id: i64, id: i64) -> SqliteResult<Option<Invoice>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM invoices WHERE id = ?1 AND business_id = ?2", INVOICE_COLUMNS),
            [id, business_id],
            Self::row_to_invoice,
        )
        .optional()
    }

    /// Highest invoice number the business has issued so far
    pub fn max_invoice_number(&self, business_id: i64) -> SqliteResult<Option<i64>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT MAX(number) FROM invoices WHERE business_id = ?1",
            [business_id],
            |row| row.get(0),
        )
    }

    pub fn get_invoice_for_appointment(&self, appointment_id: i64) -> SqliteResult<Option<Invoice>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM invoices WHERE appointment_id = ?1", INVOICE_COLUMNS),
            [appointment_id],
            Self::row_to_invoice,
        )
        .optional()
    }

    pub fn list_invoices(&self, business_id: i64, limit: i64) -> SqliteResult<Vec<Invoice>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM invoices WHERE business_id = ?1 ORDER BY number DESC LIMIT ?2",
            INVOICE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([business_id, limit], Self::row_to_invoice)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_to_invoice(row: &Row) -> SqliteResult<Invoice> {
        Ok(Invoice {
            id: row.get(0)?,
            business_id: row.get(1)?,
            appointment_id: row.get(2)?,
            number: row.get(3)?,
            full_number: row.get(4)?,
            subtotal: row.get(5)?,
            tax: row.get(6)?,
            total: row.get(7)?,
            issued_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tables::{is_constraint_violation, is_unique_violation_on, NewAppointment};
    use crate::db::test_support::seeded_db;
    use chrono::{Duration, NaiveDate};

    fn appointment(db: &Database, seed: &crate::db::test_support::Seed, hour: u32) -> i64 {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(hour, 0, 0).unwrap();
        db.create_appointment_if_free(&NewAppointment {
            business_id: seed.business_id,
            client_id: seed.client_id,
            specialist_id: seed.specialist_id,
            service_id: seed.service_id,
            starts_at: start,
            ends_at: start + Duration::minutes(60),
            total_amount: 100_000,
            notes: None,
        })
        .unwrap()
        .unwrap()
        .id
    }

    #[test]
    fn test_no_settings_no_invoice() {
        let (db, seed) = seeded_db();
        let appt = appointment(&db, &seed, 10);
        assert!(db.issue_invoice(seed.business_id, appt, 100_000).unwrap().is_none());
    }

    #[test]
    fn test_numbers_are_sequential() {
        let (db, seed) = seeded_db();
        db.upsert_invoice_settings(seed.business_id, "GLOW", 1_900, Some(41)).unwrap();

        let first = db
            .issue_invoice(seed.business_id, appointment(&db, &seed, 10), 100_000)
            .unwrap()
            .unwrap();
        let second = db
            .issue_invoice(seed.business_id, appointment(&db, &seed, 12), 100_000)
            .unwrap()
            .unwrap();

        assert_eq!(first.full_number, "GLOW-000041");
        assert_eq!(second.full_number, "GLOW-000042");
        assert_eq!(first.tax, 19_000);
        assert_eq!(first.total, 119_000);
        assert_eq!(db.get_invoice_settings(seed.business_id).unwrap().unwrap().next_number, 43);
    }

    #[test]
    fn test_settings_update_keeps_counter() {
        let (db, seed) = seeded_db();
        db.upsert_invoice_settings(seed.business_id, "GLOW", 0, Some(7)).unwrap();
        let updated = db.upsert_invoice_settings(seed.business_id, "SALON", 500, None).unwrap();
        assert_eq!(updated.prefix, "SALON");
        assert_eq!(updated.next_number, 7);
    }

    #[test]
    fn test_one_invoice_per_appointment() {
        let (db, seed) = seeded_db();
        db.upsert_invoice_settings(seed.business_id, "GLOW", 0, None).unwrap();
        let appt = appointment(&db, &seed, 10);
        db.issue_invoice(seed.business_id, appt, 100_000).unwrap();

        let err = db.issue_invoice(seed.business_id, appt, 100_000).unwrap_err();
        assert!(is_constraint_violation(&err));
        assert!(is_unique_violation_on(&err, "invoices.appointment_id"));
        assert!(!is_unique_violation_on(&err, "invoices.full_number"));
        assert_eq!(db.max_invoice_number(seed.business_id).unwrap(), Some(1));
        // The failed attempt must not consume a number
        assert_eq!(db.get_invoice_settings(seed.business_id).unwrap().unwrap().next_number, 2);
    }
}
