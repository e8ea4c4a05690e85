//! Client and medical record database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use crate::db::Database;
use crate::models::{Client, ClientInput, MedicalRecord, MedicalRecordInput};

impl Database {
    pub fn create_client(&self, business_id: i64, input: &ClientInput) -> SqliteResult<Client> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO clients (business_id, full_name, phone, email, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![business_id, input.full_name, input.phone, input.email, now],
        )?;

        Ok(Client {
            id: conn.last_insert_rowid(),
            business_id,
            full_name: input.full_name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            created_at: now,
        })
    }

    pub fn get_client(&self, business_id: i64, id: i64) -> SqliteResult<Option<Client>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, business_id, full_name, phone, email, created_at FROM clients
             WHERE id = ?1 AND business_id = ?2",
            [id, business_id],
            Self::row_to_client,
        )
        .optional()
    }

    pub fn find_client_by_phone(&self, business_id: i64, phone: &str) -> SqliteResult<Option<Client>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, business_id, full_name, phone, email, created_at FROM clients
             WHERE business_id = ?1 AND phone = ?2 ORDER BY id LIMIT 1",
            rusqlite::params![business_id, phone],
            Self::row_to_client,
        )
        .optional()
    }

    /// List clients, optionally filtered by a name/phone substring
    pub fn list_clients(&self, business_id: i64, search: Option<&str>) -> SqliteResult<Vec<Client>> {
        let conn = self.conn.lock();
        let pattern = search.map(|s| format!("%{}%", s.trim()));
        let mut stmt = conn.prepare(
            "SELECT id, business_id, full_name, phone, email, created_at FROM clients
             WHERE business_id = ?1 AND (?2 IS NULL OR full_name LIKE ?2 OR phone LIKE ?2)
             ORDER BY full_name LIMIT 200",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![business_id, pattern], Self::row_to_client)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update_client(&self, business_id: i64, id: i64, input: &ClientInput) -> SqliteResult<Option<Client>> {
        let rows = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE clients SET full_name = ?1, phone = ?2, email = ?3 WHERE id = ?4 AND business_id = ?5",
                rusqlite::params![input.full_name, input.phone, input.email, id, business_id],
            )?
        };
        if rows == 0 {
            return Ok(None);
        }
        self.get_client(business_id, id)
    }

    fn row_to_client(row: &Row) -> SqliteResult<Client> {
        Ok(Client {
            id: row.get(0)?,
            business_id: row.get(1)?,
            full_name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    // ============================================
    // Medical records
    // ============================================

    pub fn create_medical_record(
        &self,
        business_id: i64,
        client_id: i64,
        input: &MedicalRecordInput,
        created_by: Option<i64>,
    ) -> SqliteResult<MedicalRecord> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO medical_records (client_id, business_id, allergies, conditions, notes, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            rusqlite::params![
                client_id,
                business_id,
                input.allergies,
                input.conditions,
                input.notes,
                created_by,
                now
            ],
        )?;

        Ok(MedicalRecord {
            id: conn.last_insert_rowid(),
            client_id,
            business_id,
            allergies: input.allergies.clone(),
            conditions: input.conditions.clone(),
            notes: input.notes.clone(),
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_medical_records(&self, business_id: i64, client_id: i64) -> SqliteResult<Vec<MedicalRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, client_id, business_id, allergies, conditions, notes, created_by, created_at, updated_at
             FROM medical_records WHERE business_id = ?1 AND client_id = ?2 ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map([business_id, client_id], Self::row_to_medical_record)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update_medical_record(
        &self,
        business_id: i64,
        id: i64,
        input: &MedicalRecordInput,
    ) -> SqliteResult<Option<MedicalRecord>> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE medical_records SET allergies = ?1, conditions = ?2, notes = ?3, updated_at = ?4
             WHERE id = ?5 AND business_id = ?6",
            rusqlite::params![input.allergies, input.conditions, input.notes, Utc::now(), id, business_id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        conn.query_row(
            "SELECT id, client_id, business_id, allergies, conditions, notes, created_by, created_at, updated_at
             FROM medical_records WHERE id = ?1",
            [id],
            Self::row_to_medical_record,
        )
        .optional()
    }

    fn row_to_medical_record(row: &Row) -> SqliteResult<MedicalRecord> {
        Ok(MedicalRecord {
            id: row.get(0)?,
            client_id: row.get(1)?,
            business_id: row.get(2)?,
            allergies: row.get(3)?,
            conditions: row.get(4)?,
            notes: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}
