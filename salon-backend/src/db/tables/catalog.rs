//! Specialist and service catalog database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use crate::db::Database;
use crate::models::{Service, ServiceInput, Specialist, SpecialistInput};

impl Database {
    // ============================================
    // Specialists
    // ============================================

    pub fn create_specialist(&self, business_id: i64, input: &SpecialistInput) -> SqliteResult<Specialist> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO specialists (business_id, name, phone, email, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![business_id, input.name, input.phone, input.email, input.is_active, now],
        )?;

        Ok(Specialist {
            id: conn.last_insert_rowid(),
            business_id,
            name: input.name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            is_active: input.is_active,
            created_at: now,
        })
    }

    pub fn get_specialist(&self, business_id: i64, id: i64) -> SqliteResult<Option<Specialist>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, business_id, name, phone, email, is_active, created_at
             FROM specialists WHERE id = ?1 AND business_id = ?2",
            [id, business_id],
            Self::row_to_specialist,
        )
        .optional()
    }

    pub fn list_specialists(&self, business_id: i64, active_only: bool) -> SqliteResult<Vec<Specialist>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, business_id, name, phone, email, is_active, created_at
             FROM specialists WHERE business_id = ?1 AND (?2 = 0 OR is_active = 1) ORDER BY name",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![business_id, active_only], Self::row_to_specialist)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count_active_specialists(&self, business_id: i64) -> SqliteResult<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM specialists WHERE business_id = ?1 AND is_active = 1",
            [business_id],
            |row| row.get(0),
        )
    }

    pub fn update_specialist(
        &self,
        business_id: i64,
        id: i64,
        input: &SpecialistInput,
    ) -> SqliteResult<Option<Specialist>> {
        let rows = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE specialists SET name = ?1, phone = ?2, email = ?3, is_active = ?4
                 WHERE id = ?5 AND business_id = ?6",
                rusqlite::params![input.name, input.phone, input.email, input.is_active, id, business_id],
            )?
        };
        if rows == 0 {
            return Ok(None);
        }
        self.get_specialist(business_id, id)
    }

    fn row_to_specialist(row: &Row) -> SqliteResult<Specialist> {
        Ok(Specialist {
            id: row.get(0)?,
            business_id: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            is_active: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // ============================================
    // Services
    // ============================================

    pub fn create_service(&self, business_id: i64, input: &ServiceInput) -> SqliteResult<Service> {
        let conn = self.conn.lock();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO services (business_id, name, duration_minutes, price, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                business_id,
                input.name,
                input.duration_minutes,
                input.price,
                input.is_active,
                now
            ],
        )?;

        Ok(Service {
            id: conn.last_insert_rowid(),
            business_id,
            name: input.name.clone(),
            duration_minutes: input.duration_minutes,
            price: input.price,
            is_active: input.is_active,
            created_at: now,
        })
    }

    pub fn get_service(&self, business_id: i64, id: i64) -> SqliteResult<Option<Service>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, business_id, name, duration_minutes, price, is_active, created_at
             FROM services WHERE id = ?1 AND business_id = ?2",
            [id, business_id],
            Self::row_to_service,
        )
        .optional()
    }

    pub fn list_services(&self, business_id: i64, active_only: bool) -> SqliteResult<Vec<Service>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, business_id, name, duration_minutes, price, is_active, created_at
             FROM services WHERE business_id = ?1 AND (?2 = 0 OR is_active = 1) ORDER BY name",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![business_id, active_only], Self::row_to_service)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update_service(
        &self,
        business_id: i64,
        id: i64,
        input: &ServiceInput,
    ) -> SqliteResult<Option<Service>> {
        let rows = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE services SET name = ?1, duration_minutes = ?2, price = ?3, is_active = ?4
                 WHERE id = ?5 AND business_id = ?6",
                rusqlite::params![
                    input.name,
                    input.duration_minutes,
                    input.price,
                    input.is_active,
                    id,
                    business_id
                ],
            )?
        };
        if rows == 0 {
            return Ok(None);
        }
        self.get_service(business_id, id)
    }

    fn row_to_service(row: &Row) -> SqliteResult<Service> {
        Ok(Service {
            id: row.get(0)?,
            business_id: row.get(1)?,
            name: row.get(2)?,
            duration_minutes: row.get(3)?,
            price: row.get(4)?,
            is_active: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}
