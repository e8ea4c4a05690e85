//! Appointment and appointment payment database operations

use chrono::{NaiveDateTime, Utc};
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::parse_enum;
use crate::db::Database;
use crate::models::{Appointment, AppointmentPayment, AppointmentStatus, DueReminder, PaymentMethod};

const APPOINTMENT_COLUMNS: &str = "id, business_id, client_id, specialist_id, service_id, starts_at, ends_at,
     status, total_amount, paid_amount, notes, reminder_sent, created_at, updated_at";

/// Statuses that no longer hold a slot in the specialist's schedule
const FREE_STATUSES: &str = "('cancelled', 'no_show')";

/// Row data for a new appointment
pub struct NewAppointment<'a> {
    pub business_id: i64,
    pub client_id: i64,
    pub specialist_id: i64,
    pub service_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub total_amount: i64,
    pub notes: Option<&'a str>,
}

impl Database {
    /// Insert an appointment unless it overlaps another active appointment
    /// of the same specialist. The check and the insert run under one lock.
    ///
    /// Returns `None` on overlap.
    pub fn create_appointment_if_free(&self, new: &NewAppointment) -> SqliteResult<Option<Appointment>> {
        let id = {
            let conn = self.conn.lock();
            let overlapping: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM appointments
                     WHERE specialist_id = ?1 AND status NOT IN {}
                       AND starts_at < ?3 AND ends_at > ?2",
                    FREE_STATUSES
                ),
                rusqlite::params![new.specialist_id, new.starts_at, new.ends_at],
                |row| row.get(0),
            )?;
            if overlapping > 0 {
                return Ok(None);
            }

            let now = Utc::now();
            conn.execute(
                "INSERT INTO appointments (business_id, client_id, specialist_id, service_id, starts_at, ends_at,
                 status, total_amount, paid_amount, notes, reminder_sent, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, 0, ?10, ?10)",
                rusqlite::params![
                    new.business_id,
                    new.client_id,
                    new.specialist_id,
                    new.service_id,
                    new.starts_at,
                    new.ends_at,
                    AppointmentStatus::Pending.as_ref(),
                    new.total_amount,
                    new.notes,
                    now
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.get_appointment(new.business_id, id)
    }

    pub fn get_appointment(&self, business_id: i64, id: i64) -> SqliteResult<Option<Appointment>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {} FROM appointments WHERE id = ?1 AND business_id = ?2",
                APPOINTMENT_COLUMNS
            ),
            [id, business_id],
            Self::row_to_appointment,
        )
        .optional()
    }

    /// Appointments starting in `[from, to)`, ordered by start time
    pub fn list_appointments(
        &self,
        business_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
        specialist_id: Option<i64>,
    ) -> SqliteResult<Vec<Appointment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM appointments
             WHERE business_id = ?1 AND starts_at >= ?2 AND starts_at < ?3
               AND (?4 IS NULL OR specialist_id = ?4)
             ORDER BY starts_at, id",
            APPOINTMENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(
                rusqlite::params![business_id, from, to, specialist_id],
                Self::row_to_appointment,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Next active appointments starting at or after `after`
    pub fn upcoming_appointments(
        &self,
        business_id: i64,
        after: NaiveDateTime,
        limit: i64,
    ) -> SqliteResult<Vec<Appointment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM appointments
             WHERE business_id = ?1 AND starts_at >= ?2 AND status IN ('pending', 'confirmed')
             ORDER BY starts_at, id LIMIT ?3",
            APPOINTMENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(rusqlite::params![business_id, after, limit], Self::row_to_appointment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Intervals during which the specialist is already booked
    pub fn specialist_busy_intervals(
        &self,
        specialist_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> SqliteResult<Vec<(NaiveDateTime, NaiveDateTime)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT starts_at, ends_at FROM appointments
             WHERE specialist_id = ?1 AND status NOT IN {} AND starts_at < ?3 AND ends_at > ?2
             ORDER BY starts_at",
            FREE_STATUSES
        ))?;
        let rows = stmt
            .query_map(rusqlite::params![specialist_id, from, to], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Move an appointment from `from` to `to`. Returns false when the
    /// appointment is no longer in `from`.
    pub fn update_appointment_status(
        &self,
        business_id: i64,
        id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE appointments SET status = ?1, updated_at = ?2
             WHERE id = ?3 AND business_id = ?4 AND status = ?5",
            rusqlite::params![to.as_ref(), Utc::now(), id, business_id, from.as_ref()],
        )?;
        Ok(rows > 0)
    }

    /// Record a payment and bump `paid_amount` in one transaction.
    ///
    /// Returns `None` when the amount exceeds the outstanding balance.
    pub fn add_appointment_payment(
        &self,
        appointment_id: i64,
        amount: i64,
        method: PaymentMethod,
        paid_at: NaiveDateTime,
    ) -> SqliteResult<Option<AppointmentPayment>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE appointments SET paid_amount = paid_amount + ?1, updated_at = ?2
             WHERE id = ?3 AND paid_amount + ?1 <= total_amount",
            rusqlite::params![amount, Utc::now(), appointment_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO appointment_payments (appointment_id, amount, method, paid_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![appointment_id, amount, method.as_ref(), paid_at],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Some(AppointmentPayment {
            id,
            appointment_id,
            amount,
            method,
            paid_at,
        }))
    }

    pub fn list_appointment_payments(&self, appointment_id: i64) -> SqliteResult<Vec<AppointmentPayment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, appointment_id, amount, method, paid_at FROM appointment_payments
             WHERE appointment_id = ?1 ORDER BY paid_at, id",
        )?;
        let rows = stmt
            .query_map([appointment_id], |row| {
                Ok(AppointmentPayment {
                    id: row.get(0)?,
                    appointment_id: row.get(1)?,
                    amount: row.get(2)?,
                    method: parse_enum(3, row.get(3)?)?,
                    paid_at: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Sum of payments received in `[from, to)`
    pub fn sum_payments(
        &self,
        business_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
        specialist_id: Option<i64>,
    ) -> SqliteResult<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COALESCE(SUM(p.amount), 0) FROM appointment_payments p
             JOIN appointments a ON a.id = p.appointment_id
             WHERE a.business_id = ?1 AND p.paid_at >= ?2 AND p.paid_at < ?3
               AND (?4 IS NULL OR a.specialist_id = ?4)",
            rusqlite::params![business_id, from, to, specialist_id],
            |row| row.get(0),
        )
    }

    /// Completed appointments starting in `[from, to)`
    pub fn count_completed_appointments(
        &self,
        business_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
        specialist_id: Option<i64>,
    ) -> SqliteResult<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM appointments
             WHERE business_id = ?1 AND status = 'completed' AND starts_at >= ?2 AND starts_at < ?3
               AND (?4 IS NULL OR specialist_id = ?4)",
            rusqlite::params![business_id, from, to, specialist_id],
            |row| row.get(0),
        )
    }

    /// Confirmed appointments starting in `[from, to)` that have not been reminded yet
    pub fn due_reminders(&self, from: NaiveDateTime, to: NaiveDateTime) -> SqliteResult<Vec<DueReminder>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT a.id, a.business_id, b.name, b.whatsapp_phone_number_id, c.full_name, c.phone,
                    sv.name, sp.name, a.starts_at
             FROM appointments a
             JOIN businesses b ON b.id = a.business_id
             JOIN clients c ON c.id = a.client_id
             JOIN services sv ON sv.id = a.service_id
             JOIN specialists sp ON sp.id = a.specialist_id
             WHERE a.status = 'confirmed' AND a.reminder_sent = 0
               AND a.starts_at >= ?1 AND a.starts_at < ?2
               AND b.whatsapp_phone_number_id IS NOT NULL
               AND c.phone GLOB '*[0-9]*'
             ORDER BY a.starts_at",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![from, to], |row| {
                Ok(DueReminder {
                    appointment_id: row.get(0)?,
                    business_id: row.get(1)?,
                    business_name: row.get(2)?,
                    phone_number_id: row.get(3)?,
                    client_name: row.get(4)?,
                    client_phone: row.get(5)?,
                    service_name: row.get(6)?,
                    specialist_name: row.get(7)?,
                    starts_at: row.get(8)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn mark_reminder_sent(&self, appointment_id: i64) -> SqliteResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE appointments SET reminder_sent = 1 WHERE id = ?1",
            [appointment_id],
        )?;
        Ok(())
    }

    fn row_to_appointment(row: &Row) -> SqliteResult<Appointment> {
        Ok(Appointment {
            id: row.get(0)?,
            business_id: row.get(1)?,
            client_id: row.get(2)?,
            specialist_id: row.get(3)?,
            service_id: row.get(4)?,
            starts_at: row.get(5)?,
            ends_at: row.get(6)?,
            status: parse_enum(7, row.get(7)?)?,
            total_amount: row.get(8)?,
            paid_amount: row.get(9)?,
            notes: row.get(10)?,
            reminder_sent: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{seeded_db, Seed};
    use chrono::{Duration, NaiveDate};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn booking(seed: &Seed, start: NaiveDateTime) -> NewAppointment<'static> {
        NewAppointment {
            business_id: seed.business_id,
            client_id: seed.client_id,
            specialist_id: seed.specialist_id,
            service_id: seed.service_id,
            starts_at: start,
            ends_at: start + Duration::minutes(60),
            total_amount: 5_000_000,
            notes: None,
        }
    }

    #[test]
    fn test_overlapping_booking_rejected() {
        let (db, seed) = seeded_db();
        let first = db.create_appointment_if_free(&booking(&seed, at(10, 0))).unwrap();
        assert!(first.is_some());

        assert!(db.create_appointment_if_free(&booking(&seed, at(10, 30))).unwrap().is_none());
        // Back-to-back is fine
        assert!(db.create_appointment_if_free(&booking(&seed, at(11, 0))).unwrap().is_some());
    }

    #[test]
    fn test_cancelled_slot_is_free_again() {
        let (db, seed) = seeded_db();
        let appt = db.create_appointment_if_free(&booking(&seed, at(10, 0))).unwrap().unwrap();
        assert!(db
            .update_appointment_status(
                seed.business_id,
                appt.id,
                AppointmentStatus::Pending,
                AppointmentStatus::Cancelled
            )
            .unwrap());

        assert!(db.create_appointment_if_free(&booking(&seed, at(10, 0))).unwrap().is_some());
        assert_eq!(
            db.specialist_busy_intervals(seed.specialist_id, at(0, 0), at(23, 0))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_status_update_is_conditional() {
        let (db, seed) = seeded_db();
        let appt = db.create_appointment_if_free(&booking(&seed, at(10, 0))).unwrap().unwrap();
        assert!(!db
            .update_appointment_status(
                seed.business_id,
                appt.id,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed
            )
            .unwrap());
    }

    #[test]
    fn test_payments_cannot_exceed_total() {
        let (db, seed) = seeded_db();
        let appt = db.create_appointment_if_free(&booking(&seed, at(10, 0))).unwrap().unwrap();

        let paid = db
            .add_appointment_payment(appt.id, 2_000_000, PaymentMethod::Cash, at(10, 5))
            .unwrap();
        assert!(paid.is_some());
        assert!(db
            .add_appointment_payment(appt.id, 3_000_001, PaymentMethod::Card, at(10, 6))
            .unwrap()
            .is_none());

        let appt = db.get_appointment(seed.business_id, appt.id).unwrap().unwrap();
        assert_eq!(appt.paid_amount, 2_000_000);
        assert_eq!(appt.balance(), 3_000_000);
        assert_eq!(db.list_appointment_payments(appt.id).unwrap().len(), 1);
        assert_eq!(
            db.sum_payments(seed.business_id, at(0, 0), at(23, 0), None).unwrap(),
            2_000_000
        );
        assert_eq!(
            db.sum_payments(seed.business_id, at(0, 0), at(23, 0), Some(seed.specialist_id + 1))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_due_reminders_only_confirmed() {
        let (db, seed) = seeded_db();
        let pending = db.create_appointment_if_free(&booking(&seed, at(10, 0))).unwrap().unwrap();
        let confirmed = db.create_appointment_if_free(&booking(&seed, at(12, 0))).unwrap().unwrap();
        db.update_appointment_status(
            seed.business_id,
            confirmed.id,
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
        )
        .unwrap();

        let due = db.due_reminders(at(0, 0), at(23, 0)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].appointment_id, confirmed.id);
        assert_ne!(due[0].appointment_id, pending.id);
        assert_eq!(due[0].phone_number_id, "1098765");

        db.mark_reminder_sent(confirmed.id).unwrap();
        assert!(db.due_reminders(at(0, 0), at(23, 0)).unwrap().is_empty());
    }
}
