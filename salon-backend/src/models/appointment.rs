use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
        )
    }

    /// Statuses that still hold the specialist's time
    pub fn blocks_schedule(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub business_id: i64,
    pub client_id: i64,
    pub specialist_id: i64,
    pub service_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub status: AppointmentStatus,
    /// Amounts in cents
    pub total_amount: i64,
    pub paid_amount: i64,
    pub notes: Option<String>,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn balance(&self) -> i64 {
        self.total_amount - self.paid_amount
    }

    pub fn payment_status(&self) -> PaymentStatus {
        if self.paid_amount <= 0 {
            PaymentStatus::Unpaid
        } else if self.paid_amount < self.total_amount {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }
}

/// Appointment plus the derived billing fields sent to clients
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub balance: i64,
    pub payment_status: PaymentStatus,
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        Self {
            balance: appointment.balance(),
            payment_status: appointment.payment_status(),
            appointment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentPayment {
    pub id: i64,
    pub appointment_id: i64,
    pub amount: i64,
    pub method: PaymentMethod,
    pub paid_at: NaiveDateTime,
}

/// A confirmed appointment that is due for a WhatsApp reminder
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub appointment_id: i64,
    pub business_id: i64,
    pub business_name: String,
    pub phone_number_id: String,
    pub client_name: String,
    pub client_phone: String,
    pub service_name: String,
    pub specialist_name: String,
    pub starts_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn appointment(total: i64, paid: i64) -> Appointment {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        Appointment {
            id: 1,
            business_id: 1,
            client_id: 1,
            specialist_id: 1,
            service_id: 1,
            starts_at: start,
            ends_at: start + chrono::Duration::minutes(30),
            status: AppointmentStatus::Confirmed,
            total_amount: total,
            paid_amount: paid,
            notes: None,
            reminder_sent: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_balance_is_total_minus_paid() {
        assert_eq!(appointment(50_000, 20_000).balance(), 30_000);
        assert_eq!(appointment(50_000, 50_000).balance(), 0);
    }

    #[test]
    fn test_payment_status() {
        assert_eq!(appointment(50_000, 0).payment_status(), PaymentStatus::Unpaid);
        assert_eq!(appointment(50_000, 1).payment_status(), PaymentStatus::Partial);
        assert_eq!(appointment(50_000, 50_000).payment_status(), PaymentStatus::Paid);
        assert_eq!(appointment(0, 0).payment_status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_status_transitions() {
        use AppointmentStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(Cancelled.is_terminal());
        assert!(!NoShow.blocks_schedule());
        assert!(Pending.blocks_schedule());
    }

    #[test]
    fn test_view_flattens_fields() {
        let view: AppointmentView = appointment(10_000, 2_500).into();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["balance"], 7_500);
        assert_eq!(json["payment_status"], "partial");
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["total_amount"], 10_000);
    }
}
