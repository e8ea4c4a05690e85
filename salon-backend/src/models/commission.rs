use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommissionKind {
    /// `value` is in basis points (4000 = 40%)
    Percentage,
    /// `value` is a flat amount in cents per completed service
    Fixed,
}

/// How much a specialist earns per completed service.
///
/// A config with no `specialist_id` is the business-wide default; a
/// specialist-specific config overrides it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionConfig {
    pub id: i64,
    pub business_id: i64,
    pub specialist_id: Option<i64>,
    pub kind: CommissionKind,
    pub value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommissionConfig {
    pub fn is_global(&self) -> bool {
        self.specialist_id.is_none()
    }

    /// Commission earned on `base_amount` cents
    pub fn calculate(&self, base_amount: i64) -> i64 {
        calculate_commission(self.kind, self.value, base_amount)
    }
}

pub fn calculate_commission(kind: CommissionKind, value: i64, base_amount: i64) -> i64 {
    match kind {
        CommissionKind::Percentage => {
            let raw = base_amount.max(0) as i128 * value as i128;
            ((raw + 5_000) / 10_000) as i64
        }
        CommissionKind::Fixed => value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    pub id: i64,
    pub business_id: i64,
    pub specialist_id: i64,
    pub appointment_id: i64,
    pub base_amount: i64,
    pub amount: i64,
    pub status: CommissionStatus,
    /// Start time of the appointment the commission was earned on
    pub earned_at: NaiveDateTime,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionSummary {
    pub specialist_id: i64,
    pub specialist_name: String,
    pub services: i64,
    pub pending_amount: i64,
    pub paid_amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_commission_rounds() {
        assert_eq!(calculate_commission(CommissionKind::Percentage, 4_000, 50_000), 20_000);
        // 33.33% of 100 cents = 33.33 -> 33
        assert_eq!(calculate_commission(CommissionKind::Percentage, 3_333, 100), 33);
        // 50% of 1 cent rounds up
        assert_eq!(calculate_commission(CommissionKind::Percentage, 5_000, 1), 1);
    }

    #[test]
    fn test_fixed_commission_ignores_base() {
        assert_eq!(calculate_commission(CommissionKind::Fixed, 15_000, 80_000), 15_000);
        assert_eq!(calculate_commission(CommissionKind::Fixed, 15_000, 0), 15_000);
    }
}
