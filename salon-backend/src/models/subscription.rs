use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Plan {
    Basic,
    Professional,
    Enterprise,
}

impl Plan {
    /// Monthly price in COP cents
    pub fn monthly_price(&self) -> i64 {
        match self {
            Plan::Basic => 4_990_000,
            Plan::Professional => 9_990_000,
            Plan::Enterprise => 19_990_000,
        }
    }

    pub fn max_businesses(&self) -> i64 {
        match self {
            Plan::Basic => 1,
            Plan::Professional => 3,
            Plan::Enterprise => 10,
        }
    }

    /// Active specialists allowed per business; `None` means unlimited
    pub fn max_specialists(&self) -> Option<i64> {
        match self {
            Plan::Basic => Some(3),
            Plan::Professional => Some(15),
            Plan::Enterprise => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Plan::Basic => "Basic",
            Plan::Professional => "Professional",
            Plan::Enterprise => "Enterprise",
        }
    }

    pub fn all() -> &'static [Plan] {
        &[Plan::Basic, Plan::Professional, Plan::Enterprise]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub account_id: i64,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    /// Preapproval id at the payment gateway
    pub gateway_subscription_id: Option<String>,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the account may keep using paid features
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trialing => now < self.current_period_end,
            SubscriptionStatus::PastDue | SubscriptionStatus::Cancelled => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPayment {
    pub id: i64,
    pub account_id: i64,
    pub gateway_payment_id: String,
    pub amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscription(status: SubscriptionStatus, ends_in_days: i64) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: 1,
            account_id: 1,
            plan: Plan::Basic,
            status,
            gateway_subscription_id: None,
            current_period_end: now + Duration::days(ends_in_days),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_trial_expires() {
        let now = Utc::now();
        assert!(subscription(SubscriptionStatus::Trialing, 3).is_usable(now));
        assert!(!subscription(SubscriptionStatus::Trialing, -1).is_usable(now));
    }

    #[test]
    fn test_status_gates_access() {
        let now = Utc::now();
        assert!(subscription(SubscriptionStatus::Active, -10).is_usable(now));
        assert!(!subscription(SubscriptionStatus::PastDue, 10).is_usable(now));
        assert!(!subscription(SubscriptionStatus::Cancelled, 10).is_usable(now));
    }

    #[test]
    fn test_plan_limits() {
        assert_eq!(Plan::Basic.max_businesses(), 1);
        assert_eq!(Plan::Enterprise.max_specialists(), None);
        assert_eq!("professional".parse::<Plan>().unwrap(), Plan::Professional);
    }
}
