use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::domain::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GoalMetric {
    /// Sum of payments received, in cents
    Revenue,
    /// Number of completed appointments
    Appointments,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub business_id: i64,
    pub specialist_id: Option<i64>,
    pub metric: GoalMetric,
    pub period: Period,
    pub target: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalProgress {
    pub goal: Goal,
    pub current: i64,
    pub progress: u8,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
}
