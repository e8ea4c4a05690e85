//! Goal progress and the business dashboard summary

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::db::Database;
use crate::domain::periods::period_bounds;
use crate::domain::{calculate_goal_progress, format_currency, period_range, Period};
use crate::error::{AppError, AppResult};
use crate::models::{AppointmentView, Business, Goal, GoalMetric, GoalProgress};

pub const UPCOMING_LIMIT: i64 = 5;

#[derive(Debug, Serialize)]
pub struct Amount {
    pub cents: i64,
    pub formatted: String,
}

impl Amount {
    fn new(cents: i64, business: &Business) -> Self {
        Self {
            cents,
            formatted: format_currency(cents, business.currency),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub appointments_today: usize,
    pub revenue_today: Amount,
    pub revenue_month: Amount,
    pub outstanding_today: Amount,
    pub pending_commissions: Amount,
    pub low_stock_products: usize,
    pub goals: Vec<GoalProgress>,
    pub upcoming: Vec<AppointmentView>,
}

pub fn create_goal(
    db: &Database,
    business: &Business,
    specialist_id: Option<i64>,
    metric: GoalMetric,
    period: Period,
    target: i64,
) -> AppResult<Goal> {
    if target < 0 {
        return Err(AppError::validation("Goal target cannot be negative"));
    }
    if let Some(id) = specialist_id {
        db.get_specialist(business.id, id)?
            .ok_or_else(|| AppError::not_found("Specialist"))?;
    }
    Ok(db.create_goal(business.id, specialist_id, metric, period, target)?)
}

/// Current value of the goal's metric over the period containing `date`
pub fn goal_progress(db: &Database, goal: &Goal, date: NaiveDate) -> AppResult<GoalProgress> {
    let (start, end) = period_bounds(goal.period, date);
    let current = match goal.metric {
        GoalMetric::Revenue => db.sum_payments(goal.business_id, start, end, goal.specialist_id)?,
        GoalMetric::Appointments => {
            db.count_completed_appointments(goal.business_id, start, end, goal.specialist_id)?
        }
    };
    let (range_start, range_end) = period_range(goal.period, date);

    Ok(GoalProgress {
        goal: goal.clone(),
        current,
        progress: calculate_goal_progress(current, goal.target),
        range_start,
        range_end,
    })
}

pub fn dashboard(db: &Database, business: &Business, date: NaiveDate, now: NaiveDateTime) -> AppResult<Dashboard> {
    let day_start = date.and_time(NaiveTime::MIN);
    let day_end = day_start + Duration::days(1);
    let (month_start, month_end) = period_bounds(Period::Monthly, date);

    let today = db.list_appointments(business.id, day_start, day_end, None)?;
    let active_today: Vec<_> = today.iter().filter(|a| a.status.blocks_schedule()).collect();
    let outstanding: i64 = active_today.iter().map(|a| a.balance().max(0)).sum();

    let goals = db
        .list_goals(business.id)?
        .iter()
        .map(|goal| goal_progress(db, goal, date))
        .collect::<AppResult<Vec<_>>>()?;

    let upcoming = db
        .upcoming_appointments(business.id, now, UPCOMING_LIMIT)?
        .into_iter()
        .map(AppointmentView::from)
        .collect();

    Ok(Dashboard {
        date,
        appointments_today: active_today.len(),
        revenue_today: Amount::new(db.sum_payments(business.id, day_start, day_end, None)?, business),
        revenue_month: Amount::new(db.sum_payments(business.id, month_start, month_end, None)?, business),
        outstanding_today: Amount::new(outstanding, business),
        pending_commissions: Amount::new(db.pending_commissions_total(business.id)?, business),
        low_stock_products: db.list_low_stock_products(business.id)?.len(),
        goals,
        upcoming,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;
    use crate::models::{AppointmentStatus, PaymentMethod};
    use crate::services::appointments::{book, change_status, record_payment, BookingRequest};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn test_dashboard_totals_and_goals() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        let now = at(5, 8);
        let booking = |hour| BookingRequest {
            client_id: seed.client_id,
            specialist_id: seed.specialist_id,
            service_id: seed.service_id,
            starts_at: at(5, hour),
            notes: None,
        };

        let first = book(&db, &business, &booking(10), now).unwrap();
        let second = book(&db, &business, &booking(12), now).unwrap();
        record_payment(&db, &business, first.id, 5_000_000, PaymentMethod::Cash, at(5, 11)).unwrap();
        change_status(&db, &business, first.id, AppointmentStatus::Confirmed).unwrap();
        change_status(&db, &business, first.id, AppointmentStatus::Completed).unwrap();
        change_status(&db, &business, second.id, AppointmentStatus::Cancelled).unwrap();

        create_goal(&db, &business, None, GoalMetric::Revenue, Period::Monthly, 10_000_000).unwrap();
        create_goal(&db, &business, None, GoalMetric::Appointments, Period::Daily, 4).unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let summary = dashboard(&db, &business, date, now).unwrap();
        assert_eq!(summary.appointments_today, 1);
        assert_eq!(summary.revenue_today.cents, 5_000_000);
        assert_eq!(summary.revenue_today.formatted, "$ 50.000");
        assert_eq!(summary.outstanding_today.cents, 0);
        assert_eq!(summary.goals[0].progress, 50);
        assert_eq!(summary.goals[0].range_start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(summary.goals[1].current, 1);
        assert_eq!(summary.goals[1].progress, 25);
        assert!(summary.upcoming.is_empty());
    }

    #[test]
    fn test_negative_target_rejected() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        assert!(create_goal(&db, &business, None, GoalMetric::Revenue, Period::Weekly, -1).is_err());
    }
}
