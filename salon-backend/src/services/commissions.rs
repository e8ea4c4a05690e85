//! Commission rules and accrual on completed appointments

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Appointment, Business, Commission, CommissionConfig, CommissionKind};

pub const MAX_PERCENTAGE_BPS: i64 = 10_000;

pub fn set_config(
    db: &Database,
    business: &Business,
    specialist_id: Option<i64>,
    kind: CommissionKind,
    value: i64,
) -> AppResult<CommissionConfig> {
    match kind {
        CommissionKind::Percentage if !(0..=MAX_PERCENTAGE_BPS).contains(&value) => {
            return Err(AppError::validation(
                "Percentage commissions must be between 0 and 10000 basis points",
            ));
        }
        CommissionKind::Fixed if value < 0 => {
            return Err(AppError::validation("Fixed commissions cannot be negative"));
        }
        _ => {}
    }

    if let Some(id) = specialist_id {
        db.get_specialist(business.id, id)?
            .ok_or_else(|| AppError::not_found("Specialist"))?;
    }

    Ok(db.upsert_commission_config(business.id, specialist_id, kind, value)?)
}

/// Accrue the commission for a completed appointment. `None` when no
/// config applies to the specialist.
pub fn accrue_for_appointment(db: &Database, appointment: &Appointment) -> AppResult<Option<Commission>> {
    let Some(config) = db.resolve_commission_config(appointment.business_id, appointment.specialist_id)? else {
        log::debug!(
            "[COMMISSIONS] No config for specialist {}, skipping appointment {}",
            appointment.specialist_id,
            appointment.id
        );
        return Ok(None);
    };

    let base = appointment.total_amount;
    let amount = config.calculate(base);
    let commission = db.accrue_commission(
        appointment.business_id,
        appointment.specialist_id,
        appointment.id,
        base,
        amount,
        appointment.starts_at,
    )?;
    Ok(Some(commission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;

    #[test]
    fn test_config_bounds() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        assert!(set_config(&db, &business, None, CommissionKind::Percentage, 10_001).is_err());
        assert!(set_config(&db, &business, None, CommissionKind::Fixed, -1).is_err());
        assert!(matches!(
            set_config(&db, &business, Some(999), CommissionKind::Fixed, 100),
            Err(AppError::NotFound(_))
        ));
        let config = set_config(&db, &business, Some(seed.specialist_id), CommissionKind::Percentage, 4_000).unwrap();
        assert!(!config.is_global());
    }
}
