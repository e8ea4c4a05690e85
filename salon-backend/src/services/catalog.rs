//! Specialists and services on a business menu

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Business, Service, ServiceInput, Specialist, SpecialistInput};
use crate::services::businesses::usable_subscription;

fn validate_specialist(input: &SpecialistInput) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("Specialist name is required"));
    }
    Ok(())
}

fn validate_service(input: &ServiceInput) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("Service name is required"));
    }
    if input.duration_minutes <= 0 {
        return Err(AppError::validation("Duration must be greater than zero"));
    }
    if input.price < 0 {
        return Err(AppError::validation("Price cannot be negative"));
    }
    Ok(())
}

/// Active specialists are capped by the plan
fn check_specialist_limit(db: &Database, business: &Business) -> AppResult<()> {
    let subscription = usable_subscription(db, business.account_id)?;
    if let Some(limit) = subscription.plan.max_specialists() {
        if db.count_active_specialists(business.id)? >= limit {
            return Err(AppError::forbidden(format!(
                "The {} plan allows up to {} active specialists per business",
                subscription.plan.label(),
                limit
            )));
        }
    }
    Ok(())
}

pub fn create_specialist(db: &Database, business: &Business, input: &SpecialistInput) -> AppResult<Specialist> {
    validate_specialist(input)?;
    if input.is_active {
        check_specialist_limit(db, business)?;
    }
    Ok(db.create_specialist(business.id, input)?)
}

pub fn update_specialist(
    db: &Database,
    business: &Business,
    specialist_id: i64,
    input: &SpecialistInput,
) -> AppResult<Specialist> {
    validate_specialist(input)?;
    let current = db
        .get_specialist(business.id, specialist_id)?
        .ok_or_else(|| AppError::not_found("Specialist"))?;
    if input.is_active && !current.is_active {
        check_specialist_limit(db, business)?;
    }
    db.update_specialist(business.id, specialist_id, input)?
        .ok_or_else(|| AppError::not_found("Specialist"))
}

pub fn create_service(db: &Database, business: &Business, input: &ServiceInput) -> AppResult<Service> {
    validate_service(input)?;
    Ok(db.create_service(business.id, input)?)
}

pub fn update_service(
    db: &Database,
    business: &Business,
    service_id: i64,
    input: &ServiceInput,
) -> AppResult<Service> {
    validate_service(input)?;
    db.update_service(business.id, service_id, input)?
        .ok_or_else(|| AppError::not_found("Service"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;

    fn specialist(name: &str) -> SpecialistInput {
        SpecialistInput {
            name: name.to_string(),
            phone: None,
            email: None,
            is_active: true,
        }
    }

    #[test]
    fn test_basic_plan_caps_specialists() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        // Seed already has one
        create_specialist(&db, &business, &specialist("Two")).unwrap();
        create_specialist(&db, &business, &specialist("Three")).unwrap();
        let err = create_specialist(&db, &business, &specialist("Four")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let mut inactive = specialist("Four");
        inactive.is_active = false;
        assert!(create_specialist(&db, &business, &inactive).is_ok());
    }

    #[test]
    fn test_service_validation() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        let input = ServiceInput {
            name: "Corte".to_string(),
            duration_minutes: 0,
            price: 100,
            is_active: true,
        };
        assert!(matches!(
            create_service(&db, &business, &input),
            Err(AppError::Validation(_))
        ));
    }
}
