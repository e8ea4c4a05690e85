//! Locations under an account, plan limits and tenant scoping

use chrono::Utc;

use crate::db::tables::is_constraint_violation;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Business, BusinessInput, Subscription};

/// Resolve a business id from a path, scoped to the caller's account.
/// Businesses of other tenants are reported as missing.
pub fn require_business(db: &Database, account_id: i64, business_id: i64) -> AppResult<Business> {
    db.get_account_business(account_id, business_id)?
        .ok_or_else(|| AppError::not_found("Business"))
}

/// The account's subscription, provided it currently grants access
pub fn usable_subscription(db: &Database, account_id: i64) -> AppResult<Subscription> {
    let subscription = db
        .get_subscription(account_id)?
        .ok_or_else(|| AppError::forbidden("No subscription found for this account"))?;
    if !subscription.is_usable(Utc::now()) {
        return Err(AppError::forbidden(
            "Your subscription is not active. Please update your billing details",
        ));
    }
    Ok(subscription)
}

fn validate(input: &BusinessInput) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("Business name is required"));
    }
    if input.opening_time >= input.closing_time {
        return Err(AppError::validation("Opening time must be before closing time"));
    }
    if input
        .whatsapp_phone_number_id
        .as_deref()
        .is_some_and(|id| id.trim().is_empty() || !id.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(AppError::validation("WhatsApp phone number id must be numeric"));
    }
    Ok(())
}

fn map_unique(e: rusqlite::Error) -> AppError {
    if is_constraint_violation(&e) {
        AppError::conflict("This WhatsApp number is already linked to another business")
    } else {
        e.into()
    }
}

pub fn create_business(db: &Database, account_id: i64, input: &BusinessInput) -> AppResult<Business> {
    validate(input)?;
    let subscription = usable_subscription(db, account_id)?;

    let existing = db.count_businesses(account_id)?;
    let limit = subscription.plan.max_businesses();
    if existing >= limit {
        return Err(AppError::forbidden(format!(
            "The {} plan allows up to {} business(es). Upgrade to add more",
            subscription.plan.label(),
            limit
        )));
    }

    let business = db.create_business(account_id, input).map_err(map_unique)?;
    log::info!("[BUSINESS] Created business {} for account {}", business.id, account_id);
    Ok(business)
}

pub fn update_business(
    db: &Database,
    account_id: i64,
    business_id: i64,
    input: &BusinessInput,
) -> AppResult<Business> {
    validate(input)?;
    require_business(db, account_id, business_id)?;
    db.update_business(business_id, input)
        .map_err(map_unique)?
        .ok_or_else(|| AppError::not_found("Business"))
}

pub fn delete_business(db: &Database, account_id: i64, business_id: i64) -> AppResult<()> {
    require_business(db, account_id, business_id)?;
    db.delete_business(business_id)?;
    log::info!("[BUSINESS] Deleted business {}", business_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{business_input, seeded_db};
    use crate::models::SubscriptionStatus;

    #[test]
    fn test_basic_plan_allows_one_business() {
        let (db, seed) = seeded_db();
        let err = create_business(&db, seed.account_id, &business_input("Second")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_inactive_subscription_blocks_creation() {
        let (db, seed) = seeded_db();
        db.delete_business(seed.business_id).unwrap();
        db.set_subscription_status(seed.account_id, SubscriptionStatus::Cancelled)
            .unwrap();
        let err = create_business(&db, seed.account_id, &business_input("Again")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_hours_must_be_ordered() {
        let (db, seed) = seeded_db();
        db.delete_business(seed.business_id).unwrap();
        let mut input = business_input("Night owl");
        input.closing_time = input.opening_time;
        assert!(matches!(
            create_business(&db, seed.account_id, &input),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_other_tenants_business_is_not_found() {
        let (db, seed) = seeded_db();
        assert!(matches!(
            require_business(&db, seed.account_id + 1, seed.business_id),
            Err(AppError::NotFound(_))
        ));
        assert!(require_business(&db, seed.account_id, seed.business_id).is_ok());
    }
}
