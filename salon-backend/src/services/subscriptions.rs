//! Plan checkout, cancellation and payment-gateway notifications

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Plan, Subscription, SubscriptionStatus};
use crate::payments::{CheckoutRequest, PaymentGateway};

#[derive(Debug, Serialize)]
pub struct CheckoutSession {
    pub preapproval_id: String,
    /// Gateway page the customer is redirected to
    pub init_point: String,
}

/// What a webhook notification ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    PaymentApplied { account_id: i64 },
    /// Payment was already recorded
    Duplicate,
    StatusChanged { account_id: i64, status: SubscriptionStatus },
    Ignored(String),
}

fn require_subscription(db: &Database, account_id: i64) -> AppResult<Subscription> {
    db.get_subscription(account_id)?
        .ok_or_else(|| AppError::not_found("Subscription"))
}

pub async fn checkout(
    db: &Database,
    gateway: &dyn PaymentGateway,
    account_id: i64,
    plan: Plan,
    payer_email: &str,
    back_url: &str,
) -> AppResult<CheckoutSession> {
    require_subscription(db, account_id)?;

    let request = CheckoutRequest {
        account_id,
        plan,
        payer_email,
        back_url,
    };
    let preapproval = gateway
        .create_preapproval(&request)
        .await
        .map_err(AppError::External)?;
    let init_point = preapproval
        .init_point
        .clone()
        .ok_or_else(|| AppError::External("Gateway did not return a checkout URL".to_string()))?;

    db.set_subscription_checkout(account_id, plan, &preapproval.id)?;
    log::info!(
        "[PAYMENTS] Checkout started for account {} (plan {}, preapproval {})",
        account_id,
        plan,
        preapproval.id
    );
    Ok(CheckoutSession {
        preapproval_id: preapproval.id,
        init_point,
    })
}

pub async fn cancel(db: &Database, gateway: &dyn PaymentGateway, account_id: i64) -> AppResult<Subscription> {
    let subscription = require_subscription(db, account_id)?;
    if subscription.status == SubscriptionStatus::Cancelled {
        return Err(AppError::conflict("Subscription is already cancelled"));
    }

    if let Some(preapproval_id) = subscription.gateway_subscription_id.as_deref() {
        gateway
            .cancel_preapproval(preapproval_id)
            .await
            .map_err(AppError::External)?;
    }

    db.set_subscription_status(account_id, SubscriptionStatus::Cancelled)?;
    log::info!("[PAYMENTS] Subscription cancelled for account {}", account_id);
    require_subscription(db, account_id)
}

/// Account owning a gateway object: the external reference we set at
/// checkout, falling back to the stored preapproval id.
fn resolve_account(
    db: &Database,
    external_reference: Option<&str>,
    preapproval_id: Option<&str>,
) -> AppResult<Option<i64>> {
    if let Some(account_id) = external_reference.and_then(|r| r.trim().parse::<i64>().ok()) {
        if db.get_subscription(account_id)?.is_some() {
            return Ok(Some(account_id));
        }
    }
    match preapproval_id {
        Some(id) => Ok(db.get_subscription_by_gateway_id(id)?.map(|s| s.account_id)),
        None => Ok(None),
    }
}

/// Apply a verified gateway notification of the given `kind` (`type` or
/// `topic` field) for the object `data_id`.
pub async fn handle_notification(
    db: &Database,
    gateway: &dyn PaymentGateway,
    kind: &str,
    data_id: &str,
    now: DateTime<Utc>,
) -> AppResult<NotificationOutcome> {
    match kind {
        "payment" => handle_payment(db, gateway, data_id, now).await,
        "subscription_preapproval" | "preapproval" => handle_preapproval(db, gateway, data_id).await,
        other => {
            log::debug!("[PAYMENTS] Ignoring notification type '{}'", other);
            Ok(NotificationOutcome::Ignored(format!("unsupported type {}", other)))
        }
    }
}

async fn handle_payment(
    db: &Database,
    gateway: &dyn PaymentGateway,
    payment_id: &str,
    now: DateTime<Utc>,
) -> AppResult<NotificationOutcome> {
    let payment = gateway.get_payment(payment_id).await.map_err(AppError::External)?;
    let Some(account_id) = resolve_account(
        db,
        payment.external_reference.as_deref(),
        payment.preapproval_id.as_deref(),
    )?
    else {
        log::warn!("[PAYMENTS] Payment {} does not match any account", payment.id);
        return Ok(NotificationOutcome::Ignored("unknown account".to_string()));
    };

    match payment.status.as_str() {
        "approved" => {
            if db.apply_approved_payment(account_id, &payment.id, payment.amount, now)? {
                log::info!(
                    "[PAYMENTS] Payment {} approved, account {} active",
                    payment.id,
                    account_id
                );
                Ok(NotificationOutcome::PaymentApplied { account_id })
            } else {
                log::info!("[PAYMENTS] Payment {} already applied", payment.id);
                Ok(NotificationOutcome::Duplicate)
            }
        }
        "rejected" | "cancelled" => {
            if !db.record_subscription_payment(account_id, &payment.id, payment.amount, &payment.status)? {
                log::info!("[PAYMENTS] Payment {} already recorded", payment.id);
                return Ok(NotificationOutcome::Duplicate);
            }
            db.set_subscription_status(account_id, SubscriptionStatus::PastDue)?;
            log::warn!(
                "[PAYMENTS] Payment {} {} for account {}",
                payment.id,
                payment.status,
                account_id
            );
            Ok(NotificationOutcome::StatusChanged {
                account_id,
                status: SubscriptionStatus::PastDue,
            })
        }
        other => Ok(NotificationOutcome::Ignored(format!("payment status {}", other))),
    }
}

async fn handle_preapproval(
    db: &Database,
    gateway: &dyn PaymentGateway,
    preapproval_id: &str,
) -> AppResult<NotificationOutcome> {
    let preapproval = gateway
        .get_preapproval(preapproval_id)
        .await
        .map_err(AppError::External)?;
    let Some(account_id) = resolve_account(
        db,
        preapproval.external_reference.as_deref(),
        Some(preapproval.id.as_str()),
    )?
    else {
        log::warn!("[PAYMENTS] Preapproval {} does not match any account", preapproval.id);
        return Ok(NotificationOutcome::Ignored("unknown account".to_string()));
    };

    let status = match preapproval.status.as_str() {
        "authorized" => SubscriptionStatus::Active,
        "paused" => SubscriptionStatus::PastDue,
        "cancelled" => SubscriptionStatus::Cancelled,
        other => return Ok(NotificationOutcome::Ignored(format!("preapproval status {}", other))),
    };

    db.set_subscription_status(account_id, status)?;
    log::info!(
        "[PAYMENTS] Preapproval {} is {}, account {} now {}",
        preapproval.id,
        preapproval.status,
        account_id,
        status
    );
    Ok(NotificationOutcome::StatusChanged { account_id, status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;
    use crate::payments::{GatewayPayment, Preapproval};
    use crate::testing::FakeGateway;

    fn payment(id: &str, status: &str, account_id: i64) -> GatewayPayment {
        GatewayPayment {
            id: id.to_string(),
            status: status.to_string(),
            amount: Plan::Basic.monthly_price(),
            external_reference: Some(account_id.to_string()),
            preapproval_id: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_stores_preapproval() {
        let (db, seed) = seeded_db();
        let gateway = FakeGateway::default();

        let session = checkout(&db, &gateway, seed.account_id, Plan::Professional, "ana@glow.co", "http://x")
            .await
            .unwrap();
        assert_eq!(session.preapproval_id, "pre-1");

        let subscription = db.get_subscription(seed.account_id).unwrap().unwrap();
        assert_eq!(subscription.plan, Plan::Professional);
        assert_eq!(subscription.gateway_subscription_id.as_deref(), Some("pre-1"));
        assert_eq!(subscription.status, SubscriptionStatus::Trialing);
    }

    #[tokio::test]
    async fn test_approved_payment_activates_once() {
        let (db, seed) = seeded_db();
        let mut gateway = FakeGateway::default();
        gateway
            .payments
            .insert("991".to_string(), payment("991", "approved", seed.account_id));
        let now = Utc::now();

        let outcome = handle_notification(&db, &gateway, "payment", "991", now).await.unwrap();
        assert_eq!(outcome, NotificationOutcome::PaymentApplied { account_id: seed.account_id });
        let subscription = db.get_subscription(seed.account_id).unwrap().unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        let end_after_first = subscription.current_period_end;

        let again = handle_notification(&db, &gateway, "payment", "991", now).await.unwrap();
        assert_eq!(again, NotificationOutcome::Duplicate);
        let subscription = db.get_subscription(seed.account_id).unwrap().unwrap();
        assert_eq!(subscription.current_period_end, end_after_first);
    }

    #[tokio::test]
    async fn test_rejected_payment_marks_past_due() {
        let (db, seed) = seeded_db();
        let mut gateway = FakeGateway::default();
        gateway
            .payments
            .insert("992".to_string(), payment("992", "rejected", seed.account_id));

        handle_notification(&db, &gateway, "payment", "992", Utc::now())
            .await
            .unwrap();
        let subscription = db.get_subscription(seed.account_id).unwrap().unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn test_replayed_rejection_keeps_later_approval() {
        let (db, seed) = seeded_db();
        let mut gateway = FakeGateway::default();
        gateway
            .payments
            .insert("1".to_string(), payment("1", "rejected", seed.account_id));
        gateway
            .payments
            .insert("2".to_string(), payment("2", "approved", seed.account_id));
        let now = Utc::now();

        handle_notification(&db, &gateway, "payment", "1", now).await.unwrap();
        handle_notification(&db, &gateway, "payment", "2", now).await.unwrap();
        let replay = handle_notification(&db, &gateway, "payment", "1", now).await.unwrap();

        assert_eq!(replay, NotificationOutcome::Duplicate);
        let subscription = db.get_subscription(seed.account_id).unwrap().unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_preapproval_resolved_by_gateway_id() {
        let (db, seed) = seeded_db();
        db.set_subscription_checkout(seed.account_id, Plan::Basic, "pre-77").unwrap();
        let mut gateway = FakeGateway::default();
        gateway.preapprovals.insert(
            "pre-77".to_string(),
            Preapproval {
                id: "pre-77".to_string(),
                status: "cancelled".to_string(),
                init_point: None,
                external_reference: None,
            },
        );

        let outcome = handle_notification(&db, &gateway, "subscription_preapproval", "pre-77", Utc::now())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            NotificationOutcome::StatusChanged {
                account_id: seed.account_id,
                status: SubscriptionStatus::Cancelled
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_ignored() {
        let (db, _seed) = seeded_db();
        let gateway = FakeGateway::default();
        let outcome = handle_notification(&db, &gateway, "plan", "1", Utc::now()).await.unwrap();
        assert!(matches!(outcome, NotificationOutcome::Ignored(_)));
    }

    #[tokio::test]
    async fn test_cancel_calls_gateway() {
        let (db, seed) = seeded_db();
        db.set_subscription_checkout(seed.account_id, Plan::Basic, "pre-5").unwrap();
        let gateway = FakeGateway::default();

        let subscription = cancel(&db, &gateway, seed.account_id).await.unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Cancelled);
        assert_eq!(gateway.cancelled.lock().as_slice(), ["pre-5".to_string()]);

        let err = cancel(&db, &gateway, seed.account_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
