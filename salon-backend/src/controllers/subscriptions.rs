use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::domain::{format_currency, Currency};
use crate::error::{ok, AppError};
use crate::middleware::AuthContext;
use crate::models::Plan;
use crate::services::subscriptions;
use crate::AppState;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    plan: Plan,
}

#[derive(Serialize)]
struct PlanInfo {
    plan: Plan,
    label: &'static str,
    monthly_price: i64,
    monthly_price_formatted: String,
    max_businesses: i64,
    max_specialists: Option<i64>,
}

impl From<Plan> for PlanInfo {
    fn from(plan: Plan) -> Self {
        Self {
            plan,
            label: plan.label(),
            monthly_price: plan.monthly_price(),
            monthly_price_formatted: format_currency(plan.monthly_price(), Currency::Cop),
            max_businesses: plan.max_businesses(),
            max_specialists: plan.max_specialists(),
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/plans").route(web::get().to(list_plans)));
    cfg.service(
        web::scope("/api/subscription")
            .route("", web::get().to(get_subscription))
            .route("/checkout", web::post().to(checkout))
            .route("/cancel", web::post().to(cancel)),
    );
}

async fn list_plans() -> HttpResponse {
    ok(Plan::all().iter().copied().map(PlanInfo::from).collect::<Vec<_>>())
}

async fn get_subscription(state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, AppError> {
    let subscription = state
        .db
        .get_subscription(auth.account_id)?
        .ok_or_else(|| AppError::not_found("Subscription"))?;
    let payments = state.db.list_subscription_payments(auth.account_id)?;
    Ok(ok(serde_json::json!({
        "subscription": subscription,
        "plan": PlanInfo::from(subscription.plan),
        "payments": payments,
    })))
}

async fn checkout(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_owner()?;
    let gateway = state.gateway()?;
    let user = state
        .db
        .get_user(auth.user_id)?
        .ok_or_else(|| AppError::not_found("User"))?;
    let session = subscriptions::checkout(
        &state.db,
        gateway,
        auth.account_id,
        body.plan,
        &user.email,
        &state.config.payment_back_url,
    )
    .await?;
    Ok(ok(session))
}

async fn cancel(state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, AppError> {
    auth.require_owner()?;
    let gateway = state.gateway()?;
    Ok(ok(subscriptions::cancel(&state.db, gateway, auth.account_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;
    use crate::testing::{bearer, owner_token, FakeGateway, StateBuilder};
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_checkout_returns_init_point() {
        let (db, seed) = seeded_db();
        let token = owner_token(&db, &seed);
        let state = StateBuilder::new(db).gateway(Arc::new(FakeGateway::default())).build();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/subscription/checkout")
            .insert_header(bearer(&token))
            .set_json(json!({"plan": "professional"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["init_point"], "https://gateway.test/checkout/pre-1");

        let req = test::TestRequest::get()
            .uri("/api/subscription")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["subscription"]["plan"], "professional");
        assert_eq!(body["data"]["subscription"]["gateway_subscription_id"], "pre-1");
    }

    #[actix_web::test]
    async fn test_checkout_without_gateway_is_bad_gateway() {
        let (db, seed) = seeded_db();
        let token = owner_token(&db, &seed);
        let state = StateBuilder::new(db).build();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/subscription/checkout")
            .insert_header(bearer(&token))
            .set_json(json!({"plan": "basic"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 502);
    }

    #[actix_web::test]
    async fn test_plans_are_public() {
        let app = test::init_service(App::new().configure(config)).await;
        let req = test::TestRequest::get().uri("/api/plans").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["monthly_price_formatted"], "$ 49.900");
        assert!(body["data"][2]["max_specialists"].is_null());
    }
}
