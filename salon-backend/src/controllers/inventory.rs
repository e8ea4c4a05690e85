use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{created, ok, AppError};
use crate::middleware::AuthContext;
use crate::models::{MovementKind, ProductInput};
use crate::services::{businesses::require_business, inventory};
use crate::AppState;

const MOVEMENT_HISTORY_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct NewProductRequest {
    #[serde(flatten)]
    product: ProductInput,
    #[serde(default)]
    initial_stock: i64,
}

#[derive(Deserialize)]
pub struct MovementRequest {
    kind: MovementKind,
    quantity: i64,
    reason: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/businesses/{business_id}/products")
            .route("", web::get().to(list_products))
            .route("", web::post().to(create_product))
            .route("/low-stock", web::get().to(low_stock))
            .route("/{product_id}", web::put().to(update_product))
            .route("/{product_id}/movements", web::get().to(list_movements))
            .route("/{product_id}/movements", web::post().to(move_stock)),
    );
}

async fn list_products(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_products(business.id)?))
}

async fn create_product(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<NewProductRequest>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    let product = inventory::create_product(&state.db, &business, &body.product, body.initial_stock)?;
    Ok(created(product))
}

async fn low_stock(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let business = require_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(ok(state.db.list_low_stock_products(business.id)?))
}

async fn update_product(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
    let (business_id, product_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    Ok(ok(inventory::update_product(&state.db, &business, product_id, &body)?))
}

async fn list_movements(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    let (business_id, product_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let product = state
        .db
        .get_product(business.id, product_id)?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ok(state.db.list_stock_movements(product.id, MOVEMENT_HISTORY_LIMIT)?))
}

async fn move_stock(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<(i64, i64)>,
    body: web::Json<MovementRequest>,
) -> Result<HttpResponse, AppError> {
    let (business_id, product_id) = path.into_inner();
    let business = require_business(&state.db, auth.account_id, business_id)?;
    let (product, movement) = inventory::move_stock(
        &state.db,
        &business,
        product_id,
        body.kind,
        body.quantity,
        body.reason.as_deref(),
        auth.user_id,
    )?;
    Ok(created(serde_json::json!({
        "product": product,
        "movement": movement,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, seeded_state};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_stock_out_and_low_stock() {
        let (state, seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;
        let base = format!("/api/businesses/{}/products", seed.business_id);

        let req = test::TestRequest::post()
            .uri(&base)
            .insert_header(bearer(&token))
            .set_json(json!({"name": "Esmalte rojo", "sku": "ESM-01", "price": 1_500_000, "min_stock": 2, "initial_stock": 5}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["stock"], 5);

        let req = test::TestRequest::post()
            .uri(&format!("{}/{}/movements", base, id))
            .insert_header(bearer(&token))
            .set_json(json!({"kind": "out", "quantity": 9}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::post()
            .uri(&format!("{}/{}/movements", base, id))
            .insert_header(bearer(&token))
            .set_json(json!({"kind": "out", "quantity": 3, "reason": "Uso en cabina"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["product"]["stock"], 2);
        assert_eq!(body["data"]["movement"]["resulting_stock"], 2);

        let req = test::TestRequest::get()
            .uri(&format!("{}/low-stock", base))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["sku"], "ESM-01");
    }
}
