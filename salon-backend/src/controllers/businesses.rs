use actix_web::{web, HttpResponse};

use crate::error::{created, ok, AppError, ApiResponse};
use crate::middleware::AuthContext;
use crate::models::BusinessInput;
use crate::services::businesses;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/businesses")
            .route(web::get().to(list_businesses))
            .route(web::post().to(create_business)),
    );
    cfg.service(
        web::resource("/api/businesses/{business_id}")
            .route(web::get().to(get_business))
            .route(web::put().to(update_business))
            .route(web::delete().to(delete_business)),
    );
}

async fn list_businesses(state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, AppError> {
    Ok(ok(state.db.list_businesses(auth.account_id)?))
}

async fn create_business(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<BusinessInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = businesses::create_business(&state.db, auth.account_id, &body)?;
    Ok(created(business))
}

async fn get_business(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(ok(businesses::require_business(&state.db, auth.account_id, path.into_inner())?))
}

async fn update_business(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<BusinessInput>,
) -> Result<HttpResponse, AppError> {
    auth.require_manager()?;
    let business = businesses::update_business(&state.db, auth.account_id, path.into_inner(), &body)?;
    Ok(ok(business))
}

async fn delete_business(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    auth.require_owner()?;
    businesses::delete_business(&state.db, auth.account_id, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;
    use crate::testing::{bearer, owner_token, seeded_state, StateBuilder};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_basic_plan_allows_one_business() {
        let (state, _seed, token) = seeded_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/businesses")
            .insert_header(bearer(&token))
            .set_json(json!({"name": "Glow Norte", "opening_time": "08:00:00", "closing_time": "18:00:00"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn test_other_tenant_business_is_not_found() {
        let (db, seed) = seeded_db();
        let token = owner_token(&db, &seed);
        let (other_account, _) = db
            .create_account_with_owner("Other", "Bob", "bob@other.co", "hash", chrono::Utc::now())
            .unwrap();
        let other = db
            .create_business(other_account.id, &crate::db::test_support::business_input("Other Spa"))
            .unwrap();
        let state = StateBuilder::new(db).build();
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/businesses/{}", other.id))
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::get()
            .uri(&format!("/api/businesses/{}", seed.business_id))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["name"], "Glow Centro");
    }
}
