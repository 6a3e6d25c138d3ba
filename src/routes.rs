//! HTTP route table.

use crate::{
    auth::{api as account_api, require_auth, AccountsState},
    middleware::request_logging,
};
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

/// Build the full application router
pub fn build_router(state: AccountsState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(account_api::register))
        .route("/login", post(account_api::login));

    let protected_routes = Router::new()
        .route("/details", get(account_api::details))
        .route("/update-password", patch(account_api::update_password))
        .route("/delete-account", delete(account_api::delete_account))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    let users = public_routes.merge(protected_routes).with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/users", users)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
