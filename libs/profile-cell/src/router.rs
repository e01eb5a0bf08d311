use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn user_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/profile", get(handlers::get_profile).patch(handlers::update_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    // Public directory
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{user_id}", get(handlers::get_doctor));

    // Doctor self-service
    let protected_routes = Router::new()
        .route("/profile", put(handlers::update_doctor_profile))
        .route("/profile/me", get(handlers::get_own_doctor_profile))
        .route("/statistics/me", get(handlers::get_own_statistics))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
