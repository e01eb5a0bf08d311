use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn review_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/doctor/{doctor_id}", get(handlers::list_doctor_reviews));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_review))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
