use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

pub fn payment_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/phone", get(handlers::get_payment_phone));

    let protected_routes = Router::new()
        .route("/submit", post(handlers::submit_payment))
        .route("/pending", get(handlers::get_pending_payments))
        .route("/history", get(handlers::get_payment_history))
        .route("/{payment_id}/verify", patch(handlers::verify_payment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
