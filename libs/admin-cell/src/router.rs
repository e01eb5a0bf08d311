use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::handlers;

/// Back office. Every route needs an ADMIN token.
pub fn admin_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/{id}/verify", patch(handlers::verify_user))
        .route("/analytics", get(handlers::analytics))
        .route("/bookings", get(handlers::list_bookings))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
