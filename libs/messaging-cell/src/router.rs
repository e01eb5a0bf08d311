use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::state::AppState;

use crate::{handlers, ws};

pub fn message_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handlers::send_message))
        .route("/conversations", get(handlers::list_conversations))
        .route("/conversation/{user_id}", get(handlers::get_conversation))
        .route("/read/{user_id}", patch(handlers::mark_conversation_read))
        .route("/unread-count", get(handlers::unread_count))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// The websocket authenticates during the handshake, so it sits outside the auth layer.
pub fn ws_routes(state: Arc<AppState>) -> Router {
    Router::new().route("/", get(ws::ws_handler)).with_state(state)
}
