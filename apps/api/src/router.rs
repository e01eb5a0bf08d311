use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use admin_cell::router::admin_routes;
use auth_cell::router::auth_routes;
use booking_cell::router::{booking_routes, session_note_routes};
use messaging_cell::router::{message_routes, ws_routes};
use payment_cell::router::payment_routes;
use profile_cell::router::{doctor_routes, user_routes};
use review_cell::router::review_routes;
use shared_utils::state::AppState;
use shared_utils::uploads::PUBLIC_PREFIX;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(state.uploads.root());

    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/session-notes", session_note_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/messages", message_routes(state.clone()))
        .nest("/reviews", review_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone()))
        .nest("/ws", ws_routes(state))
        .nest_service(PUBLIC_PREFIX, uploads)
}
