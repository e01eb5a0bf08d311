//! Live chat channel.
//!
//! The token is checked once, before the upgrade. After that the socket
//! speaks JSON frames shaped `{"event": ..., "data": ...}` in both directions.
//! Every socket listens on its user room; `join-booking` adds a booking room.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use axum_extra::TypedHeader;
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::extractor::{authenticate, ApiQuery};
use shared_utils::realtime::{booking_room, user_room};
use shared_utils::state::AppState;
use shared_utils::validation::field_errors;

use crate::models::SendMessageRequest;
use crate::services::delivery::{deliver, MESSAGE_SENT};
use crate::services::MessageService;

const OUTBOUND_BUFFER: usize = 100;
const PING_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// Frames a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinBooking { booking_id: Uuid },
    SendMessage(SendMessageRequest),
    #[serde(rename_all = "camelCase")]
    Typing { receiver_id: Uuid },
    #[serde(rename_all = "camelCase")]
    StopTyping { receiver_id: Uuid },
}

pub fn frame(event: &str, data: Value) -> String {
    json!({ "event": event, "data": data }).to_string()
}

fn error_frame(message: &str) -> String {
    frame("error", json!({ "message": message }))
}

/// `?token=` wins over the Authorization header.
pub fn resolve_token<'a>(query: &'a WsAuthQuery, bearer: Option<&'a str>) -> Option<&'a str> {
    query
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .or(bearer.filter(|t| !t.is_empty()))
}

pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<WsAuthQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let header_token = bearer.as_ref().map(|TypedHeader(auth)| auth.token());
    let token = resolve_token(&query, header_token)
        .ok_or_else(|| AppError::Auth("Authentication error: No token provided".to_string()))?;
    let user = authenticate(&state, token).await?;

    info!("Live channel opened for user {}", user.id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

/// Copies a room's broadcast into the socket's outbound queue.
fn forward(mut rx: broadcast::Receiver<String>, tx: mpsc::Sender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    if tx.send(payload).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Live channel lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Owns the socket sink: drains the outbound queue and keeps the
/// connection alive with pings. Ends when the client stops accepting frames.
fn spawn_writer(mut sender: SplitSink<WebSocket, WsMessage>, mut rx: mpsc::Receiver<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ping = interval(Duration::from_secs(PING_INTERVAL_SECS));
        loop {
            tokio::select! {
                payload = rx.recv() => {
                    let Some(payload) = payload else { break };
                    if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Queues a reply for this socket without waiting. A full queue drops it.
fn reply(tx: &mpsc::Sender<String>, user_id: Uuid, payload: String) {
    if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(payload) {
        warn!("Outbound queue full for {}, reply dropped", user_id);
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: AuthUser) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    let own_room = user_room(user.id);
    let mut rooms: HashMap<String, JoinHandle<()>> = HashMap::new();
    rooms.insert(own_room.clone(), forward(state.hub.subscribe(&own_room).await, tx.clone()));

    let mut writer = spawn_writer(sender, rx);

    loop {
        tokio::select! {
            _ = &mut writer => {
                debug!("Live channel writer for {} stopped", user.id);
                break;
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_event(&state, &user, text.as_str(), &tx, &mut rooms).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!("User {} closed the live channel", user.id);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Live channel error for {}: {}", user.id, e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    writer.abort();
    for (room, task) in rooms {
        task.abort();
        let _ = task.await;
        state.hub.release(&room).await;
    }
    info!("Live channel closed for user {}", user.id);
}

async fn handle_event(
    state: &Arc<AppState>,
    user: &AuthUser,
    text: &str,
    tx: &mpsc::Sender<String>,
    rooms: &mut HashMap<String, JoinHandle<()>>,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            debug!("Unreadable frame from {}: {}", user.id, e);
            reply(tx, user.id, error_frame("Unrecognized event"));
            return;
        }
    };

    match event {
        ClientEvent::JoinBooking { booking_id } => {
            let room = booking_room(booking_id);
            if rooms.contains_key(&room) {
                return;
            }
            match MessageService::new(state.db.clone()).ensure_booking_party(user, booking_id).await {
                Ok(()) => {
                    let rx = state.hub.subscribe(&room).await;
                    rooms.insert(room, forward(rx, tx.clone()));
                    debug!("User {} joined booking {}", user.id, booking_id);
                }
                Err(e) => reply(tx, user.id, error_frame(&e.to_string())),
            }
        }

        ClientEvent::SendMessage(request) => {
            if let Err(errors) = request.validate() {
                let message = field_errors(&errors)
                    .into_iter()
                    .next()
                    .map(|e| e.message)
                    .unwrap_or_else(|| "Missing required fields: receiverId and content are required".to_string());
                reply(tx, user.id, error_frame(&message));
                return;
            }

            match MessageService::new(state.db.clone()).send(user, request).await {
                Ok(message) => {
                    deliver(&state.hub, &message).await;
                    let data = serde_json::to_value(&message).unwrap_or(Value::Null);
                    reply(tx, user.id, frame(MESSAGE_SENT, data));
                }
                Err(e) => {
                    warn!("Live send from {} failed: {}", user.id, e);
                    reply(tx, user.id, error_frame("Failed to send message"));
                }
            }
        }

        ClientEvent::Typing { receiver_id } => {
            state
                .hub
                .publish(
                    &user_room(receiver_id),
                    "user-typing",
                    json!({ "userId": user.id, "userName": user.full_name() }),
                )
                .await;
        }

        ClientEvent::StopTyping { receiver_id } => {
            state
                .hub
                .publish(&user_room(receiver_id), "user-stop-typing", json!({ "userId": user.id }))
                .await;
        }
    }
}
