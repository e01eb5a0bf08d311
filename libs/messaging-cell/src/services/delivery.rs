use serde_json::Value;
use tracing::debug;

use shared_utils::realtime::{booking_room, user_room, RealtimeHub};

use crate::models::Message;

pub const NEW_MESSAGE: &str = "new-message";
pub const MESSAGE_SENT: &str = "message-sent";

/// Pushes a stored message to the receiver's room and, when anchored to a
/// booking, to that booking's room.
pub async fn deliver(hub: &RealtimeHub, message: &Message) {
    let payload = serde_json::to_value(message).unwrap_or(Value::Null);

    let delivered = hub.publish(&user_room(message.receiver_id), NEW_MESSAGE, payload.clone()).await;
    debug!("Message {} delivered to {} receiver sockets", message.id, delivered);

    if let Some(booking_id) = message.booking_id {
        hub.publish(&booking_room(booking_id), NEW_MESSAGE, payload).await;
    }
}
