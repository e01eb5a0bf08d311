use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

const ROOM_CAPACITY: usize = 100;

pub fn user_room(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

pub fn booking_room(booking_id: Uuid) -> String {
    format!("booking:{}", booking_id)
}

/// Named broadcast rooms for live delivery. Rooms are created on first
/// subscription and dropped once nobody listens.
#[derive(Clone, Default)]
pub struct RealtimeHub {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, room: &str) -> broadcast::Receiver<String> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Sends `{event, data}` to a room. Returns how many subscribers got it.
    pub async fn publish(&self, room: &str, event: &str, data: Value) -> usize {
        let rooms = self.rooms.read().await;
        let Some(sender) = rooms.get(room) else {
            debug!("No subscribers in room {}, dropping {}", room, event);
            return 0;
        };
        let payload = json!({ "event": event, "data": data }).to_string();
        sender.send(payload).unwrap_or(0)
    }

    /// Removes the room when its last receiver is gone.
    pub async fn release(&self, room: &str) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(room).is_some_and(|sender| sender.receiver_count() == 0) {
            rooms.remove(room);
            debug!("Removed empty room {}", room);
        }
    }

    pub async fn active_rooms(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }
}
