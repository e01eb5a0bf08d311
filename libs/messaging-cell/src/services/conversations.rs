use std::collections::HashMap;

use uuid::Uuid;

use crate::models::Message;

/// One entry of the conversation list before user and booking details are attached.
#[derive(Debug, Clone)]
pub struct ConversationThread {
    pub counterpart: Uuid,
    pub last_message: Option<Message>,
    pub unread_count: u64,
}

/// Groups `messages` by counterpart and adds the `booked` counterparts that
/// have no history yet. Threads without messages come first, in `booked`
/// order, then threads by most recent message.
pub fn build_conversations(me: Uuid, messages: &[Message], booked: &[Uuid]) -> Vec<ConversationThread> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut threads: HashMap<Uuid, ConversationThread> = HashMap::new();

    for message in messages {
        let counterpart = message.counterpart(me);
        let thread = threads.entry(counterpart).or_insert_with(|| {
            order.push(counterpart);
            ConversationThread { counterpart, last_message: None, unread_count: 0 }
        });

        if message.receiver_id == me && !message.is_read {
            thread.unread_count += 1;
        }
        let newer = thread
            .last_message
            .as_ref()
            .map_or(true, |last| message.created_at > last.created_at);
        if newer {
            thread.last_message = Some(message.clone());
        }
    }

    for &counterpart in booked {
        if counterpart != me && !threads.contains_key(&counterpart) {
            order.push(counterpart);
            threads.insert(counterpart, ConversationThread { counterpart, last_message: None, unread_count: 0 });
        }
    }

    let mut result: Vec<ConversationThread> = order.into_iter().filter_map(|id| threads.remove(&id)).collect();
    result.sort_by(|a, b| match (&a.last_message, &b.last_message) {
        (Some(a), Some(b)) => b.created_at.cmp(&a.created_at),
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageType;
    use chrono::{TimeZone, Utc};

    fn message(sender: Uuid, receiver: Uuid, minute: u32, is_read: bool) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            booking_id: None,
            content: format!("at {}", minute),
            message_type: MessageType::Text,
            is_read,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
            sender: None,
            receiver: None,
        }
    }

    #[test]
    fn booked_pairs_without_messages_sort_first() {
        let me = Uuid::new_v4();
        let (a, b, fresh) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let messages = vec![message(me, a, 5, true), message(b, me, 20, false)];

        let threads = build_conversations(me, &messages, &[a, fresh]);
        let ids: Vec<Uuid> = threads.iter().map(|t| t.counterpart).collect();

        assert_eq!(ids, vec![fresh, b, a]);
        assert!(threads[0].last_message.is_none());
    }

    #[test]
    fn unread_counts_only_incoming() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let messages = vec![
            message(other, me, 1, false),
            message(other, me, 2, false),
            message(other, me, 3, true),
            message(me, other, 4, false),
        ];

        let threads = build_conversations(me, &messages, &[]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].unread_count, 2);
        assert_eq!(threads[0].last_message.as_ref().unwrap().content, "at 4");
    }

    #[test]
    fn self_is_never_a_counterpart() {
        let me = Uuid::new_v4();
        assert!(build_conversations(me, &[], &[me]).is_empty());
    }
}
