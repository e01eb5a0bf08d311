use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use profile_cell::ProfileService;
use shared_database::SupabaseClient;
use shared_models::auth::{AuthUser, Role};
use shared_models::profile::UserSummary;
use shared_utils::pagination::{PaginationMeta, PaginationQuery};

use crate::models::{
    Conversation, ConversationQuery, Message, MessageError, PairBooking, SendMessageRequest, MESSAGE_SELECT,
};
use crate::services::conversations::build_conversations;

const CONVERSATION_PAGE_SIZE: u32 = 50;
const LIVE_STATUSES: &str = "(PENDING,CONFIRMED,COMPLETED)";
const COUNTERPART_COLUMNS: &str = "id,first_name,last_name,role,email,phone";

pub struct MessageService {
    supabase: Arc<SupabaseClient>,
}

impl MessageService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn profiles(&self) -> ProfileService {
        ProfileService::new(self.supabase.clone())
    }

    /// Stores a message. Delivery over the live channel is left to the caller.
    pub async fn send(&self, sender: &AuthUser, request: SendMessageRequest) -> Result<Message, MessageError> {
        let receiver_id = request.receiver_id.ok_or(MessageError::MissingField("receiverId"))?;
        let content = request.content.ok_or(MessageError::MissingField("content"))?;
        if receiver_id == sender.id {
            return Err(MessageError::SelfMessage);
        }

        let receiver: Option<Value> = self
            .supabase
            .select_one("users", &format!("id=eq.{}&select=id", receiver_id))
            .await?;
        if receiver.is_none() {
            return Err(MessageError::ReceiverNotFound);
        }

        let inserted: Message = self
            .supabase
            .insert(
                "messages",
                json!({
                    "sender_id": sender.id,
                    "receiver_id": receiver_id,
                    "booking_id": request.booking_id,
                    "content": content.trim(),
                    "type": request.message_type.unwrap_or_default(),
                }),
            )
            .await?;

        info!("Message {} sent from {} to {}", inserted.id, sender.id, receiver_id);

        let full: Option<Message> = self
            .supabase
            .select_one("messages", &format!("id=eq.{}&select={}", inserted.id, MESSAGE_SELECT))
            .await?;
        Ok(full.unwrap_or(inserted))
    }

    /// One page of the thread with `other`, chronological within the page.
    /// Incoming unread messages are marked read as a side effect.
    pub async fn conversation(
        &self,
        user: &AuthUser,
        other: Uuid,
        query: &ConversationQuery,
    ) -> Result<(Vec<Message>, PaginationMeta), MessageError> {
        let (page, limit) = PaginationQuery { page: query.page, limit: query.limit }.resolve(CONVERSATION_PAGE_SIZE);
        let filters = format!(
            "or=(and(sender_id.eq.{me},receiver_id.eq.{other}),and(sender_id.eq.{other},receiver_id.eq.{me}))&select={select}&order=created_at.desc",
            me = user.id,
            other = other,
            select = MESSAGE_SELECT
        );

        let result = self.supabase.select_page::<Message>("messages", &filters, page, limit).await?;
        let mut messages = result.items;
        messages.reverse();

        self.mark_read(user, other).await?;
        Ok((messages, PaginationMeta::new(page, limit, result.total)))
    }

    pub async fn mark_read(&self, user: &AuthUser, other: Uuid) -> Result<usize, MessageError> {
        let marked: Vec<Value> = self
            .supabase
            .update(
                "messages",
                &format!("sender_id=eq.{}&receiver_id=eq.{}&is_read=eq.false&select=id", other, user.id),
                json!({ "is_read": true }),
            )
            .await?;
        debug!("Marked {} messages from {} as read for {}", marked.len(), other, user.id);
        Ok(marked.len())
    }

    pub async fn unread_count(&self, user: &AuthUser) -> Result<u64, MessageError> {
        let count = self
            .supabase
            .count("messages", &format!("receiver_id=eq.{}&is_read=eq.false", user.id))
            .await?;
        Ok(count)
    }

    /// Everyone the user has talked to, plus booked counterparts with no history yet.
    pub async fn conversations(&self, user: &AuthUser) -> Result<Vec<Conversation>, MessageError> {
        let messages: Vec<Message> = self
            .supabase
            .select(
                "messages",
                &format!(
                    "or=(sender_id.eq.{me},receiver_id.eq.{me})&select={select}&order=created_at.desc",
                    me = user.id,
                    select = MESSAGE_SELECT
                ),
            )
            .await?;

        let bookings = self.pair_bookings(user).await?;
        let counterpart_of = |b: &PairBooking| -> Option<Uuid> {
            match user.role {
                Role::Doctor => b.client.as_ref().and_then(|c| c.user_id),
                _ => b.doctor.as_ref().and_then(|d| d.user_id),
            }
        };

        let mut booked: Vec<Uuid> = Vec::new();
        for booking in &bookings {
            // Doctors only see clients they have accepted.
            if user.role == Role::Doctor && booking.status != "CONFIRMED" {
                continue;
            }
            if let Some(id) = counterpart_of(booking) {
                if !booked.contains(&id) {
                    booked.push(id);
                }
            }
        }

        let threads = build_conversations(user.id, &messages, &booked);
        if threads.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = threads.iter().map(|t| t.counterpart.to_string()).collect();
        let users: Vec<UserSummary> = self
            .supabase
            .select("users", &format!("id=in.({})&select={}", ids.join(","), COUNTERPART_COLUMNS))
            .await?;
        let mut users: HashMap<Uuid, UserSummary> =
            users.into_iter().filter_map(|u| u.id.map(|id| (id, u))).collect();

        Ok(threads
            .into_iter()
            .map(|thread| Conversation {
                user: users.remove(&thread.counterpart),
                latest_booking: bookings
                    .iter()
                    .find(|b| counterpart_of(b) == Some(thread.counterpart))
                    .map(PairBooking::to_latest),
                last_message: thread.last_message,
                unread_count: thread.unread_count,
            })
            .collect())
    }

    /// Live bookings of the caller's profile, newest session first.
    async fn pair_bookings(&self, user: &AuthUser) -> Result<Vec<PairBooking>, MessageError> {
        let profiles = self.profiles();
        let filter = match user.role {
            Role::Doctor => match profiles.doctor_profile_for(user.id).await? {
                Some(doctor) => format!("doctor_id=eq.{}&select=id,session_date,session_type,status,client:client_profiles(id,user_id)", doctor.id),
                None => return Ok(Vec::new()),
            },
            Role::Client => match profiles.client_profile_for(user.id).await? {
                Some(client) => format!("client_id=eq.{}&select=id,session_date,session_type,status,doctor:doctor_profiles(id,user_id)", client.id),
                None => return Ok(Vec::new()),
            },
            Role::Admin => return Ok(Vec::new()),
        };

        let bookings = self
            .supabase
            .select("bookings", &format!("{}&status=in.{}&order=session_date.desc", filter, LIVE_STATUSES))
            .await?;
        Ok(bookings)
    }

    /// Gate for joining a booking room on the live channel.
    pub async fn ensure_booking_party(&self, user: &AuthUser, booking_id: Uuid) -> Result<(), MessageError> {
        let booking: PairBooking = self
            .supabase
            .select_one(
                "bookings",
                &format!(
                    "id=eq.{}&select=id,session_date,session_type,status,client:client_profiles(id,user_id),doctor:doctor_profiles(id,user_id)",
                    booking_id
                ),
            )
            .await?
            .ok_or(MessageError::BookingNotFound)?;

        let parties = [
            booking.client.as_ref().and_then(|c| c.user_id),
            booking.doctor.as_ref().and_then(|d| d.user_id),
        ];
        if parties.contains(&Some(user.id)) {
            Ok(())
        } else {
            Err(MessageError::NotBookingParty)
        }
    }
}
