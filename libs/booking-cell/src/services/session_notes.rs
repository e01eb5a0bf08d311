use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use profile_cell::ProfileService;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;

use crate::models::{Booking, BookingError, SessionNote};

/// Private notes a doctor keeps against one of their bookings.
pub struct SessionNoteService {
    supabase: Arc<SupabaseClient>,
}

impl SessionNoteService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Returns the booking and the caller's doctor profile id when they own it.
    async fn owned_booking(&self, user: &AuthUser, booking_id: Uuid) -> Result<(Booking, Uuid), BookingError> {
        let booking: Booking = self
            .supabase
            .select_one("bookings", &format!("id=eq.{}&select=*", booking_id))
            .await?
            .ok_or(BookingError::NotFound)?;

        let doctor_id = ProfileService::new(self.supabase.clone())
            .doctor_profile_for(user.id)
            .await?
            .map(|p| p.id)
            .filter(|id| *id == booking.doctor_id)
            .ok_or(BookingError::Unauthorized)?;

        Ok((booking, doctor_id))
    }

    pub async fn upsert(&self, user: &AuthUser, booking_id: Uuid, notes: &str) -> Result<SessionNote, BookingError> {
        let (booking, doctor_id) = self.owned_booking(user, booking_id).await?;

        let note: SessionNote = self
            .supabase
            .upsert(
                "session_notes",
                "booking_id",
                json!({
                    "booking_id": booking.id,
                    "doctor_id": doctor_id,
                    "notes": notes,
                    "updated_at": Utc::now(),
                }),
            )
            .await?;

        info!("Session note saved for booking {}", booking.id);
        Ok(note)
    }

    pub async fn get(&self, user: &AuthUser, booking_id: Uuid) -> Result<Option<SessionNote>, BookingError> {
        let (booking, _) = self.owned_booking(user, booking_id).await?;
        Ok(self
            .supabase
            .select_one("session_notes", &format!("booking_id=eq.{}", booking.id))
            .await?)
    }
}
