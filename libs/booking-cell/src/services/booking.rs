use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use profile_cell::ProfileService;
use shared_database::SupabaseClient;
use shared_models::auth::{AuthUser, Role};
use shared_models::profile::USER_SUMMARY_COLUMNS;
use shared_utils::pagination::{PaginationMeta, PaginationQuery};

use crate::models::{
    Booking, BookingError, BookingListQuery, BookingStatus, CreateBookingRequest, RescheduleRequest,
    UpdateStatusRequest,
};
use crate::services::lifecycle::{check_payment_gate, check_requested_status, check_reschedulable};

const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_DURATION_MINUTES: i32 = 60;

fn doctor_embed() -> String {
    format!(
        "doctor:doctor_profiles(id,user_id,profile_photo,hourly_rate,specialization,user:users({}))",
        USER_SUMMARY_COLUMNS
    )
}

fn client_embed() -> String {
    format!("client:client_profiles(id,user_id,profile_photo,user:users({}))", USER_SUMMARY_COLUMNS)
}

fn with_parties() -> String {
    format!("select=*,{},{}", doctor_embed(), client_embed())
}

#[derive(Debug, Deserialize)]
struct PaymentStatusRow {
    status: String,
}

pub struct BookingService {
    supabase: Arc<SupabaseClient>,
}

impl BookingService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn profiles(&self) -> ProfileService {
        ProfileService::new(self.supabase.clone())
    }

    pub async fn find(&self, booking_id: Uuid, select: &str) -> Result<Option<Booking>, BookingError> {
        let query = format!("id=eq.{}&{}", booking_id, select);
        Ok(self.supabase.select_one("bookings", &query).await?)
    }

    async fn find_plain(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.find(booking_id, "select=*").await?.ok_or(BookingError::NotFound)
    }

    /// Whether the caller's role profile is the client or doctor on the booking.
    pub async fn is_party(&self, user: &AuthUser, booking: &Booking) -> Result<bool, BookingError> {
        let profiles = self.profiles();
        let owned = match user.role {
            Role::Client => profiles.client_profile_for(user.id).await?.map(|p| p.id) == Some(booking.client_id),
            Role::Doctor => profiles.doctor_profile_for(user.id).await?.map(|p| p.id) == Some(booking.doctor_id),
            Role::Admin => false,
        };
        Ok(owned)
    }

    /// New PENDING booking; the caller's client profile is created if missing.
    pub async fn create(&self, user: &AuthUser, request: CreateBookingRequest) -> Result<Booking, BookingError> {
        let doctor_user_id = request.doctor_id.ok_or(BookingError::MissingField("doctorId"))?;
        let session_date = request.session_date.ok_or(BookingError::MissingField("sessionDate"))?;

        let profiles = self.profiles();
        let doctor = profiles
            .doctor_profile_for(doctor_user_id)
            .await?
            .ok_or(BookingError::DoctorNotFound)?;
        let client = profiles.ensure_client_profile(user.id).await?;

        let created: Booking = self
            .supabase
            .insert(
                "bookings",
                json!({
                    "client_id": client.id,
                    "doctor_id": doctor.id,
                    "session_date": session_date,
                    "session_duration": request.session_duration.unwrap_or(DEFAULT_DURATION_MINUTES),
                    "session_type": request.session_type.unwrap_or_default().as_str(),
                    "status": BookingStatus::Pending,
                    "notes": request.notes.filter(|n| !n.trim().is_empty()),
                }),
            )
            .await?;

        info!("Booking {} created by client {} with doctor {}", created.id, client.id, doctor.id);

        Ok(self.find(created.id, &with_parties()).await?.unwrap_or(created))
    }

    /// The caller's bookings, latest session first.
    pub async fn list_for(
        &self,
        user: &AuthUser,
        query: &BookingListQuery,
    ) -> Result<(Vec<Booking>, PaginationMeta), BookingError> {
        let (page, limit) = PaginationQuery { page: query.page, limit: query.limit }.resolve(DEFAULT_PAGE_SIZE);

        let status_filter = match query.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => {
                let status: BookingStatus = raw
                    .parse()
                    .map_err(|_| BookingError::InvalidStatusFilter(raw.to_string()))?;
                format!("&status=eq.{}", status)
            }
            None => String::new(),
        };

        let profiles = self.profiles();
        let filters = match user.role {
            Role::Client => match profiles.client_profile_for(user.id).await? {
                Some(profile) => format!(
                    "client_id=eq.{}{}&select=*,{},payment:payments(*),review:reviews(id,rating,comment,created_at)&order=session_date.desc",
                    profile.id,
                    status_filter,
                    doctor_embed()
                ),
                None => return Ok((Vec::new(), PaginationMeta::new(page, limit, 0))),
            },
            Role::Doctor => match profiles.doctor_profile_for(user.id).await? {
                Some(profile) => format!(
                    "doctor_id=eq.{}{}&select=*,{},payment:payments(*),session_note:session_notes(*)&order=session_date.desc",
                    profile.id,
                    status_filter,
                    client_embed()
                ),
                None => return Ok((Vec::new(), PaginationMeta::new(page, limit, 0))),
            },
            Role::Admin => return Err(BookingError::RoleNotAllowed(Role::Admin)),
        };

        let result = self.supabase.select_page::<Booking>("bookings", &filters, page, limit).await?;
        debug!("Listed {} of {} bookings for {}", result.items.len(), result.total, user.id);

        Ok((result.items, PaginationMeta::new(page, limit, result.total)))
    }

    /// One booking with parties, payment and review. Doctors also see the session note.
    pub async fn get_for(&self, user: &AuthUser, booking_id: Uuid) -> Result<Booking, BookingError> {
        let mut select = format!(
            "{},payment:payments(*),review:reviews(id,rating,comment,created_at)",
            with_parties()
        );
        if user.is(Role::Doctor) {
            select.push_str(",session_note:session_notes(*)");
        }

        let booking = self.find(booking_id, &select).await?.ok_or(BookingError::NotFound)?;

        if !user.is(Role::Admin) && !self.is_party(user, &booking).await? {
            return Err(BookingError::Unauthorized);
        }

        Ok(booking)
    }

    /// Role-constrained status change. COMPLETED is gated on a verified payment.
    pub async fn update_status(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<Booking, BookingError> {
        let booking = self.find_plain(booking_id).await?;

        if !user.is(Role::Admin) && !self.is_party(user, &booking).await? {
            return Err(BookingError::Unauthorized);
        }

        let target = check_requested_status(user.role, &request.status)?;

        if target == BookingStatus::Completed {
            let payment: Option<PaymentStatusRow> = self
                .supabase
                .select_one("payments", &format!("booking_id=eq.{}&select=status", booking.id))
                .await?;
            check_payment_gate(payment.as_ref().map(|p| p.status.as_str()))?;
        }

        let mut query = format!("id=eq.{}", booking.id);
        if let Some(expected) = request.expected_status {
            query.push_str(&format!("&status=eq.{}", expected));
        }
        query.push('&');
        query.push_str(&with_parties());

        let updated: Vec<Booking> = self
            .supabase
            .update("bookings", &query, json!({ "status": target, "updated_at": Utc::now() }))
            .await?;

        let updated = match (updated.into_iter().next(), request.expected_status) {
            (Some(b), _) => b,
            (None, Some(expected)) => {
                warn!("Booking {} no longer {}, status change to {} skipped", booking.id, expected, target);
                return Err(BookingError::StatusChanged(expected));
            }
            (None, None) => return Err(BookingError::NotFound),
        };

        info!("Booking {} status {} -> {} by {}", booking.id, booking.status, target, user.id);
        Ok(updated)
    }

    /// New session time; the booking goes back to PENDING for the doctor to confirm.
    pub async fn reschedule(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
        request: RescheduleRequest,
    ) -> Result<Booking, BookingError> {
        let session_date = request.session_date.ok_or(BookingError::MissingField("sessionDate"))?;
        let booking = self.find_plain(booking_id).await?;

        if !self.is_party(user, &booking).await? {
            return Err(BookingError::Unauthorized);
        }
        check_reschedulable(booking.status)?;

        let query = format!("id=eq.{}", booking.id);
        let updated: Vec<Booking> = self
            .supabase
            .update(
                "bookings",
                &query,
                json!({
                    "session_date": session_date,
                    "status": BookingStatus::Pending,
                    "updated_at": Utc::now(),
                }),
            )
            .await?;

        info!("Booking {} rescheduled to {}", booking.id, session_date);
        updated.into_iter().next().ok_or(BookingError::NotFound)
    }
}
