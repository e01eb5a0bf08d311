use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use profile_cell::ProfileService;
use shared_database::SupabaseClient;
use shared_models::auth::{AuthUser, Role};
use shared_utils::pagination::{PaginationMeta, PaginationQuery};
use shared_utils::uploads::{UploadKind, UploadStore, UploadedFile};

use crate::models::{
    Payment, PaymentBooking, PaymentError, PaymentHistoryQuery, PaymentStatus, SubmitPaymentForm, MANUAL_METHOD,
};

const DEFAULT_PAGE_SIZE: u32 = 10;
const PARTY_NAMES: &str = "id,user_id,profile_photo,user:users(id,first_name,last_name,email,phone)";

/// Manual payment attestation: the client uploads proof, the doctor confirms receipt.
pub struct PaymentService {
    supabase: Arc<SupabaseClient>,
}

impl PaymentService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn profiles(&self) -> ProfileService {
        ProfileService::new(self.supabase.clone())
    }

    /// Creates the booking's payment or replaces the previous submission,
    /// which always lands back in PENDING.
    pub async fn submit(
        &self,
        user: &AuthUser,
        form: SubmitPaymentForm,
        screenshot: Option<UploadedFile>,
        uploads: &UploadStore,
    ) -> Result<Payment, PaymentError> {
        let screenshot = screenshot.ok_or(PaymentError::ScreenshotRequired)?;
        uploads.check(UploadKind::PaymentProof, &screenshot)?;

        let client = self
            .profiles()
            .client_profile_for(user.id)
            .await?
            .ok_or(PaymentError::ClientProfileNotFound)?;

        let booking: PaymentBooking = self
            .supabase
            .select_one(
                "bookings",
                &format!("id=eq.{}&select=id,client_id,doctor_id,status", form.booking_id),
            )
            .await?
            .ok_or(PaymentError::BookingNotFound)?;

        if booking.client_id != Some(client.id) {
            return Err(PaymentError::NotBookingClient);
        }
        if booking.status.as_deref() != Some("CONFIRMED") {
            return Err(PaymentError::BookingNotConfirmed);
        }

        let path = uploads.save(UploadKind::PaymentProof, &screenshot).await?;

        let payment: Payment = self
            .supabase
            .upsert(
                "payments",
                "booking_id",
                json!({
                    "booking_id": form.booking_id,
                    "client_id": client.id,
                    "amount": form.amount,
                    "currency": form.currency,
                    "payment_method": MANUAL_METHOD,
                    "screenshot": path,
                    "status": PaymentStatus::Pending,
                    "verified_at": null,
                    "updated_at": Utc::now(),
                }),
            )
            .await?;

        info!(
            "Payment {} submitted for booking {} ({} {})",
            payment.id, form.booking_id, form.amount, form.currency
        );
        Ok(payment)
    }

    /// PENDING payments on the doctor's bookings, newest first.
    pub async fn pending_for_doctor(&self, user: &AuthUser) -> Result<Vec<Payment>, PaymentError> {
        let doctor = self
            .profiles()
            .doctor_profile_for(user.id)
            .await?
            .ok_or(PaymentError::DoctorProfileNotFound)?;

        let query = format!(
            "status=eq.PENDING&select=*,booking:bookings!inner(id,doctor_id,client_id,status,session_date,session_duration,client:client_profiles({}))&booking.doctor_id=eq.{}&order=created_at.desc",
            PARTY_NAMES, doctor.id
        );
        let payments: Vec<Payment> = self.supabase.select("payments", &query).await?;
        debug!("{} pending payments for doctor {}", payments.len(), doctor.id);
        Ok(payments)
    }

    pub async fn verify(&self, user: &AuthUser, payment_id: Uuid) -> Result<Payment, PaymentError> {
        let doctor = self
            .profiles()
            .doctor_profile_for(user.id)
            .await?
            .ok_or(PaymentError::DoctorProfileNotFound)?;

        let payment: Payment = self
            .supabase
            .select_one(
                "payments",
                &format!("id=eq.{}&select=*,booking:bookings(id,doctor_id,client_id,status)", payment_id),
            )
            .await?
            .ok_or(PaymentError::NotFound)?;

        let booking_doctor = payment.booking.as_ref().and_then(|b| b.doctor_id);
        if booking_doctor != Some(doctor.id) {
            return Err(PaymentError::NotBookingDoctor);
        }
        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::AlreadyProcessed);
        }

        let query = format!(
            "id=eq.{}&select=*,booking:bookings(id,doctor_id,client_id,status,session_date,session_duration,client:client_profiles({}))",
            payment.id, PARTY_NAMES
        );
        let updated: Vec<Payment> = self
            .supabase
            .update(
                "payments",
                &query,
                json!({
                    "status": PaymentStatus::Completed,
                    "verified_at": Utc::now(),
                    "updated_at": Utc::now(),
                }),
            )
            .await?;

        info!("Payment {} verified by doctor {}", payment.id, doctor.id);
        updated.into_iter().next().ok_or(PaymentError::NotFound)
    }

    /// Clients see what they paid, doctors what was paid to them.
    pub async fn history(
        &self,
        user: &AuthUser,
        query: &PaymentHistoryQuery,
    ) -> Result<(Vec<Payment>, PaginationMeta), PaymentError> {
        let (page, limit) = PaginationQuery { page: query.page, limit: query.limit }.resolve(DEFAULT_PAGE_SIZE);
        let empty = || Ok((Vec::new(), PaginationMeta::new(page, limit, 0)));

        let profiles = self.profiles();
        let filters = match user.role {
            Role::Client => match profiles.client_profile_for(user.id).await? {
                Some(client) => format!(
                    "client_id=eq.{}&select=*,booking:bookings(id,doctor_id,status,session_date,session_duration,doctor:doctor_profiles({}))&order=created_at.desc",
                    client.id, PARTY_NAMES
                ),
                None => return empty(),
            },
            Role::Doctor => match profiles.doctor_profile_for(user.id).await? {
                Some(doctor) => format!(
                    "select=*,booking:bookings!inner(id,doctor_id,status,session_date,session_duration,client:client_profiles({}))&booking.doctor_id=eq.{}&order=created_at.desc",
                    PARTY_NAMES, doctor.id
                ),
                None => return empty(),
            },
            Role::Admin => return Err(PaymentError::Unauthorized),
        };

        let result = self.supabase.select_page::<Payment>("payments", &filters, page, limit).await?;
        Ok((result.items, PaginationMeta::new(page, limit, result.total)))
    }
}
