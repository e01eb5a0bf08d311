use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use shared_database::{is_unique_violation, SupabaseClient};
use shared_models::auth::AuthUser;
use shared_utils::pagination::{PaginationMeta, PaginationQuery};

use crate::models::{CreateReviewRequest, Review, ReviewError, ReviewListQuery, ReviewedBooking};
use crate::services::rating::aggregate_rating;

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
struct RatingRow {
    rating: i32,
}

pub struct ReviewService {
    supabase: Arc<SupabaseClient>,
}

impl ReviewService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// One review per completed booking, written by the booking's client.
    /// The doctor's rating is recomputed right after the insert.
    pub async fn create(&self, user: &AuthUser, request: CreateReviewRequest) -> Result<Review, ReviewError> {
        let booking_id = request.booking_id.ok_or(ReviewError::MissingField("bookingId"))?;
        let rating = request.rating.ok_or(ReviewError::MissingField("rating"))?;

        let booking: ReviewedBooking = self
            .supabase
            .select_one(
                "bookings",
                &format!("id=eq.{}&select=id,client_id,doctor_id,status,client:client_profiles(id,user_id)", booking_id),
            )
            .await?
            .ok_or(ReviewError::BookingNotFound)?;

        let owner = booking.client.as_ref().and_then(|c| c.user_id);
        if owner != Some(user.id) {
            return Err(ReviewError::Unauthorized);
        }
        if booking.status != "COMPLETED" {
            return Err(ReviewError::SessionNotCompleted);
        }

        let existing: Option<Review> = self
            .supabase
            .select_one("reviews", &format!("booking_id=eq.{}", booking.id))
            .await?;
        if existing.is_some() {
            return Err(ReviewError::AlreadyExists);
        }

        let review: Review = self
            .supabase
            .insert(
                "reviews",
                json!({
                    "booking_id": booking.id,
                    "client_id": booking.client_id,
                    "doctor_id": booking.doctor_id,
                    "rating": rating,
                    "comment": request.comment.filter(|c| !c.trim().is_empty()),
                }),
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    warn!("Concurrent review insert for booking {}", booking.id);
                    ReviewError::AlreadyExists
                } else {
                    e.into()
                }
            })?;

        info!("Review {} ({} stars) created for doctor {}", review.id, rating, booking.doctor_id);

        self.recompute_doctor_rating(booking.doctor_id).await?;
        Ok(review)
    }

    pub async fn recompute_doctor_rating(&self, doctor_id: Uuid) -> Result<(f64, i64), ReviewError> {
        let rows: Vec<RatingRow> = self
            .supabase
            .select("reviews", &format!("doctor_id=eq.{}&select=rating", doctor_id))
            .await?;
        let ratings: Vec<i32> = rows.iter().map(|r| r.rating).collect();
        let (mean, total) = aggregate_rating(&ratings);

        let _: Vec<serde_json::Value> = self
            .supabase
            .update(
                "doctor_profiles",
                &format!("id=eq.{}", doctor_id),
                json!({ "rating": mean, "total_reviews": total }),
            )
            .await?;

        info!("Doctor {} rating now {:.2} over {} reviews", doctor_id, mean, total);
        Ok((mean, total))
    }

    /// Reviews for a doctor profile, newest first.
    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        query: &ReviewListQuery,
    ) -> Result<(Vec<Review>, PaginationMeta), ReviewError> {
        let (page, limit) = PaginationQuery { page: query.page, limit: query.limit }.resolve(DEFAULT_PAGE_SIZE);
        let filters = format!(
            "doctor_id=eq.{}&select=*,client:client_profiles(id,profile_photo,user:users(first_name,last_name))&order=created_at.desc",
            doctor_id
        );

        let result = self.supabase.select_page::<Review>("reviews", &filters, page, limit).await?;
        Ok((result.items, PaginationMeta::new(page, limit, result.total)))
    }
}
