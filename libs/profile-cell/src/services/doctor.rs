use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_database::{encode, SupabaseClient};
use shared_models::auth::AuthUser;
use shared_models::profile::USER_SUMMARY_COLUMNS;
use shared_utils::pagination::{PaginationMeta, PaginationQuery};

use crate::models::{
    DoctorListQuery, DoctorProfile, DoctorProfileUpdate, DoctorStatistics, ProfileError, StatsBooking,
    UserFieldsUpdate,
};
use crate::services::profile::ProfileService;
use crate::services::statistics::compute_statistics;

const DEFAULT_PAGE_SIZE: u32 = 10;
const LATEST_REVIEWS: u32 = 10;

pub struct DoctorService {
    supabase: Arc<SupabaseClient>,
}

impl DoctorService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Public directory, best rated first.
    pub async fn list_doctors(&self, query: &DoctorListQuery) -> Result<(Vec<DoctorProfile>, PaginationMeta), ProfileError> {
        let (page, limit) = PaginationQuery { page: query.page, limit: query.limit }.resolve(DEFAULT_PAGE_SIZE);
        let filters = directory_filters(query);

        let result = self
            .supabase
            .select_page::<DoctorProfile>("doctor_profiles", &filters, page, limit)
            .await?;

        Ok((result.items, PaginationMeta::new(page, limit, result.total)))
    }

    /// Doctor addressed by user id, with statistics and latest reviews.
    pub async fn get_public_doctor(&self, user_id: Uuid) -> Result<DoctorProfile, ProfileError> {
        let query = format!(
            "user_id=eq.{}&select=*,user:users({}),statistics:doctor_statistics(*),\
             reviews(id,rating,comment,created_at,client:client_profiles(id,user:users(first_name,last_name)))\
             &reviews.order=created_at.desc&reviews.limit={}",
            user_id, USER_SUMMARY_COLUMNS, LATEST_REVIEWS
        );

        self.supabase
            .select_one("doctor_profiles", &query)
            .await?
            .ok_or(ProfileError::DoctorNotFound)
    }

    /// The doctor's own profile with pending and confirmed sessions, soonest first.
    pub async fn get_own_profile(&self, user_id: Uuid) -> Result<DoctorProfile, ProfileError> {
        let query = format!(
            "user_id=eq.{}&select=*,user:users({cols}),statistics:doctor_statistics(*),\
             bookings(id,session_date,session_duration,session_type,status,client:client_profiles(id,user:users({cols})))\
             &bookings.status=in.(PENDING,CONFIRMED)&bookings.order=session_date.asc",
            user_id,
            cols = USER_SUMMARY_COLUMNS
        );

        self.supabase
            .select_one("doctor_profiles", &query)
            .await?
            .ok_or(ProfileError::ProfileNotFound)
    }

    pub async fn update_profile(
        &self,
        user: &AuthUser,
        user_fields: UserFieldsUpdate,
        update: DoctorProfileUpdate,
        photo: Option<String>,
    ) -> Result<DoctorProfile, ProfileError> {
        let profiles = ProfileService::new(self.supabase.clone());
        profiles.ensure_unique_contact(user, &user_fields).await?;
        profiles.update_user_fields(user.id, &user_fields).await?;

        let existing = profiles.doctor_profile_for(user.id).await?;

        let mut patch = update.to_patch();
        if let Some(path) = photo {
            patch.insert("profile_photo".into(), Value::String(path));
        }

        match existing {
            Some(profile) => {
                if !patch.is_empty() {
                    patch.insert("updated_at".into(), json!(Utc::now()));
                    let query = format!("id=eq.{}", profile.id);
                    let _: Vec<Value> = self
                        .supabase
                        .update("doctor_profiles", &query, Value::Object(patch))
                        .await?;
                }
            }
            None => {
                patch.insert("user_id".into(), json!(user.id));
                let _: Value = self.supabase.insert("doctor_profiles", Value::Object(patch)).await?;
            }
        }

        info!("Doctor profile updated for user {}", user.id);
        self.get_own_profile(user.id).await
    }

    /// Recomputes the doctor's totals from bookings and payments and stores them.
    pub async fn refresh_statistics(&self, user_id: Uuid) -> Result<DoctorStatistics, ProfileError> {
        let profile = ProfileService::new(self.supabase.clone())
            .doctor_profile_for(user_id)
            .await?
            .ok_or(ProfileError::ProfileNotFound)?;

        let query = format!(
            "doctor_id=eq.{}&select=status,session_date,payment:payments(amount,status,created_at)",
            profile.id
        );
        let bookings: Vec<StatsBooking> = self.supabase.select("bookings", &query).await?;

        let stats = compute_statistics(profile.id, &bookings, Utc::now());

        let stored: DoctorStatistics = self
            .supabase
            .upsert(
                "doctor_statistics",
                "doctor_id",
                json!({
                    "doctor_id": stats.doctor_id,
                    "total_sessions": stats.total_sessions,
                    "completed_sessions": stats.completed_sessions,
                    "upcoming_sessions": stats.upcoming_sessions,
                    "total_earnings": stats.total_earnings,
                    "monthly_earnings": stats.monthly_earnings,
                    "last_updated": stats.last_updated,
                }),
            )
            .await?;

        Ok(stored)
    }
}

fn directory_filters(query: &DoctorListQuery) -> String {
    let mut filters = vec![format!(
        "select=*,user:users!inner({}),statistics:doctor_statistics(*)",
        USER_SUMMARY_COLUMNS
    )];

    if let Some(specialization) = query.specialization.as_deref().filter(|s| !s.is_empty()) {
        filters.push(format!("specialization=cs.{}", encode(&json!([specialization]).to_string())));
    }
    if let Some(lang) = query.language.as_deref().filter(|s| !s.is_empty()) {
        filters.push(format!("languages=cs.{}", encode(&json!([lang]).to_string())));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let term = encode(&format!("*{}*", search));
        filters.push(format!("user.or=(first_name.ilike.{t},last_name.ilike.{t})", t = term));
    }

    filters.push("order=rating.desc".to_string());
    filters.join("&")
}
