use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use booking_cell::{Booking, BookingStatus};
use shared_database::{encode, SupabaseClient};
use shared_models::auth::Role;
use shared_utils::pagination::{PaginationMeta, PaginationQuery};

use crate::models::{
    AdminError, AdminUser, Analytics, BookingListQuery, BookingTotals, RevenuePayment, UserListQuery, UserTotals,
    ADMIN_USER_COLUMNS,
};
use crate::services::revenue::revenue_totals;

const DEFAULT_PAGE_SIZE: u32 = 20;

const OVERSIGHT_SELECT: &str = "*,client:client_profiles(id,user_id,user:users(first_name,last_name,email)),\
doctor:doctor_profiles(id,user_id,user:users(first_name,last_name,email)),payment:payments(*)";

pub struct AdminService {
    supabase: Arc<SupabaseClient>,
}

impl AdminService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn list_users(&self, query: &UserListQuery) -> Result<(Vec<AdminUser>, PaginationMeta), AdminError> {
        let (page, limit) = PaginationQuery { page: query.page, limit: query.limit }.resolve(DEFAULT_PAGE_SIZE);
        let filters = user_filters(query)?;

        let result = self.supabase.select_page::<AdminUser>("users", &filters, page, limit).await?;
        debug!("Admin listed {} of {} users", result.items.len(), result.total);

        Ok((result.items, PaginationMeta::new(page, limit, result.total)))
    }

    /// Sets the user's verification flag. Verifying a doctor also verifies
    /// the doctor profile; unverifying leaves the profile alone.
    pub async fn set_verification(&self, user_id: Uuid, is_verified: bool) -> Result<AdminUser, AdminError> {
        let updated: Vec<AdminUser> = self
            .supabase
            .update(
                "users",
                &format!("id=eq.{}&select={}", user_id, ADMIN_USER_COLUMNS),
                json!({ "is_verified": is_verified, "updated_at": Utc::now() }),
            )
            .await?;
        let user = updated.into_iter().next().ok_or(AdminError::UserNotFound)?;

        if is_verified && user.role == Role::Doctor {
            let _: Vec<serde_json::Value> = self
                .supabase
                .update(
                    "doctor_profiles",
                    &format!("user_id=eq.{}&select=id", user.id),
                    json!({ "is_verified": true, "updated_at": Utc::now() }),
                )
                .await?;
            info!("Doctor profile of {} verified", user.id);
        }

        info!("User {} verification set to {}", user.id, is_verified);
        Ok(user)
    }

    pub async fn analytics(&self) -> Result<Analytics, AdminError> {
        let db = &self.supabase;
        let (total_users, clients, doctors, total_bookings, completed, payments) = tokio::try_join!(
            db.count("users", ""),
            db.count("users", "role=eq.CLIENT"),
            db.count("users", "role=eq.DOCTOR"),
            db.count("bookings", ""),
            db.count("bookings", "status=eq.COMPLETED"),
            db.select::<RevenuePayment>("payments", "status=eq.COMPLETED&select=amount,created_at"),
        )?;

        Ok(Analytics {
            users: UserTotals { total: total_users, clients, doctors },
            bookings: BookingTotals { total: total_bookings, completed },
            revenue: revenue_totals(&payments, Utc::now()),
        })
    }

    pub async fn list_bookings(&self, query: &BookingListQuery) -> Result<(Vec<Booking>, PaginationMeta), AdminError> {
        let (page, limit) = PaginationQuery { page: query.page, limit: query.limit }.resolve(DEFAULT_PAGE_SIZE);

        let mut filters = Vec::new();
        if let Some(raw) = query.status.as_deref().filter(|s| !s.is_empty()) {
            let status: BookingStatus = raw.parse().map_err(|_| AdminError::InvalidStatus(raw.to_string()))?;
            filters.push(format!("status=eq.{}", status));
        }
        filters.push(format!("select={}", OVERSIGHT_SELECT));
        filters.push("order=created_at.desc".to_string());

        let result = self
            .supabase
            .select_page::<Booking>("bookings", &filters.join("&"), page, limit)
            .await?;
        debug!("Admin listed {} of {} bookings", result.items.len(), result.total);

        Ok((result.items, PaginationMeta::new(page, limit, result.total)))
    }
}

/// PostgREST filter string for the user listing, newest first.
fn user_filters(query: &UserListQuery) -> Result<String, AdminError> {
    let mut filters = Vec::new();

    if let Some(raw) = query.role.as_deref().filter(|r| !r.is_empty()) {
        let role: Role = raw.parse().map_err(|_| AdminError::InvalidRole(raw.to_string()))?;
        filters.push(format!("role=eq.{}", role));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let term = encode(&format!("*{}*", search));
        filters.push(format!(
            "or=(first_name.ilike.{t},last_name.ilike.{t},email.ilike.{t})",
            t = term
        ));
    }

    filters.push(format!("select={}", ADMIN_USER_COLUMNS));
    filters.push("order=created_at.desc".to_string());
    Ok(filters.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn user_filters_combine_role_and_search() {
        let query = UserListQuery {
            role: Some("doctor".into()),
            search: Some(" sall ".into()),
            ..Default::default()
        };
        let filters = user_filters(&query).unwrap();
        assert!(filters.starts_with("role=eq.DOCTOR&"));
        assert!(filters.contains("or=(first_name.ilike.%2Asall%2A,last_name.ilike.%2Asall%2A,email.ilike.%2Asall%2A)"));
        assert!(filters.ends_with("order=created_at.desc"));
    }

    #[test]
    fn unknown_role_filter_is_rejected() {
        let query = UserListQuery { role: Some("ROOT".into()), ..Default::default() };
        assert_matches!(user_filters(&query), Err(AdminError::InvalidRole(raw)) if raw == "ROOT");
    }

    #[test]
    fn no_filters_only_select_and_order() {
        let filters = user_filters(&UserListQuery::default()).unwrap();
        assert_eq!(filters, format!("select={}&order=created_at.desc", ADMIN_USER_COLUMNS));
    }
}
