use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{encode, SupabaseClient};
use shared_models::auth::{AuthUser, Language, Role};
use shared_models::profile::USER_SUMMARY_COLUMNS;

use crate::models::{ClientFieldsUpdate, ClientProfile, DoctorProfile, ProfileError, UserFieldsUpdate};

const USER_PROFILE_COLUMNS: &str = "id,email,phone,first_name,last_name,language,created_at";

/// Role profile rows (client_profiles / doctor_profiles) keyed by user.
pub struct ProfileService {
    supabase: Arc<SupabaseClient>,
}

impl ProfileService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn client_profile_for(&self, user_id: Uuid) -> Result<Option<ClientProfile>, ProfileError> {
        let query = format!("user_id=eq.{}", user_id);
        Ok(self.supabase.select_one("client_profiles", &query).await?)
    }

    pub async fn doctor_profile_for(&self, user_id: Uuid) -> Result<Option<DoctorProfile>, ProfileError> {
        let query = format!("user_id=eq.{}", user_id);
        Ok(self.supabase.select_one("doctor_profiles", &query).await?)
    }

    pub async fn create_client_profile(&self, user_id: Uuid) -> Result<ClientProfile, ProfileError> {
        let profile: ClientProfile = self
            .supabase
            .insert("client_profiles", json!({ "user_id": user_id }))
            .await?;
        info!("Created client profile {} for user {}", profile.id, user_id);
        Ok(profile)
    }

    /// New doctors start unverified, with no rate and no published hours.
    pub async fn create_doctor_profile(&self, user_id: Uuid, language: Language) -> Result<DoctorProfile, ProfileError> {
        let profile: DoctorProfile = self
            .supabase
            .insert(
                "doctor_profiles",
                json!({
                    "user_id": user_id,
                    "hourly_rate": 0,
                    "available_hours": {},
                    "languages": [language.as_str()],
                    "specialization": [],
                    "is_verified": false,
                }),
            )
            .await?;
        info!("Created doctor profile {} for user {}", profile.id, user_id);
        Ok(profile)
    }

    /// Returns the caller's client profile, creating it on first use.
    pub async fn ensure_client_profile(&self, user_id: Uuid) -> Result<ClientProfile, ProfileError> {
        match self.client_profile_for(user_id).await? {
            Some(profile) => Ok(profile),
            None => {
                debug!("No client profile for {}, creating one", user_id);
                self.create_client_profile(user_id).await
            }
        }
    }

    pub async fn profile_photo(&self, user_id: Uuid, role: Role) -> Result<Option<String>, ProfileError> {
        let photo = match role {
            Role::Client => self.client_profile_for(user_id).await?.and_then(|p| p.profile_photo),
            Role::Doctor => self.doctor_profile_for(user_id).await?.and_then(|p| p.profile_photo),
            Role::Admin => None,
        };
        Ok(photo)
    }

    /// Role profile with the owning user embedded; `null` for admins or
    /// users whose profile row does not exist yet.
    pub async fn get_profile(&self, user: &AuthUser) -> Result<Value, ProfileError> {
        let query = format!("user_id=eq.{}&select=*,user:users({})", user.id, USER_PROFILE_COLUMNS);
        let profile = match user.role {
            Role::Client => self
                .supabase
                .select_one::<ClientProfile>("client_profiles", &query)
                .await?
                .map(|p| serde_json::to_value(p).unwrap_or(Value::Null)),
            Role::Doctor => self
                .supabase
                .select_one::<DoctorProfile>("doctor_profiles", &query)
                .await?
                .map(|p| serde_json::to_value(p).unwrap_or(Value::Null)),
            Role::Admin => None,
        };
        Ok(profile.unwrap_or(Value::Null))
    }

    /// Rejects email/phone values already owned by another user.
    pub async fn ensure_unique_contact(&self, user: &AuthUser, update: &UserFieldsUpdate) -> Result<(), ProfileError> {
        if let Some(ref email) = update.email {
            if user.email.as_deref() != Some(email.as_str()) && self.contact_taken("email", email, user.id).await? {
                return Err(ProfileError::EmailTaken);
            }
        }
        if let Some(ref phone) = update.phone {
            if user.phone.as_deref() != Some(phone.as_str()) && self.contact_taken("phone", phone, user.id).await? {
                return Err(ProfileError::PhoneTaken);
            }
        }
        Ok(())
    }

    async fn contact_taken(&self, column: &str, value: &str, own_id: Uuid) -> Result<bool, ProfileError> {
        let query = format!("{}=eq.{}&id=neq.{}&select=id", column, encode(value), own_id);
        let existing: Option<Value> = self.supabase.select_one("users", &query).await?;
        Ok(existing.is_some())
    }

    pub async fn update_user_fields(&self, user_id: Uuid, update: &UserFieldsUpdate) -> Result<(), ProfileError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut patch = Map::new();
        for (column, value) in [
            ("first_name", &update.first_name),
            ("last_name", &update.last_name),
            ("email", &update.email),
            ("phone", &update.phone),
        ] {
            if let Some(v) = value {
                patch.insert(column.into(), Value::String(v.clone()));
            }
        }
        patch.insert("updated_at".into(), json!(chrono::Utc::now()));

        let query = format!("id=eq.{}&select={}", user_id, USER_SUMMARY_COLUMNS);
        let updated: Vec<Value> = self.supabase.update("users", &query, Value::Object(patch)).await?;
        if updated.is_empty() {
            return Err(ProfileError::UserNotFound);
        }
        Ok(())
    }

    /// `PATCH /users/profile`: identity fields, then the role profile.
    pub async fn update_profile(
        &self,
        user: &AuthUser,
        user_fields: UserFieldsUpdate,
        client_fields: ClientFieldsUpdate,
        photo: Option<String>,
    ) -> Result<Value, ProfileError> {
        self.ensure_unique_contact(user, &user_fields).await?;
        self.update_user_fields(user.id, &user_fields).await?;

        match user.role {
            Role::Client => {
                let profile = self.ensure_client_profile(user.id).await?;
                let mut patch = client_fields.to_patch();
                if let Some(path) = photo {
                    patch.insert("profile_photo".into(), Value::String(path));
                }
                if !patch.is_empty() {
                    patch.insert("updated_at".into(), json!(chrono::Utc::now()));
                    let query = format!("id=eq.{}", profile.id);
                    let _: Vec<Value> = self.supabase.update("client_profiles", &query, Value::Object(patch)).await?;
                }
            }
            Role::Doctor => {
                if let Some(path) = photo {
                    let query = format!("user_id=eq.{}", user.id);
                    let _: Vec<Value> = self
                        .supabase
                        .update(
                            "doctor_profiles",
                            &query,
                            json!({ "profile_photo": path, "updated_at": chrono::Utc::now() }),
                        )
                        .await?;
                }
            }
            Role::Admin => {}
        }

        info!("Updated profile for user {}", user.id);
        self.get_profile(user).await
    }
}
