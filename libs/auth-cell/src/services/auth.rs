use std::sync::Arc;

use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use profile_cell::ProfileService;
use shared_config::AppConfig;
use shared_database::{encode, is_unique_violation, SupabaseClient};
use shared_models::auth::{AuthUser, Language, Role};
use shared_utils::jwt::issue_token;
use shared_utils::mailer::{password_reset_email, send_best_effort, verification_email, EmailSender};
use shared_utils::password::{hash_password, verify_password};
use shared_utils::state::AppState;
use shared_utils::tokens::{generate_token, hash_token};

use crate::models::{
    AuthError, ForgotPasswordRequest, LoginRequest, PublicUser, RegisterRequest, ResetPasswordRequest, UserRow,
    USER_ROW_COLUMNS,
};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Raw reset token and link, echoed back only in development.
#[derive(Debug, Clone)]
pub struct ResetTicket {
    pub token: String,
    pub url: String,
}

pub struct AuthService {
    supabase: Arc<SupabaseClient>,
    mailer: Arc<dyn EmailSender>,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            supabase: state.db.clone(),
            mailer: state.mailer.clone(),
            config: state.config.clone(),
        }
    }

    fn profiles(&self) -> ProfileService {
        ProfileService::new(self.supabase.clone())
    }

    /// Looks a user up by email or phone, whichever was given.
    async fn find_by_contact(&self, email: Option<&str>, phone: Option<&str>) -> Result<Option<UserRow>, AuthError> {
        let mut conditions = Vec::new();
        if let Some(email) = email {
            conditions.push(format!("email.eq.{}", encode(email)));
        }
        if let Some(phone) = phone {
            conditions.push(format!("phone.eq.{}", encode(phone)));
        }
        if conditions.is_empty() {
            return Ok(None);
        }

        let query = format!("or=({})&select={}", conditions.join(","), USER_ROW_COLUMNS);
        Ok(self.supabase.select_one("users", &query).await?)
    }

    async fn with_photo(&self, row: UserRow) -> Result<PublicUser, AuthError> {
        let photo = self.profiles().profile_photo(row.id, row.role).await?;
        Ok(PublicUser::from_row(row, photo))
    }

    /// Creates an unverified user with its role profile. Returns the user and
    /// whether an email verification is pending.
    pub async fn register(&self, request: RegisterRequest) -> Result<(PublicUser, bool), AuthError> {
        let email = request.email.as_deref().map(str::trim).filter(|e| !e.is_empty()).map(str::to_lowercase);
        let phone = request.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);
        if email.is_none() && phone.is_none() {
            return Err(AuthError::ContactRequired);
        }

        if self.find_by_contact(email.as_deref(), phone.as_deref()).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let role = request.role();
        let language = request.language();
        let password = request.password.unwrap_or_default();
        let password_hash = hash_password(&password).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        let verification_token = generate_token();

        let row: UserRow = self
            .supabase
            .insert(
                "users",
                json!({
                    "email": email,
                    "phone": phone,
                    "password_hash": password_hash,
                    "first_name": request.first_name.unwrap_or_default().trim(),
                    "last_name": request.last_name.unwrap_or_default().trim(),
                    "role": role,
                    "language": language,
                    "is_verified": false,
                    "verification_token": hash_token(&verification_token),
                }),
            )
            .await
            .map_err(|e| if is_unique_violation(&e) { AuthError::UserExists } else { e.into() })?;

        info!("Registered {} user {}", role, row.id);

        match role {
            Role::Doctor => {
                self.profiles().create_doctor_profile(row.id, language).await?;
            }
            _ => {
                self.profiles().create_client_profile(row.id).await?;
            }
        }

        let requires_verification = row.email.is_some();
        if let Some(ref address) = row.email {
            send_best_effort(
                self.mailer.as_ref(),
                address,
                verification_email(&self.config.frontend_url, &verification_token),
            )
            .await;
        }

        Ok((PublicUser::from_row(row, None), requires_verification))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<(PublicUser, String), AuthError> {
        let email = request.email.as_deref().map(|e| e.trim().to_lowercase());
        let row = self
            .find_by_contact(email.as_deref(), request.phone.as_deref().map(str::trim))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password = request.password.unwrap_or_default();
        let matches = verify_password(&password, &row.password_hash).unwrap_or_else(|e| {
            warn!("Stored password hash for {} is unreadable: {}", row.id, e);
            false
        });
        if !matches {
            debug!("Password mismatch for {}", row.id);
            return Err(AuthError::InvalidCredentials);
        }

        // Phone-only accounts have nothing to verify.
        if row.email.is_some() && !row.is_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let token = issue_token(row.id, row.role, &self.config.jwt_secret, self.config.jwt_expires_hours)
            .map_err(AuthError::Token)?;

        info!("User {} logged in", row.id);
        Ok((self.with_photo(row).await?, token))
    }

    pub async fn me(&self, user: &AuthUser) -> Result<PublicUser, AuthError> {
        let row: UserRow = self
            .supabase
            .select_one("users", &format!("id=eq.{}&select={}", user.id, USER_ROW_COLUMNS))
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.with_photo(row).await
    }

    pub async fn update_language(&self, user: &AuthUser, language: Option<&str>) -> Result<Language, AuthError> {
        let language: Language = language
            .and_then(|l| l.parse().ok())
            .ok_or(AuthError::InvalidLanguage)?;

        let updated: Vec<UserRow> = self
            .supabase
            .update(
                "users",
                &format!("id=eq.{}&select={}", user.id, USER_ROW_COLUMNS),
                json!({ "language": language, "updated_at": Utc::now() }),
            )
            .await?;
        if updated.is_empty() {
            return Err(AuthError::UserNotFound);
        }

        debug!("User {} switched language to {}", user.id, language.as_str());
        Ok(language)
    }

    /// Never reveals whether the account exists.
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<Option<ResetTicket>, AuthError> {
        let email = request.email.as_deref().map(|e| e.trim().to_lowercase());
        let Some(row) = self
            .find_by_contact(email.as_deref(), request.phone.as_deref().map(str::trim))
            .await?
        else {
            debug!("Password reset requested for unknown contact");
            return Ok(None);
        };

        let token = generate_token();
        let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        let _: Vec<UserRow> = self
            .supabase
            .update(
                "users",
                &format!("id=eq.{}&select={}", row.id, USER_ROW_COLUMNS),
                json!({ "reset_token": hash_token(&token), "reset_token_expires": expires }),
            )
            .await?;

        let (subject, body) = password_reset_email(&self.config.frontend_url, &token);
        if let Some(ref address) = row.email {
            send_best_effort(self.mailer.as_ref(), address, (subject, body)).await;
        }

        info!("Password reset issued for user {}", row.id);
        let url = format!("{}/reset-password?token={}", self.config.frontend_url.trim_end_matches('/'), token);
        Ok(Some(ResetTicket { token, url }))
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), AuthError> {
        let token = request.token.unwrap_or_default();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let row: UserRow = self
            .supabase
            .select_one(
                "users",
                &format!(
                    "reset_token=eq.{}&reset_token_expires=gt.{}&select={}",
                    encode(&hash_token(&token)),
                    now,
                    USER_ROW_COLUMNS
                ),
            )
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password_hash = hash_password(&request.password.unwrap_or_default())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let _: Vec<UserRow> = self
            .supabase
            .update(
                "users",
                &format!("id=eq.{}&select={}", row.id, USER_ROW_COLUMNS),
                json!({
                    "password_hash": password_hash,
                    "reset_token": null,
                    "reset_token_expires": null,
                    "updated_at": Utc::now(),
                }),
            )
            .await?;

        info!("Password reset completed for user {}", row.id);
        Ok(())
    }

    pub async fn verify_email(&self, token: Option<&str>) -> Result<(), AuthError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::VerificationTokenRequired)?;

        let row: UserRow = self
            .supabase
            .select_one(
                "users",
                &format!("verification_token=eq.{}&select={}", encode(&hash_token(token)), USER_ROW_COLUMNS),
            )
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;

        if row.is_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let _: Vec<UserRow> = self
            .supabase
            .update(
                "users",
                &format!("id=eq.{}&select={}", row.id, USER_ROW_COLUMNS),
                json!({ "is_verified": true, "verification_token": null, "updated_at": Utc::now() }),
            )
            .await?;

        info!("Email verified for user {}", row.id);
        Ok(())
    }

    /// Unlike the other mail paths, a delivery failure here is an error.
    pub async fn resend_verification(&self, email: Option<&str>) -> Result<(), AuthError> {
        let email = email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or(AuthError::EmailRequired)?;

        let Some(row) = self.find_by_contact(Some(&email), None).await? else {
            debug!("Verification resend requested for unknown email");
            return Ok(());
        };
        if row.is_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let token = generate_token();
        let _: Vec<UserRow> = self
            .supabase
            .update(
                "users",
                &format!("id=eq.{}&select={}", row.id, USER_ROW_COLUMNS),
                json!({ "verification_token": hash_token(&token) }),
            )
            .await?;

        let (subject, body) = verification_email(&self.config.frontend_url, &token);
        self.mailer
            .send(&email, &subject, &body)
            .await
            .map_err(|e| AuthError::EmailDelivery(e.to_string()))?;

        info!("Verification email re-sent to user {}", row.id);
        Ok(())
    }
}
