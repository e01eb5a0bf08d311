use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PAYMENT_PHONE};
use shared_database::SupabaseClient;
use shared_models::auth::{AuthUser, Language, Role};

use crate::i18n::Translator;
use crate::jwt::issue_token;
use crate::mailer::{EmailSender, NoopMailer};
use crate::realtime::RealtimeHub;
use crate::state::AppState;
use crate::uploads::UploadStore;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub upload_dir: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            upload_dir: std::env::temp_dir().join("therapy-test-uploads").display().to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase(supabase_url: &str) -> Self {
        Self { supabase_url: supabase_url.to_string(), ..Self::default() }
    }

    pub fn with_upload_dir(mut self, dir: &Path) -> Self {
        self.upload_dir = dir.display().to_string();
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_expires_hours: 24,
            frontend_url: "http://localhost:5173".to_string(),
            upload_dir: self.upload_dir.clone(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            smtp_url: None,
            smtp_from: "no-reply@localhost".to_string(),
            payment_phone: DEFAULT_PAYMENT_PHONE.to_string(),
            locales_dir: "locales".to_string(),
            app_env: "test".to_string(),
            port: 3000,
        }
    }

    /// State wired to the configured PostgREST URL, with email disabled.
    pub fn to_state(&self) -> Arc<AppState> {
        self.to_state_with_mailer(Arc::new(NoopMailer))
    }

    pub fn to_state_with_mailer(&self, mailer: Arc<dyn EmailSender>) -> Arc<AppState> {
        let config = self.to_app_config();
        Arc::new(AppState {
            db: Arc::new(SupabaseClient::new(&config)),
            mailer,
            uploads: UploadStore::new(&config.upload_dir, config.max_upload_bytes),
            i18n: Arc::new(Translator::empty()),
            hub: RealtimeHub::new(),
            config: Arc::new(config),
        })
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// Id of the role profile row (client_profiles / doctor_profiles).
    pub profile_id: Uuid,
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
            profile_id: Uuid::new_v4(),
        }
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, Role::Client)
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email.clone()),
            phone: None,
            first_name: "Test".to_string(),
            last_name: self.role.as_str().to_lowercase(),
            role: self.role,
            language: Language::French,
            is_verified: true,
            created_at: Some(Utc::now()),
        }
    }

    /// Row as returned from `users`.
    pub fn user_row(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "phone": null,
            "first_name": "Test",
            "last_name": self.role.as_str().to_lowercase(),
            "role": self.role,
            "language": "FRENCH",
            "is_verified": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn profile_row(&self) -> Value {
        match self.role {
            Role::Doctor => MockSupabaseResponses::doctor_profile(self.profile_id, self.id),
            _ => MockSupabaseResponses::client_profile(self.profile_id, self.id),
        }
    }
}

/// Captures outgoing mail as `(to, subject, body)`.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_string(), subject.to_string(), body.to_string()));
        }
        Ok(())
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(user.id, user.role, secret, exp_hours.unwrap_or(24)).expect("test token")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn client_profile(id: Uuid, user_id: Uuid) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "date_of_birth": null,
            "address": null,
            "city": null,
            "country": null,
            "profile_photo": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_profile(id: Uuid, user_id: Uuid) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "bio": "Clinical psychologist",
            "specialization": ["Anxiety", "Depression"],
            "languages": ["FRENCH", "ARABIC"],
            "hourly_rate": 500.0,
            "available_hours": { "monday": ["09:00-12:00"] },
            "profile_photo": null,
            "is_verified": true,
            "rating": 0.0,
            "total_reviews": 0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn booking(id: Uuid, client_id: Uuid, doctor_id: Uuid, status: &str) -> Value {
        json!({
            "id": id,
            "client_id": client_id,
            "doctor_id": doctor_id,
            "session_date": (Utc::now() + Duration::days(2)).to_rfc3339(),
            "session_duration": 60,
            "session_type": "video",
            "status": status,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn payment(id: Uuid, booking_id: Uuid, client_id: Uuid, status: &str) -> Value {
        json!({
            "id": id,
            "booking_id": booking_id,
            "client_id": client_id,
            "amount": 500.0,
            "currency": "MRU",
            "payment_method": "manual",
            "screenshot": "/uploads/payments/payment-1-1.png",
            "status": status,
            "verified_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn message(id: Uuid, sender_id: Uuid, receiver_id: Uuid, content: &str, created_at: &str) -> Value {
        json!({
            "id": id,
            "sender_id": sender_id,
            "receiver_id": receiver_id,
            "booking_id": null,
            "content": content,
            "type": "TEXT",
            "is_read": false,
            "created_at": created_at
        })
    }

    pub fn review(id: Uuid, booking_id: Uuid, client_id: Uuid, doctor_id: Uuid, rating: i32) -> Value {
        json!({
            "id": id,
            "booking_id": booking_id,
            "client_id": client_id,
            "doctor_id": doctor_id,
            "rating": rating,
            "comment": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }
}
