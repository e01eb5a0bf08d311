use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_PAYMENT_PHONE: &str = "+222 45 25 25 25";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub jwt_expires_hours: i64,
    pub frontend_url: String,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub smtp_url: Option<String>,
    pub smtp_from: String,
    pub payment_phone: String,
    pub locales_dir: String,
    pub app_env: String,
    pub port: u16,
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn with_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: required("SUPABASE_URL"),
            supabase_service_key: required("SUPABASE_SERVICE_KEY"),
            jwt_secret: required("JWT_SECRET"),
            jwt_expires_hours: parsed("JWT_EXPIRES_HOURS", 24 * 7),
            frontend_url: with_default("FRONTEND_URL", "http://localhost:5173"),
            upload_dir: with_default("UPLOAD_DIR", "uploads"),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            smtp_url: env::var("SMTP_URL").ok().filter(|v| !v.is_empty()),
            smtp_from: with_default("SMTP_FROM", "no-reply@localhost"),
            payment_phone: with_default("PAYMENT_PHONE", DEFAULT_PAYMENT_PHONE),
            locales_dir: with_default("LOCALES_DIR", "locales"),
            app_env: with_default("APP_ENV", "development"),
            port: parsed("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if config.smtp_url.is_none() {
            warn!("SMTP_URL not set, outgoing email is disabled");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
