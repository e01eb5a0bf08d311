//! Creates the first ADMIN account from `ADMIN_EMAIL` / `ADMIN_PASSWORD`.
//! Does nothing when a user with that email already exists.

use anyhow::{anyhow, bail, Context};
use dotenv::dotenv;
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shared_config::AppConfig;
use shared_database::{encode, SupabaseClient};
use shared_utils::password::hash_password;

const MIN_PASSWORD_LENGTH: usize = 6;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let email = std::env::var("ADMIN_EMAIL")
        .context("ADMIN_EMAIL must be set")?
        .trim()
        .to_lowercase();
    let password = std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?;
    if password.len() < MIN_PASSWORD_LENGTH {
        bail!("ADMIN_PASSWORD must be at least {} characters", MIN_PASSWORD_LENGTH);
    }

    let config = AppConfig::from_env();
    if !config.is_configured() {
        bail!("SUPABASE_URL and SUPABASE_SERVICE_KEY are required");
    }
    let db = SupabaseClient::new(&config);

    let existing: Option<Value> = db
        .select_one("users", &format!("email=eq.{}&select=id,role", encode(&email)))
        .await?;
    if let Some(user) = existing {
        warn!("User {} already exists with role {}, nothing to do", email, user["role"]);
        return Ok(());
    }

    let password_hash = hash_password(&password).map_err(|e| anyhow!("{}", e))?;
    let created: Value = db
        .insert(
            "users",
            json!({
                "email": email,
                "password_hash": password_hash,
                "first_name": std::env::var("ADMIN_FIRST_NAME").unwrap_or_else(|_| "Admin".into()),
                "last_name": std::env::var("ADMIN_LAST_NAME").unwrap_or_else(|_| "User".into()),
                "role": "ADMIN",
                "language": "FRENCH",
                "is_verified": true,
            }),
        )
        .await?;

    info!("Admin {} created with id {}", email, created["id"]);
    Ok(())
}
