use std::collections::HashMap;
use std::convert::Infallible;
use std::path::Path;

use axum::extract::FromRequestParts;
use axum::http::{header::ACCEPT_LANGUAGE, request::Parts};
use tracing::{info, warn};

use shared_models::auth::AuthUser;

pub const DEFAULT_LOCALE: &str = "fr";

/// Flat key → message catalogs, one per locale.
#[derive(Debug, Default, Clone)]
pub struct Translator {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl Translator {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads every `<locale>.json` in `dir`. Unreadable files are skipped.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let mut catalogs = HashMap::new();
        let dir = dir.as_ref();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Locales directory {} unavailable: {}", dir.display(), e);
                return Self { catalogs };
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).map_err(|e| e.to_string()));
            match parsed {
                Ok(catalog) => {
                    info!("Loaded {} messages for locale {}", catalog.len(), locale);
                    catalogs.insert(locale, catalog);
                }
                Err(e) => warn!("Skipping locale file {}: {}", path.display(), e),
            }
        }

        Self { catalogs }
    }

    pub fn with_catalog(mut self, locale: &str, entries: &[(&str, &str)]) -> Self {
        let catalog = self.catalogs.entry(locale.to_string()).or_default();
        for (key, value) in entries {
            catalog.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Looks `key` up in `locale`; the call site's literal is the fallback.
    pub fn t(&self, locale: &str, key: &str, fallback: &str) -> String {
        self.catalogs
            .get(locale)
            .and_then(|catalog| catalog.get(key))
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Request locale: the signed-in user's language, else `Accept-Language`, else French.
#[derive(Debug, Clone, PartialEq)]
pub struct Locale(pub String);

impl Locale {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LOCALE.to_string())
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(Locale(user.language.locale().to_string()));
        }

        let header = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        Ok(parse_accept_language(header).map(Locale).unwrap_or_default())
    }
}

fn parse_accept_language(header: &str) -> Option<String> {
    header
        .split(',')
        .filter_map(|part| part.split(';').next())
        .map(|tag| tag.trim().to_ascii_lowercase())
        .filter_map(|tag| tag.split('-').next().map(str::to_string))
        .find(|primary| matches!(primary.as_str(), "fr" | "ar" | "en"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_keys_fall_back_to_literal() {
        let tr = Translator::empty().with_catalog("fr", &[("booking.notFound", "Réservation introuvable")]);
        assert_eq!(tr.t("fr", "booking.notFound", "Booking not found"), "Réservation introuvable");
        assert_eq!(tr.t("ar", "booking.notFound", "Booking not found"), "Booking not found");
        assert_eq!(tr.t("fr", "unknown", "Fallback"), "Fallback");
    }

    #[test]
    fn loads_catalogs_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("ar.json")).unwrap();
        write!(file, "{{\"auth.invalidCredentials\": \"بيانات غير صحيحة\"}}").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let tr = Translator::load(dir.path());
        assert_eq!(tr.t("ar", "auth.invalidCredentials", "Invalid credentials"), "بيانات غير صحيحة");
        assert_eq!(tr.t("broken", "x", "fallback"), "fallback");
    }

    #[test]
    fn accept_language_picks_first_supported() {
        assert_eq!(parse_accept_language("de-DE, ar-MR;q=0.8, fr;q=0.5"), Some("ar".into()));
        assert_eq!(parse_accept_language("de"), None);
        assert_eq!(parse_accept_language(""), None);
    }
}
