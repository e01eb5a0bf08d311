use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::i18n::Translator;
use crate::mailer::{mailer_from_config, EmailSender};
use crate::realtime::RealtimeHub;
use crate::uploads::UploadStore;

/// Everything a handler needs, built once at startup and shared via `Arc`.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<SupabaseClient>,
    pub mailer: Arc<dyn EmailSender>,
    pub uploads: UploadStore,
    pub i18n: Arc<Translator>,
    pub hub: RealtimeHub,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Self {
        let db = Arc::new(SupabaseClient::new(&config));
        let mailer: Arc<dyn EmailSender> = Arc::from(mailer_from_config(&config));
        let uploads = UploadStore::new(&config.upload_dir, config.max_upload_bytes);
        let i18n = Arc::new(Translator::load(&config.locales_dir));

        Self {
            config: Arc::new(config),
            db,
            mailer,
            uploads,
            i18n,
            hub: RealtimeHub::new(),
        }
    }

    pub fn t(&self, locale: &str, key: &str, fallback: &str) -> String {
        self.i18n.t(locale, key, fallback)
    }
}
