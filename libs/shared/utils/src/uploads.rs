use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use shared_models::error::AppError;

pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File exceeds the {0} byte limit")]
    TooLarge(usize),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => AppError::Internal(e.to_string()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProfilePhoto,
    DoctorPhoto,
    PaymentProof,
}

impl UploadKind {
    fn directory(&self) -> &'static str {
        match self {
            UploadKind::ProfilePhoto => "profiles",
            UploadKind::DoctorPhoto => "doctors",
            UploadKind::PaymentProof => "payments",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            UploadKind::ProfilePhoto => "profile",
            UploadKind::DoctorPhoto => "doctor",
            UploadKind::PaymentProof => "payment",
        }
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        let image = content_type.starts_with("image/");
        match self {
            UploadKind::ProfilePhoto | UploadKind::DoctorPhoto => image,
            UploadKind::PaymentProof => image || content_type == "application/pdf",
        }
    }
}

/// A file part pulled out of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields and file fields of a multipart body, keyed by field name.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
                form.files.insert(name, UploadedFile { file_name, content_type, bytes: bytes.to_vec() });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Non-empty trimmed text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Local disk storage for uploaded files, served back under `/uploads`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self { root: root.into(), max_bytes }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn check(&self, kind: UploadKind, file: &UploadedFile) -> Result<(), UploadError> {
        if file.bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge(self.max_bytes));
        }
        if !kind.accepts(&file.content_type) {
            return Err(UploadError::UnsupportedType(file.content_type.clone()));
        }
        Ok(())
    }

    /// Writes the file under a fresh unique name and returns its public path.
    pub async fn save(&self, kind: UploadKind, file: &UploadedFile) -> Result<String, UploadError> {
        self.check(kind, file)?;

        let dir = self.root.join(kind.directory());
        tokio::fs::create_dir_all(&dir).await?;

        let name = unique_file_name(kind.prefix(), file);
        tokio::fs::write(dir.join(&name), &file.bytes).await?;

        info!("Stored {} upload {} ({} bytes)", kind.prefix(), name, file.bytes.len());
        Ok(format!("{}/{}/{}", PUBLIC_PREFIX, kind.directory(), name))
    }
}

fn unique_file_name(prefix: &str, file: &UploadedFile) -> String {
    let ext = extension_for(file);
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let name = format!("{}-{}-{}.{}", prefix, Utc::now().timestamp_millis(), suffix, ext);
    debug!("Generated upload name {}", name);
    name
}

fn extension_for(file: &UploadedFile) -> String {
    let from_name = file
        .file_name
        .as_deref()
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| match file.content_type.as_str() {
        "image/jpeg" => "jpg".to_string(),
        "image/png" => "png".to_string(),
        "image/webp" => "webp".to_string(),
        "application/pdf" => "pdf".to_string(),
        _ => "bin".to_string(),
    })
}
