//! Uploaded files (room images, payment proofs), served back under `/storage`.

use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use uuid::Uuid;

use crate::{AppError, AppResult};

/// Maximum upload size (5MB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp", "pdf"];

pub const PUBLIC_PREFIX: &str = "/storage";

#[derive(Debug, Clone, Copy)]
pub enum Bucket {
    RoomImages,
    PaymentProofs,
}

impl Bucket {
    fn dir(&self) -> &'static str {
        match self {
            Bucket::RoomImages => "room-images",
            Bucket::PaymentProofs => "payment-proofs",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

fn extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?.to_lowercase();
    SUPPORTED_FORMATS.contains(&ext.as_str()).then_some(ext)
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Storage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under a fresh name and returns its public URL.
    pub async fn save(&self, bucket: Bucket, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::bad_request("the uploaded file is empty"));
        }
        if bytes.len() > MAX_FILE_SIZE {
            return Err(AppError::status(StatusCode::PAYLOAD_TOO_LARGE, "files must be 5MB or smaller"));
        }
        let Some(ext) = extension(original_name) else {
            return Err(AppError::bad_request(format!(
                "unsupported file type, use one of: {}",
                SUPPORTED_FORMATS.join(", ")
            )));
        };

        let dir = self.root.join(bucket.dir());
        tokio::fs::create_dir_all(&dir).await?;

        let filename = format!("{}.{ext}", Uuid::now_v7().simple());
        tokio::fs::write(dir.join(&filename), bytes).await?;
        tracing::info!(bucket = bucket.dir(), %filename, size = bytes.len(), "stored upload {original_name}");

        Ok(format!("{PUBLIC_PREFIX}/{}/{filename}", bucket.dir()))
    }
}
