//! Collaborator seams for the reading use cases
//!
//! The use cases only see these traits. Production implementations:
//! - [`ReadingStore`]: [`crate::db::SqliteReadingStore`]
//! - [`ImageReader`]: [`gemini_client::GeminiClient`]
//! - [`ImageStorage`]: [`image_storage::LocalImageStorage`]

pub mod gemini_client;
pub mod image_storage;

pub use gemini_client::GeminiClient;
pub use image_storage::LocalImageStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{MeasureType, Reading, UpdateStatus};

/// Reading store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Reading {0} already exists")]
    DuplicateId(Uuid),

    /// Another reading already holds this customer+category+month
    #[error("{measure_type} reading for {customer_code} already exists in {month}")]
    MonthTaken {
        customer_code: String,
        measure_type: MeasureType,
        month: String,
    },

    #[error("Corrupt reading row: {0}")]
    Corrupt(String),
}

/// Persistence contract for readings
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist a new reading
    ///
    /// Fails with [`StoreError::MonthTaken`] when the customer already has a
    /// reading of this category in the same calendar month.
    async fn save(&self, reading: &Reading) -> Result<(), StoreError>;

    /// All readings for a customer, optionally filtered by category
    ///
    /// An empty vector is a valid result.
    async fn list(
        &self,
        customer_code: &str,
        measure_type: Option<MeasureType>,
    ) -> Result<Vec<Reading>, StoreError>;

    /// Atomically confirm a reading
    ///
    /// At most one call per reading ever returns [`UpdateStatus::Updated`].
    async fn update(&self, reading_id: Uuid, confirmed_value: f64) -> Result<UpdateStatus, StoreError>;

    /// Whether a reading of this customer+category exists in the calendar
    /// month containing `measure_datetime`
    async fn check_exist_reading(
        &self,
        customer_code: &str,
        measure_type: MeasureType,
        measure_datetime: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

/// Image extraction service errors, one variant per failing step
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Failed to upload image: {0}")]
    Upload(String),

    #[error("Failed to get file metadata: {0}")]
    Metadata(String),

    #[error("Failed to generate content: {0}")]
    Generation(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// File handle returned by the extraction service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Resource name (e.g. `files/abc123`)
    pub name: String,
    /// URI usable in content generation requests
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Image understanding contract
#[async_trait]
pub trait ImageReader: Send + Sync {
    /// Upload a local image file
    async fn upload_image(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, ReaderError>;

    /// Resolve a file name to its current metadata
    async fn get_file_metadata(&self, name: &str) -> Result<RemoteFile, ReaderError>;

    /// Ask a question about an uploaded file
    ///
    /// An empty answer is not an error at this level.
    async fn generate_content(
        &self,
        file_uri: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, ReaderError>;
}

/// Location of a stored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: PathBuf,
    pub url: String,
}

/// Image file persistence
#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn store(&self, bytes: &[u8], mime_type: &str) -> std::io::Result<StoredImage>;

    /// Remove an image no reading refers to
    async fn discard(&self, image: &StoredImage) -> std::io::Result<()>;
}
