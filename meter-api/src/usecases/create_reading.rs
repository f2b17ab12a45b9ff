//! Create-reading use case

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{extract_number, ReadingError};
use crate::models::{MeasureType, Reading};
use crate::services::{ImageReader, ImageStorage, ReadingStore, StoreError, StoredImage};

/// Display name attached to uploaded images
pub const UPLOAD_DISPLAY_NAME: &str = "Meter Image";

/// Prompt sent with every uploaded meter image
pub fn reading_prompt(measure_type: MeasureType) -> String {
    format!("Get the reading value for {}", measure_type)
}

#[derive(Debug, Clone)]
pub struct CreateReadingInput {
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub measure_datetime: DateTime<Utc>,
    /// Decoded image bytes
    pub image: Vec<u8>,
    /// Image mime type, e.g. `image/jpeg`
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateReadingOutput {
    pub id: Uuid,
    pub value: f64,
    pub image_url: String,
}

pub struct CreateReading {
    store: Arc<dyn ReadingStore>,
    reader: Arc<dyn ImageReader>,
    images: Arc<dyn ImageStorage>,
}

impl CreateReading {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        reader: Arc<dyn ImageReader>,
        images: Arc<dyn ImageStorage>,
    ) -> Self {
        Self { store, reader, images }
    }

    pub async fn execute(&self, input: CreateReadingInput) -> Result<CreateReadingOutput, ReadingError> {
        // Guard before any remote call
        let exists = self
            .store
            .check_exist_reading(&input.customer_code, input.measure_type, input.measure_datetime)
            .await?;

        if exists {
            warn!(
                customer_code = %input.customer_code,
                measure_type = %input.measure_type,
                measure_datetime = %input.measure_datetime,
                "Rejected duplicate reading for month"
            );
            return Err(ReadingError::ReadingAlreadyExists);
        }

        let stored = self.images.store(&input.image, &input.mime_type).await?;

        match self.read_and_save(input, &stored).await {
            Ok(output) => Ok(output),
            Err(err) => {
                if let Err(e) = self.images.discard(&stored).await {
                    warn!(path = %stored.path.display(), error = %e, "Failed to discard upload image");
                }
                Err(err)
            }
        }
    }

    /// Extraction and persistence once the image is on disk
    async fn read_and_save(
        &self,
        input: CreateReadingInput,
        stored: &StoredImage,
    ) -> Result<CreateReadingOutput, ReadingError> {
        let uploaded = self
            .reader
            .upload_image(&stored.path, &input.mime_type, UPLOAD_DISPLAY_NAME)
            .await?;
        let metadata = self.reader.get_file_metadata(&uploaded.name).await?;
        let content = self
            .reader
            .generate_content(&metadata.uri, &input.mime_type, &reading_prompt(input.measure_type))
            .await?;

        let value = extract_number(&content)?;

        let reading = Reading::create(
            input.customer_code,
            input.measure_type,
            input.measure_datetime,
            value,
            stored.url.clone(),
        );

        // The unique month key settles uploads that raced past the guard
        match self.store.save(&reading).await {
            Ok(()) => {}
            Err(StoreError::MonthTaken { .. }) => {
                warn!(
                    customer_code = %reading.customer_code(),
                    measure_type = %reading.measure_type(),
                    "Concurrent reading for month already saved"
                );
                return Err(ReadingError::ReadingAlreadyExists);
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            reading_id = %reading.id(),
            customer_code = %reading.customer_code(),
            measure_type = %reading.measure_type(),
            value = reading.value(),
            "Reading created"
        );

        Ok(CreateReadingOutput {
            id: reading.id(),
            value: reading.value(),
            image_url: reading.image_url().to_string(),
        })
    }
}
