//! Reading use cases
//!
//! Three orchestrators compose the store and collaborators and enforce the
//! reading lifecycle:
//! - [`CreateReading`]: duplicate-window guard, image extraction, persist
//! - [`ConfirmReading`]: one-time confirmation via the store's atomic update
//! - [`ListReadings`]: customer listing, empty result is reported as not found

pub mod confirm_reading;
pub mod create_reading;
pub mod extraction;
pub mod list_readings;

#[cfg(test)]
pub(crate) mod test_support;

pub use confirm_reading::{ConfirmReading, ConfirmReadingInput, ConfirmReadingOutput};
pub use create_reading::{CreateReading, CreateReadingInput, CreateReadingOutput};
pub use extraction::extract_number;
pub use list_readings::{ListReadings, ListReadingsInput, ListReadingsOutput, MeasureSummary};

use thiserror::Error;

use crate::services::{ReaderError, StoreError};

/// Reading lifecycle failures
///
/// The first six variants are the domain taxonomy, each with a fixed message.
/// `Store`, `Reader` and `Storage` wrap unexpected collaborator failures.
#[derive(Debug, Error)]
pub enum ReadingError {
    #[error("Reading for this month has already been submitted")]
    ReadingAlreadyExists,

    #[error("Failed to generate content from the image")]
    ContentGenerationError,

    #[error("Failed to extract a number from the image content")]
    NumberExtractionError,

    #[error("Reading not found")]
    ReadingNotFound,

    #[error("Reading has already been confirmed")]
    DuplicateReading,

    #[error("No readings found")]
    ReadingsNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("Image storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl ReadingError {
    /// Whether this is one of the domain kinds (as opposed to an opaque failure)
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            ReadingError::Store(_) | ReadingError::Reader(_) | ReadingError::Storage(_)
        )
    }
}
