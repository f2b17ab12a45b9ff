//! Confirm-reading use case
//!
//! The store performs check-and-set atomically; this layer only translates
//! its three-way result. A second confirmation is an error, not a no-op.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ReadingError;
use crate::models::UpdateStatus;
use crate::services::ReadingStore;

#[derive(Debug, Clone, Copy)]
pub struct ConfirmReadingInput {
    pub reading_id: Uuid,
    pub confirmed_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmReadingOutput {
    pub success: bool,
}

pub struct ConfirmReading {
    store: Arc<dyn ReadingStore>,
}

impl ConfirmReading {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, input: ConfirmReadingInput) -> Result<ConfirmReadingOutput, ReadingError> {
        let status = self
            .store
            .update(input.reading_id, input.confirmed_value)
            .await?;

        match status {
            UpdateStatus::NotFound => {
                warn!(reading_id = %input.reading_id, "Confirmation for unknown reading");
                Err(ReadingError::ReadingNotFound)
            }
            UpdateStatus::Duplicate => {
                warn!(reading_id = %input.reading_id, "Reading already confirmed");
                Err(ReadingError::DuplicateReading)
            }
            UpdateStatus::Updated => {
                info!(
                    reading_id = %input.reading_id,
                    confirmed_value = input.confirmed_value,
                    "Reading confirmed"
                );
                Ok(ConfirmReadingOutput { success: true })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryReadingStore;
    use crate::models::{MeasureType, Reading};
    use chrono::{TimeZone, Utc};

    async fn store_with_reading() -> (Arc<MemoryReadingStore>, Uuid) {
        let store = Arc::new(MemoryReadingStore::new());
        let reading = Reading::create(
            "ABC123",
            MeasureType::Water,
            Utc.with_ymd_and_hms(2024, 8, 10, 10, 0, 0).unwrap(),
            100.0,
            "http://localhost/image1.jpeg",
        );
        let id = reading.id();
        store.save(&reading).await.unwrap();
        (store, id)
    }

    fn input(reading_id: Uuid) -> ConfirmReadingInput {
        ConfirmReadingInput {
            reading_id,
            confirmed_value: 150.75,
        }
    }

    #[tokio::test]
    async fn test_confirms_reading() {
        let (store, id) = store_with_reading().await;
        let usecase = ConfirmReading::new(store.clone());

        let output = usecase.execute(input(id)).await.unwrap();

        assert_eq!(output, ConfirmReadingOutput { success: true });
        let saved = store.get(id).await.unwrap();
        assert!(saved.confirmed());
        assert_eq!(saved.value(), 150.75);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (store, _) = store_with_reading().await;
        let usecase = ConfirmReading::new(store);

        let err = usecase.execute(input(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, ReadingError::ReadingNotFound));
    }

    #[tokio::test]
    async fn test_second_confirmation_is_duplicate() {
        let (store, id) = store_with_reading().await;
        let usecase = ConfirmReading::new(store.clone());

        usecase.execute(input(id)).await.unwrap();
        let err = usecase
            .execute(ConfirmReadingInput {
                reading_id: id,
                confirmed_value: 999.0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ReadingError::DuplicateReading));
        assert_eq!(store.get(id).await.unwrap().value(), 150.75);
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_single_success() {
        let (store, id) = store_with_reading().await;
        let usecase = Arc::new(ConfirmReading::new(store));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let usecase = Arc::clone(&usecase);
                tokio::spawn(async move { usecase.execute(input(id)).await })
            })
            .collect();

        let mut successes = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ReadingError::DuplicateReading) => duplicates += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 9);
    }
}
