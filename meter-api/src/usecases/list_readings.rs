//! List-readings use case

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::ReadingError;
use crate::models::{MeasureType, Reading};
use crate::services::ReadingStore;

#[derive(Debug, Clone)]
pub struct ListReadingsInput {
    pub customer_code: String,
    pub measure_type: Option<MeasureType>,
}

/// Presentation fields of one reading
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureSummary {
    pub id: Uuid,
    pub measure_datetime: DateTime<Utc>,
    pub measure_type: MeasureType,
    pub confirmed: bool,
    pub image_url: String,
}

impl From<&Reading> for MeasureSummary {
    fn from(reading: &Reading) -> Self {
        Self {
            id: reading.id(),
            measure_datetime: reading.measure_datetime(),
            measure_type: reading.measure_type(),
            confirmed: reading.confirmed(),
            image_url: reading.image_url().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListReadingsOutput {
    pub customer_code: String,
    pub measures: Vec<MeasureSummary>,
}

pub struct ListReadings {
    store: Arc<dyn ReadingStore>,
}

impl ListReadings {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, input: ListReadingsInput) -> Result<ListReadingsOutput, ReadingError> {
        let readings = self
            .store
            .list(&input.customer_code, input.measure_type)
            .await?;

        if readings.is_empty() {
            tracing::debug!(customer_code = %input.customer_code, "No readings for customer");
            return Err(ReadingError::ReadingsNotFound);
        }

        Ok(ListReadingsOutput {
            customer_code: input.customer_code,
            measures: readings.iter().map(MeasureSummary::from).collect(),
        })
    }
}
