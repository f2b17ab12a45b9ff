//! In-process reading store
//!
//! Holds readings in a map behind a mutex. Used by `--in-memory` runs and by
//! tests that exercise the use cases without SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{MeasureType, Reading, UpdateStatus};
use crate::services::{ReadingStore, StoreError};
use meter_common::time::{month_key, month_window};

#[derive(Default)]
pub struct MemoryReadingStore {
    readings: Mutex<HashMap<Uuid, Reading>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.readings.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.lock().await.is_empty()
    }

    pub async fn get(&self, id: Uuid) -> Option<Reading> {
        self.readings.lock().await.get(&id).cloned()
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn save(&self, reading: &Reading) -> Result<(), StoreError> {
        let mut readings = self.readings.lock().await;
        if readings.contains_key(&reading.id()) {
            return Err(StoreError::DuplicateId(reading.id()));
        }

        let month = month_key(&reading.measure_datetime());
        let taken = readings.values().any(|r| {
            r.customer_code() == reading.customer_code()
                && r.measure_type() == reading.measure_type()
                && month_key(&r.measure_datetime()) == month
        });
        if taken {
            return Err(StoreError::MonthTaken {
                customer_code: reading.customer_code().to_string(),
                measure_type: reading.measure_type(),
                month,
            });
        }
        readings.insert(reading.id(), reading.clone());
        Ok(())
    }

    async fn list(
        &self,
        customer_code: &str,
        measure_type: Option<MeasureType>,
    ) -> Result<Vec<Reading>, StoreError> {
        let readings = self.readings.lock().await;
        let mut matching: Vec<Reading> = readings
            .values()
            .filter(|r| r.customer_code() == customer_code)
            .filter(|r| measure_type.map_or(true, |t| r.measure_type() == t))
            .cloned()
            .collect();
        matching.sort_by_key(|r| (r.measure_datetime(), r.created_at()));
        Ok(matching)
    }

    async fn update(&self, reading_id: Uuid, confirmed_value: f64) -> Result<UpdateStatus, StoreError> {
        // Check and write happen under one lock
        let mut readings = self.readings.lock().await;
        let Some(reading) = readings.get_mut(&reading_id) else {
            return Ok(UpdateStatus::NotFound);
        };

        Ok(match reading.confirm(confirmed_value, meter_common::time::now()) {
            Ok(()) => UpdateStatus::Updated,
            Err(_) => UpdateStatus::Duplicate,
        })
    }

    async fn check_exist_reading(
        &self,
        customer_code: &str,
        measure_type: MeasureType,
        measure_datetime: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let (start, end) = month_window(measure_datetime);
        let readings = self.readings.lock().await;
        Ok(readings.values().any(|r| {
            r.customer_code() == customer_code
                && r.measure_type() == measure_type
                && r.measure_datetime() >= start
                && r.measure_datetime() < end
        }))
    }
}
