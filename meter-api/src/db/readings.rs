//! SQLite reading store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::reading::ReadingProps;
use crate::models::{MeasureType, Reading, UpdateStatus};
use crate::services::{ReadingStore, StoreError};
use meter_common::time::{format_timestamp, month_key, month_window, parse_timestamp};

pub struct SqliteReadingStore {
    pool: SqlitePool,
}

impl SqliteReadingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn corrupt(e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

fn row_to_reading(row: &SqliteRow) -> Result<Reading, StoreError> {
    let id: String = row.get("id");
    let measure_type: String = row.get("measure_type");
    let measure_datetime: String = row.get("measure_datetime");
    let created_at: String = row.get("created_at");
    let updated_at: Option<String> = row.get("updated_at");

    Ok(Reading::with(ReadingProps {
        id: Uuid::parse_str(&id).map_err(corrupt)?,
        customer_code: row.get("customer_code"),
        measure_type: measure_type.parse().map_err(corrupt)?,
        measure_datetime: parse_timestamp(&measure_datetime).map_err(corrupt)?,
        value: row.get("value"),
        image_url: row.get("image_url"),
        confirmed: row.get::<i64, _>("confirmed") != 0,
        created_at: parse_timestamp(&created_at).map_err(corrupt)?,
        updated_at: updated_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(corrupt)?,
    }))
}

#[async_trait]
impl ReadingStore for SqliteReadingStore {
    async fn save(&self, reading: &Reading) -> Result<(), StoreError> {
        let month = month_key(&reading.measure_datetime());

        let result = sqlx::query(
            r#"
            INSERT INTO readings (
                id, customer_code, measure_type, measure_datetime, measure_month,
                value, image_url, confirmed, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reading.id().to_string())
        .bind(reading.customer_code())
        .bind(reading.measure_type().as_str())
        .bind(format_timestamp(&reading.measure_datetime()))
        .bind(&month)
        .bind(reading.value())
        .bind(reading.image_url())
        .bind(reading.confirmed() as i64)
        .bind(format_timestamp(&reading.created_at()))
        .bind(reading.updated_at().map(|dt| format_timestamp(&dt)))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // The message names the columns of the violated constraint
                if db_err.message().contains("measure_month") {
                    Err(StoreError::MonthTaken {
                        customer_code: reading.customer_code().to_string(),
                        measure_type: reading.measure_type(),
                        month,
                    })
                } else {
                    Err(StoreError::DuplicateId(reading.id()))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(
        &self,
        customer_code: &str,
        measure_type: Option<MeasureType>,
    ) -> Result<Vec<Reading>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_code, measure_type, measure_datetime,
                   value, image_url, confirmed, created_at, updated_at
            FROM readings
            WHERE customer_code = ?
              AND (? IS NULL OR measure_type = ?)
            ORDER BY measure_datetime, created_at
            "#,
        )
        .bind(customer_code)
        .bind(measure_type.map(|t| t.as_str()))
        .bind(measure_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reading).collect()
    }

    async fn update(&self, reading_id: Uuid, confirmed_value: f64) -> Result<UpdateStatus, StoreError> {
        let id = reading_id.to_string();

        // Conditional write: only an unconfirmed row can change
        let result = sqlx::query(
            r#"
            UPDATE readings
            SET value = ?, confirmed = 1, updated_at = ?
            WHERE id = ? AND confirmed = 0
            "#,
        )
        .bind(confirmed_value)
        .bind(format_timestamp(&meter_common::time::now()))
        .bind(&id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(UpdateStatus::Updated);
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT confirmed FROM readings WHERE id = ?")
            .bind(&id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match exists {
            Some(_) => UpdateStatus::Duplicate,
            None => UpdateStatus::NotFound,
        })
    }

    async fn check_exist_reading(
        &self,
        customer_code: &str,
        measure_type: MeasureType,
        measure_datetime: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let (start, end) = month_window(measure_datetime);

        let found: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1 FROM readings
            WHERE customer_code = ?
              AND measure_type = ?
              AND measure_datetime >= ?
              AND measure_datetime < ?
            LIMIT 1
            "#,
        )
        .bind(customer_code)
        .bind(measure_type.as_str())
        .bind(format_timestamp(&start))
        .bind(format_timestamp(&end))
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }
}
