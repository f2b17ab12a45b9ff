//! Database access for meter-api
//!
//! SQLite database `meter.db` in the root folder, holding the `readings`
//! table.

pub mod memory;
pub mod readings;

pub use memory::MemoryReadingStore;
pub use readings::SqliteReadingStore;

use meter_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Initialize database connection pool
///
/// Creates the database file and schema if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?.busy_timeout(std::time::Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
///
/// One connection keeps every query on the same memory database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the readings table and its lookup index if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS readings (
            id TEXT PRIMARY KEY,
            customer_code TEXT NOT NULL,
            measure_type TEXT NOT NULL CHECK (measure_type IN ('WATER', 'GAS')),
            measure_datetime TEXT NOT NULL,
            measure_month TEXT NOT NULL,
            value REAL NOT NULL,
            image_url TEXT NOT NULL,
            confirmed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            UNIQUE (customer_code, measure_type, measure_month)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_readings_customer_type_datetime
            ON readings (customer_code, measure_type, measure_datetime)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (readings)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_database_pool_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("meter.db");

        let pool = init_database_pool(&db_path).await.unwrap();
        assert!(db_path.exists());

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'readings'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_init_tables_is_idempotent() {
        let pool = init_memory_pool().await.unwrap();
        init_tables(&pool).await.unwrap();
        init_tables(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_measure_type_check_constraint() {
        let pool = init_memory_pool().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO readings (id, customer_code, measure_type, measure_datetime, measure_month, value, image_url, created_at)
             VALUES ('x', 'c', 'ELECTRICITY', '2024-08-01T00:00:00.000Z', '2024-08', 1.0, 'u', '2024-08-01T00:00:00.000Z')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
