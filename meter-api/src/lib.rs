//! meter-api library interface
//!
//! Exposes the application state and router so integration tests can drive
//! the service without binding a socket.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod usecases;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::{ImageReader, ImageStorage, ReadingStore};
use crate::usecases::{ConfirmReading, CreateReading, ListReadings};
use meter_common::config::TEMP_DIR_NAME;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub create_reading: Arc<CreateReading>,
    pub confirm_reading: Arc<ConfirmReading>,
    pub list_readings: Arc<ListReadings>,
    /// Folder served under `/temp`
    pub image_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        reader: Arc<dyn ImageReader>,
        images: Arc<dyn ImageStorage>,
        image_dir: PathBuf,
    ) -> Self {
        Self {
            create_reading: Arc::new(CreateReading::new(store.clone(), reader, images)),
            confirm_reading: Arc::new(ConfirmReading::new(store.clone())),
            list_readings: Arc::new(ListReadings::new(store)),
            image_dir,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let images = ServeDir::new(&state.image_dir);

    Router::new()
        .merge(api::reading_routes())
        .merge(api::health_routes())
        .nest_service(&format!("/{}", TEMP_DIR_NAME), images)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
