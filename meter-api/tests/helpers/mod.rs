//! Shared helpers for meter-api integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

use meter_api::db::{init_memory_pool, SqliteReadingStore};
use meter_api::services::{ImageReader, LocalImageStorage, ReaderError, RemoteFile};
use meter_api::{build_router, AppState};

/// 1x1 PNG as a data URL
pub const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

pub const TEST_BASE_URL: &str = "http://localhost:3000";

/// Vision model stand-in answering every prompt with the same text
pub struct ScriptedReader {
    answer: String,
    pub calls: AtomicUsize,
}

impl ScriptedReader {
    pub fn answering(text: &str) -> Self {
        Self {
            answer: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn file() -> RemoteFile {
        RemoteFile {
            name: "files/meter".to_string(),
            uri: "https://files.example/meter".to_string(),
            mime_type: "image/png".to_string(),
            display_name: Some("Meter Image".to_string()),
            state: Some("ACTIVE".to_string()),
        }
    }
}

#[async_trait]
impl ImageReader for ScriptedReader {
    async fn upload_image(&self, path: &Path, _mime: &str, _name: &str) -> Result<RemoteFile, ReaderError> {
        assert!(path.exists(), "image must be written before upload");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::file())
    }

    async fn get_file_metadata(&self, _name: &str) -> Result<RemoteFile, ReaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::file())
    }

    async fn generate_content(&self, _uri: &str, _mime: &str, _prompt: &str) -> Result<String, ReaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub reader: Arc<ScriptedReader>,
    pub image_dir: tempfile::TempDir,
}

/// App over an in-memory database, a temp image folder and a scripted reader
pub async fn create_test_app(answer: &str) -> TestApp {
    let pool = init_memory_pool()
        .await
        .expect("Failed to create in-memory database");
    let image_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let reader = Arc::new(ScriptedReader::answering(answer));
    let images = LocalImageStorage::new(image_dir.path().to_path_buf(), TEST_BASE_URL);

    let state = AppState::new(
        Arc::new(SqliteReadingStore::new(pool)),
        reader.clone(),
        Arc::new(images),
        image_dir.path().to_path_buf(),
    );

    TestApp {
        router: build_router(state),
        reader,
        image_dir,
    }
}

/// Send one request and return status plus parsed JSON body (Null when empty)
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(app, method, uri, body.map(|b| b.to_string())).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn send_raw(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(text) => {
            builder = builder.header("content-type", "application/json");
            Body::from(text)
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, bytes)
}
