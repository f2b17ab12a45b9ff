//! Fake collaborators for use case tests

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::services::{ImageReader, ImageStorage, ReaderError, RemoteFile, StoredImage};

pub const FAKE_IMAGE_URL: &str = "http://localhost/temp_image.jpeg";

/// Image reader answering every prompt with a fixed text
pub struct FakeReader {
    answer: Result<String, fn() -> ReaderError>,
    upload_delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeReader {
    pub fn answering(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            upload_delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: fn() -> ReaderError) -> Self {
        Self {
            answer: Err(error),
            upload_delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Hold every upload for `delay` before answering
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn file() -> RemoteFile {
        RemoteFile {
            name: "files/image_name".to_string(),
            uri: "http://mock.uri".to_string(),
            mime_type: "image/jpeg".to_string(),
            display_name: Some("Meter Image".to_string()),
            state: Some("ACTIVE".to_string()),
        }
    }
}

#[async_trait]
impl ImageReader for FakeReader {
    async fn upload_image(&self, _path: &Path, _mime: &str, _name: &str) -> Result<RemoteFile, ReaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::file())
    }

    async fn get_file_metadata(&self, _name: &str) -> Result<RemoteFile, ReaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::file())
    }

    async fn generate_content(&self, _uri: &str, _mime: &str, prompt: &str) -> Result<String, ReaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        match &self.answer {
            Ok(text) => Ok(text.clone()),
            Err(make) => Err(make()),
        }
    }
}

/// Image storage that records writes without touching disk
#[derive(Default)]
pub struct FakeStorage {
    pub writes: AtomicUsize,
    pub discards: AtomicUsize,
}

impl FakeStorage {
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn discard_count(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageStorage for FakeStorage {
    async fn store(&self, _bytes: &[u8], _mime_type: &str) -> std::io::Result<StoredImage> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(StoredImage {
            path: PathBuf::from("temp_image.jpeg"),
            url: FAKE_IMAGE_URL.to_string(),
        })
    }

    async fn discard(&self, _image: &StoredImage) -> std::io::Result<()> {
        self.discards.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
