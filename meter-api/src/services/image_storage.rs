//! Local image storage
//!
//! Decoded upload images are written to `<root>/temp/<uuid>.<ext>` and served
//! back under `{public_base_url}/temp/<uuid>.<ext>`.

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use super::{ImageStorage, StoredImage};
use meter_common::config::TEMP_DIR_NAME;

pub struct LocalImageStorage {
    directory: PathBuf,
    public_base_url: String,
}

impl LocalImageStorage {
    pub fn new(directory: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            directory,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// File extension for an `image/<subtype>` mime type
///
/// Non-alphanumeric subtypes fall back to `bin`.
pub fn extension_for(mime_type: &str) -> &str {
    let subtype = mime_type.rsplit('/').next().unwrap_or_default();
    if !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric()) {
        subtype
    } else {
        "bin"
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn store(&self, bytes: &[u8], mime_type: &str) -> std::io::Result<StoredImage> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(mime_type));
        let path = self.directory.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored upload image");

        Ok(StoredImage {
            url: format!("{}/{}/{}", self.public_base_url, TEMP_DIR_NAME, file_name),
            path,
        })
    }

    async fn discard(&self, image: &StoredImage) -> std::io::Result<()> {
        tokio::fs::remove_file(&image.path).await?;
        tracing::debug!(path = %image.path.display(), "Discarded upload image");
        Ok(())
    }
}
