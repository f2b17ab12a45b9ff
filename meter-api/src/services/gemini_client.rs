//! Gemini REST client
//!
//! Implements [`ImageReader`] on top of the Generative Language API:
//! resumable file upload, file metadata lookup, and `generateContent`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{ImageReader, ReaderError, RemoteFile};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const USER_AGENT: &str = concat!("meter-api/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: RemoteFile,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    File { file_data: FileData<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, ReaderError> {
        Self::with_endpoint(api_key, DEFAULT_BASE_URL.to_string(), DEFAULT_MODEL.to_string())
    }

    /// Client against a specific base URL and model
    pub fn with_endpoint(api_key: String, base_url: String, model: String) -> Result<Self, ReaderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReaderError::Upload(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Map an unsuccessful response to a step-specific error
    async fn check_status(
        response: reqwest::Response,
        step: fn(String) -> ReaderError,
    ) -> Result<reqwest::Response, ReaderError> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ReaderError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(step(format!("HTTP {}: {}", status.as_u16(), error_text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl ImageReader for GeminiClient {
    async fn upload_image(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, ReaderError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ReaderError::Upload(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(
            path = %path.display(),
            size = bytes.len(),
            mime_type,
            "Starting Gemini upload session"
        );

        // Step 1: open a resumable upload session
        let start = self
            .http_client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| ReaderError::Upload(e.to_string()))?;

        let start = Self::check_status(start, ReaderError::Upload).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ReaderError::Upload("missing x-goog-upload-url header".to_string()))?;

        // Step 2: send the bytes and finalize
        let finish = self
            .http_client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ReaderError::Upload(e.to_string()))?;

        let finish = Self::check_status(finish, ReaderError::Upload).await?;

        let envelope: FileEnvelope = finish
            .json()
            .await
            .map_err(|e| ReaderError::Parse(e.to_string()))?;

        tracing::info!(file = %envelope.file.name, "Image uploaded to Gemini");

        Ok(envelope.file)
    }

    async fn get_file_metadata(&self, name: &str) -> Result<RemoteFile, ReaderError> {
        let response = self
            .http_client
            .get(format!("{}/v1beta/{}", self.base_url, name))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ReaderError::Metadata(e.to_string()))?;

        let response = Self::check_status(response, ReaderError::Metadata).await?;

        response
            .json::<RemoteFile>()
            .await
            .map_err(|e| ReaderError::Parse(e.to_string()))
    }

    async fn generate_content(
        &self,
        file_uri: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, ReaderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::File {
                        file_data: FileData { mime_type, file_uri },
                    },
                    Part::Text { text: prompt },
                ],
            }],
        };

        tracing::debug!(model = %self.model, file_uri, "Requesting Gemini content generation");

        let response = self
            .http_client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| ReaderError::Generation(e.to_string()))?;

        let response = Self::check_status(response, ReaderError::Generation).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ReaderError::Parse(e.to_string()))?;

        Ok(body.text())
    }
}
