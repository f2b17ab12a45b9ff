//! Reading endpoints
//!
//! - `POST /upload`: create a reading from a base64 meter photo
//! - `PATCH /confirm`: confirm or correct a reading's value
//! - `GET /:customer_code/list`: list a customer's readings
//!
//! Request bodies are validated here, before any use case runs.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use base64::Engine;
use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, FieldError};
use crate::models::MeasureType;
use crate::usecases::{
    ConfirmReadingInput, ConfirmReadingOutput, CreateReadingInput, CreateReadingOutput,
    ListReadingsInput, ListReadingsOutput,
};
use crate::AppState;
use meter_common::time::{format_timestamp, parse_datetime_lenient};

/// Capture years whose month window stays within four-digit stored years
const CAPTURE_YEARS: std::ops::RangeInclusive<i32> = 0..=9998;

static DATA_URL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:image/([A-Za-z0-9.+-]+);base64,")
        .unwrap_or_else(|e| panic!("invalid data URL pattern: {}", e))
});

/// POST /upload request body
#[derive(Debug, Default, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub measure_datetime: Option<String>,
    #[serde(default)]
    pub measure_type: Option<String>,
}

/// POST /upload response body
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub image_url: String,
    pub measure_value: f64,
    pub measure_uuid: Uuid,
}

impl From<CreateReadingOutput> for UploadResponse {
    fn from(output: CreateReadingOutput) -> Self {
        Self {
            image_url: output.image_url,
            measure_value: output.value,
            measure_uuid: output.id,
        }
    }
}

/// PATCH /confirm request body
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub measure_uuid: Option<String>,
    #[serde(default)]
    pub confirmed_value: Option<f64>,
}

/// PATCH /confirm response body
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
}

impl From<ConfirmReadingOutput> for ConfirmResponse {
    fn from(output: ConfirmReadingOutput) -> Self {
        Self {
            success: output.success,
        }
    }
}

/// GET /:customer_code/list query string
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub measure_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MeasureResponse {
    pub measure_uuid: Uuid,
    pub measure_datetime: String,
    pub measure_type: MeasureType,
    pub has_confirmed: bool,
    pub image_url: String,
}

/// GET /:customer_code/list response body
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub customer_code: String,
    pub measures: Vec<MeasureResponse>,
}

impl From<ListReadingsOutput> for ListResponse {
    fn from(output: ListReadingsOutput) -> Self {
        Self {
            customer_code: output.customer_code,
            measures: output
                .measures
                .into_iter()
                .map(|m| MeasureResponse {
                    measure_uuid: m.id,
                    measure_datetime: format_timestamp(&m.measure_datetime),
                    measure_type: m.measure_type,
                    has_confirmed: m.confirmed,
                    image_url: m.image_url,
                })
                .collect(),
        }
    }
}

/// Decoded `data:image/<subtype>;base64,<payload>` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrlImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Split and decode a base64 image data URL
pub fn decode_data_url(value: &str) -> Result<DataUrlImage, String> {
    let captures = DATA_URL_PREFIX
        .captures(value)
        .ok_or_else(|| "Invalid Base64 image string".to_string())?;

    let prefix_len = captures.get(0).map(|m| m.end()).unwrap_or_default();
    let subtype = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

    let payload: String = value[prefix_len..]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if payload.is_empty() {
        return Err("Image payload is empty".to_string());
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| format!("Invalid Base64 image string: {}", e))?;

    Ok(DataUrlImage {
        mime_type: format!("image/{}", subtype.to_ascii_lowercase()),
        bytes,
    })
}

fn in_capture_range(timestamp: &DateTime<Utc>) -> bool {
    CAPTURE_YEARS.contains(&timestamp.year())
}

impl UploadRequest {
    /// Validate every field, collecting all failures
    pub fn validate(self) -> Result<CreateReadingInput, ApiError> {
        let mut errors = Vec::new();

        let image = match self.image.as_deref() {
            None => {
                errors.push(FieldError::new("image", "Required"));
                None
            }
            Some(value) => match decode_data_url(value) {
                Ok(image) => Some(image),
                Err(message) => {
                    errors.push(FieldError::new("image", message));
                    None
                }
            },
        };

        let customer_code = match self.customer_code {
            Some(code) if !code.trim().is_empty() => Some(code),
            Some(_) => {
                errors.push(FieldError::new("customer_code", "Must not be empty"));
                None
            }
            None => {
                errors.push(FieldError::new("customer_code", "Required"));
                None
            }
        };

        let measure_datetime = match self.measure_datetime.as_deref() {
            None => {
                errors.push(FieldError::new("measure_datetime", "Required"));
                None
            }
            Some(value) => match parse_datetime_lenient(value) {
                Ok(dt) if in_capture_range(&dt) => Some(dt),
                Ok(_) => {
                    errors.push(FieldError::new(
                        "measure_datetime",
                        "Year must be between 0000 and 9998",
                    ));
                    None
                }
                Err(_) => {
                    errors.push(FieldError::new("measure_datetime", "Invalid datetime format"));
                    None
                }
            },
        };

        // Strict: exactly WATER or GAS
        let measure_type = match self.measure_type.as_deref() {
            Some("WATER") => Some(MeasureType::Water),
            Some("GAS") => Some(MeasureType::Gas),
            Some(_) => {
                errors.push(FieldError::new("measure_type", "Expected 'WATER' | 'GAS'"));
                None
            }
            None => {
                errors.push(FieldError::new("measure_type", "Required"));
                None
            }
        };

        match (image, customer_code, measure_datetime, measure_type) {
            (Some(image), Some(customer_code), Some(measure_datetime), Some(measure_type))
                if errors.is_empty() =>
            {
                Ok(CreateReadingInput {
                    customer_code,
                    measure_type,
                    measure_datetime,
                    image: image.bytes,
                    mime_type: image.mime_type,
                })
            }
            _ => Err(ApiError::InvalidData(errors)),
        }
    }
}

impl ConfirmRequest {
    pub fn validate(self) -> Result<ConfirmReadingInput, ApiError> {
        let mut errors = Vec::new();

        let reading_id = match self.measure_uuid.as_deref() {
            None => {
                errors.push(FieldError::new("measure_uuid", "Required"));
                None
            }
            Some(value) => match Uuid::parse_str(value) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push(FieldError::new("measure_uuid", "Invalid uuid"));
                    None
                }
            },
        };

        let confirmed_value = match self.confirmed_value {
            None => {
                errors.push(FieldError::new("confirmed_value", "Required"));
                None
            }
            Some(value) if value.is_finite() && value > 0.0 => Some(value),
            Some(_) => {
                errors.push(FieldError::new("confirmed_value", "Number must be greater than 0"));
                None
            }
        };

        match (reading_id, confirmed_value) {
            (Some(reading_id), Some(confirmed_value)) => Ok(ConfirmReadingInput {
                reading_id,
                confirmed_value,
            }),
            _ => Err(ApiError::InvalidData(errors)),
        }
    }
}

fn body_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::InvalidData(vec![FieldError::new("body", rejection.body_text())])
}

/// POST /upload
pub async fn upload_reading(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let Json(request) = payload.map_err(body_rejection)?;
    let input = request.validate()?;

    let output = state.create_reading.execute(input).await?;

    Ok(Json(output.into()))
}

/// PATCH /confirm
pub async fn confirm_reading(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> ApiResult<Json<ConfirmResponse>> {
    let Json(request) = payload.map_err(body_rejection)?;
    let input = request.validate()?;

    let output = state.confirm_reading.execute(input).await?;

    Ok(Json(output.into()))
}

/// GET /:customer_code/list
pub async fn list_readings(
    State(state): State<AppState>,
    Path(customer_code): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let measure_type = query
        .measure_type
        .map(|value| {
            value
                .parse::<MeasureType>()
                .map_err(|_| ApiError::InvalidType(value))
        })
        .transpose()?;

    let output = state
        .list_readings
        .execute(ListReadingsInput {
            customer_code,
            measure_type,
        })
        .await?;

    Ok(Json(output.into()))
}

/// Build reading routes
pub fn reading_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_reading))
        .route("/confirm", patch(confirm_reading))
        .route("/:customer_code/list", get(list_readings))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn upload(image: &str, customer: &str, datetime: &str, kind: &str) -> UploadRequest {
        UploadRequest {
            image: Some(image.to_string()),
            customer_code: Some(customer.to_string()),
            measure_datetime: Some(datetime.to_string()),
            measure_type: Some(kind.to_string()),
        }
    }

    fn field_paths(err: ApiError) -> Vec<String> {
        match err {
            ApiError::InvalidData(details) => details.into_iter().map(|d| d.path).collect(),
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_data_url() {
        let image = decode_data_url(PIXEL).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(&image.bytes[..4], b"\x89PNG");
    }

    #[test]
    fn test_decode_data_url_rejects_bad_input() {
        assert!(decode_data_url("iVBORw0KGgo=").is_err());
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_err());
        assert!(decode_data_url("data:image/jpeg;base64,").is_err());
        assert!(decode_data_url("data:image/jpeg;base64,@@@").is_err());
    }

    #[test]
    fn test_upload_validate_ok() {
        let input = upload(PIXEL, "ABC123", "2024-08-10T10:00:00Z", "WATER")
            .validate()
            .unwrap();
        assert_eq!(input.customer_code, "ABC123");
        assert_eq!(input.measure_type, MeasureType::Water);
        assert_eq!(input.mime_type, "image/png");
    }

    #[test]
    fn test_upload_validate_collects_all_errors() {
        let paths = field_paths(UploadRequest::default().validate().unwrap_err());
        assert_eq!(
            paths,
            vec!["image", "customer_code", "measure_datetime", "measure_type"]
        );
    }

    #[test]
    fn test_upload_measure_type_is_strict() {
        let paths = field_paths(
            upload(PIXEL, "ABC123", "2024-08-10", "water")
                .validate()
                .unwrap_err(),
        );
        assert_eq!(paths, vec!["measure_type"]);
    }

    #[test]
    fn test_upload_bad_datetime() {
        let paths = field_paths(
            upload(PIXEL, "ABC123", "tomorrow", "GAS")
                .validate()
                .unwrap_err(),
        );
        assert_eq!(paths, vec!["measure_datetime"]);
    }

    #[test]
    fn test_upload_year_outside_storage_range() {
        for datetime in ["9999-12-15T00:00:00Z", "+10000-01-01T00:00:00", "-0001-06-01"] {
            let paths = field_paths(
                upload(PIXEL, "ABC123", datetime, "WATER")
                    .validate()
                    .unwrap_err(),
            );
            assert_eq!(paths, vec!["measure_datetime"], "{datetime}");
        }

        assert!(upload(PIXEL, "ABC123", "9998-12-31T23:59:59Z", "WATER")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_confirm_validate() {
        let id = Uuid::new_v4();
        let ok = ConfirmRequest {
            measure_uuid: Some(id.to_string()),
            confirmed_value: Some(150.75),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.reading_id, id);

        for value in [0.0, -1.0, f64::NAN] {
            let err = ConfirmRequest {
                measure_uuid: Some(id.to_string()),
                confirmed_value: Some(value),
            }
            .validate()
            .unwrap_err();
            assert_eq!(field_paths(err), vec!["confirmed_value"]);
        }

        let err = ConfirmRequest {
            measure_uuid: Some("123".to_string()),
            confirmed_value: Some(1.0),
        }
        .validate()
        .unwrap_err();
        assert_eq!(field_paths(err), vec!["measure_uuid"]);
    }
}
