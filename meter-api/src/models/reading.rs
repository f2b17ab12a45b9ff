//! Reading entity
//!
//! A reading is created once from an extracted value and may be confirmed
//! exactly once afterwards. Fields are private; the only mutation path is
//! [`Reading::confirm`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Measurement category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasureType {
    Water,
    Gas,
}

impl MeasureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureType::Water => "WATER",
            MeasureType::Gas => "GAS",
        }
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a category string is neither WATER nor GAS
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown measure type: {0}")]
pub struct UnknownMeasureType(pub String);

impl FromStr for MeasureType {
    type Err = UnknownMeasureType;

    /// Case-insensitive parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WATER" => Ok(MeasureType::Water),
            "GAS" => Ok(MeasureType::Gas),
            _ => Err(UnknownMeasureType(s.to_string())),
        }
    }
}

/// Outcome of a store confirmation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// No reading with that id
    NotFound,
    /// Reading was already confirmed
    Duplicate,
    /// Value and confirmed flag written
    Updated,
}

/// One meter measurement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    id: Uuid,
    customer_code: String,
    measure_type: MeasureType,
    measure_datetime: DateTime<Utc>,
    value: f64,
    image_url: String,
    confirmed: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

/// Raw field set used to rebuild a reading from storage
#[derive(Debug, Clone)]
pub struct ReadingProps {
    pub id: Uuid,
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub measure_datetime: DateTime<Utc>,
    pub value: f64,
    pub image_url: String,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Returned by [`Reading::confirm`] on an already confirmed reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Reading already confirmed")]
pub struct AlreadyConfirmed;

impl Reading {
    /// Create a new unconfirmed reading with a fresh identifier
    pub fn create(
        customer_code: impl Into<String>,
        measure_type: MeasureType,
        measure_datetime: DateTime<Utc>,
        value: f64,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_code: customer_code.into(),
            measure_type,
            measure_datetime,
            value,
            image_url: image_url.into(),
            confirmed: false,
            created_at: meter_common::time::now(),
            updated_at: None,
        }
    }

    /// Rebuild a reading from persisted fields
    pub fn with(props: ReadingProps) -> Self {
        Self {
            id: props.id,
            customer_code: props.customer_code,
            measure_type: props.measure_type,
            measure_datetime: props.measure_datetime,
            value: props.value,
            image_url: props.image_url,
            confirmed: props.confirmed,
            created_at: props.created_at,
            updated_at: props.updated_at,
        }
    }

    /// Apply the one-time confirmation transition
    pub fn confirm(&mut self, value: f64, at: DateTime<Utc>) -> Result<(), AlreadyConfirmed> {
        if self.confirmed {
            return Err(AlreadyConfirmed);
        }
        self.value = value;
        self.confirmed = true;
        self.updated_at = Some(at);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn customer_code(&self) -> &str {
        &self.customer_code
    }

    pub fn measure_type(&self) -> MeasureType {
        self.measure_type
    }

    pub fn measure_datetime(&self) -> DateTime<Utc> {
        self.measure_datetime
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}
