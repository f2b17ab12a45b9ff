//! # Meter Reader Common Library
//!
//! Shared code for the meter reading service:
//! - Common error type
//! - Bootstrap configuration loading and root folder resolution
//! - Calendar and timestamp helpers used by the reading store

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
