//! Domain models

pub mod reading;

pub use reading::{MeasureType, Reading, UpdateStatus};
