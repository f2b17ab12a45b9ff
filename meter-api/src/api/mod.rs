//! HTTP API handlers for meter-api

pub mod health;
pub mod readings;

pub use health::health_routes;
pub use readings::reading_routes;
