//! Shared types and models for the farm advisory platform
//!
//! Pure domain logic lives here: crop profiles, the weather-risk rules,
//! vegetation time-series analysis, typed feature schemas and the
//! conversation/advisory value types used by the backend.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
