//! HTTP handlers for the farm advisory API

pub mod advisory;
pub mod health;
pub mod prediction;
pub mod vegetation;

pub use advisory::{chat, get_session};
pub use health::health_check;
pub use prediction::{evaluate_alerts, predict_yield, recommend_fertilizer};
pub use vegetation::get_growth_signals;
