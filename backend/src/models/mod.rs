//! Numeric models used by the prediction service
//!
//! Re-exports domain models from the shared crate and adds the model
//! capabilities and the linear artifact format.

mod linear;
mod numeric;

pub use linear::{FeatureSpec, LinearModel};
pub use numeric::{NumericModel, OutputShape, ScalarModel, TripleModel};
pub use shared::models::*;
