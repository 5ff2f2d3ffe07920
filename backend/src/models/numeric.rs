//! Numeric model capabilities
//!
//! A model declares the exact feature order it was trained on and one of two
//! output shapes. Callers branch on [`NumericModel`], never on probing.

use std::fmt;
use std::sync::Arc;

use shared::{FeatureVector, NutrientDose};

use crate::error::AppResult;

/// `vector -> scalar`, e.g. yield in t/ha
pub trait ScalarModel: Send + Sync {
    fn name(&self) -> &str;

    /// Feature names in the order `predict` expects them.
    fn feature_names(&self) -> &[String];

    fn predict(&self, features: &FeatureVector) -> AppResult<f64>;
}

/// `vector -> (N, P, K)` in kg/ha
pub trait TripleModel: Send + Sync {
    fn name(&self) -> &str;

    fn feature_names(&self) -> &[String];

    fn predict(&self, features: &FeatureVector) -> AppResult<NutrientDose>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    Scalar,
    Triple,
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputShape::Scalar => f.write_str("scalar"),
            OutputShape::Triple => f.write_str("triple"),
        }
    }
}

/// A loaded numeric model tagged with its output shape
#[derive(Clone)]
pub enum NumericModel {
    Scalar(Arc<dyn ScalarModel>),
    Triple(Arc<dyn TripleModel>),
}

impl NumericModel {
    pub fn output_shape(&self) -> OutputShape {
        match self {
            NumericModel::Scalar(_) => OutputShape::Scalar,
            NumericModel::Triple(_) => OutputShape::Triple,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NumericModel::Scalar(m) => m.name(),
            NumericModel::Triple(m) => m.name(),
        }
    }

    pub fn feature_names(&self) -> &[String] {
        match self {
            NumericModel::Scalar(m) => m.feature_names(),
            NumericModel::Triple(m) => m.feature_names(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Arc<dyn ScalarModel>> {
        match self {
            NumericModel::Scalar(m) => Some(m),
            NumericModel::Triple(_) => None,
        }
    }

    pub fn as_triple(&self) -> Option<&Arc<dyn TripleModel>> {
        match self {
            NumericModel::Triple(m) => Some(m),
            NumericModel::Scalar(_) => None,
        }
    }
}

impl fmt::Debug for NumericModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericModel")
            .field("name", &self.name())
            .field("shape", &self.output_shape())
            .field("features", &self.feature_names().len())
            .finish()
    }
}
