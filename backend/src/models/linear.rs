//! Linear model artifacts
//!
//! Numeric inputs are standardized with the training mean and scale;
//! categorical inputs are one-hot encoded, with categories unseen in training
//! contributing nothing. One intercept per output: one output is a scalar
//! model, three outputs are an (N, P, K) model.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared::{FeatureValue, FeatureVector, NutrientDose};

use super::numeric::{NumericModel, ScalarModel, TripleModel};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeatureSpec {
    Numeric {
        name: String,
        #[serde(default)]
        mean: f64,
        #[serde(default = "unit_scale")]
        scale: f64,
        /// One weight per output
        weights: Vec<f64>,
    },
    Categorical {
        name: String,
        /// Category -> one weight per output
        weights: BTreeMap<String, Vec<f64>>,
    },
}

fn unit_scale() -> f64 {
    1.0
}

impl FeatureSpec {
    pub fn name(&self) -> &str {
        match self {
            FeatureSpec::Numeric { name, .. } | FeatureSpec::Categorical { name, .. } => name,
        }
    }
}

/// Serialized linear model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearModel {
    pub name: String,
    pub features: Vec<FeatureSpec>,
    pub intercepts: Vec<f64>,
    #[serde(skip)]
    feature_names: Vec<String>,
}

impl LinearModel {
    pub fn new(name: &str, features: Vec<FeatureSpec>, intercepts: Vec<f64>) -> AppResult<Self> {
        let mut model = Self {
            name: name.to_string(),
            features,
            intercepts,
            feature_names: Vec::new(),
        };
        model.validate()?;
        Ok(model)
    }

    /// Load and check an artifact from disk.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!("cannot read model {}: {}", path.display(), e))
        })?;
        let mut model: LinearModel = serde_json::from_str(&raw).map_err(|e| {
            AppError::Configuration(format!("invalid model {}: {}", path.display(), e))
        })?;
        model.validate()?;
        tracing::info!(
            model = %model.name,
            features = model.feature_names.len(),
            outputs = model.outputs(),
            "loaded linear model"
        );
        Ok(model)
    }

    fn validate(&mut self) -> AppResult<()> {
        let outputs = self.intercepts.len();
        if outputs != 1 && outputs != 3 {
            return Err(AppError::Configuration(format!(
                "model {} must have 1 or 3 outputs, found {}",
                self.name, outputs
            )));
        }
        for spec in &self.features {
            let ok = match spec {
                FeatureSpec::Numeric { weights, scale, .. } => {
                    weights.len() == outputs && scale.is_finite()
                }
                FeatureSpec::Categorical { weights, .. } => {
                    weights.values().all(|w| w.len() == outputs)
                }
            };
            if !ok {
                return Err(AppError::Configuration(format!(
                    "model {}: feature {} does not match {} outputs",
                    self.name,
                    spec.name(),
                    outputs
                )));
            }
        }
        self.feature_names = self.features.iter().map(|f| f.name().to_string()).collect();
        Ok(())
    }

    pub fn outputs(&self) -> usize {
        self.intercepts.len()
    }

    /// Tag the model by its output shape.
    pub fn into_numeric_model(self) -> NumericModel {
        if self.outputs() == 3 {
            NumericModel::Triple(std::sync::Arc::new(self))
        } else {
            NumericModel::Scalar(std::sync::Arc::new(self))
        }
    }

    fn evaluate(&self, vector: &FeatureVector) -> AppResult<Vec<f64>> {
        if vector.names() != self.feature_names.as_slice() {
            return Err(AppError::invalid_input(
                "features",
                format!("feature order does not match model {}", self.name),
            ));
        }

        let mut out = self.intercepts.clone();
        for (spec, value) in self.features.iter().zip(vector.values()) {
            match (spec, value) {
                (FeatureSpec::Numeric { mean, scale, weights, .. }, FeatureValue::Numeric(v)) => {
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    let z = (v - mean) / scale;
                    for (o, w) in out.iter_mut().zip(weights) {
                        *o += w * z;
                    }
                }
                (FeatureSpec::Categorical { weights, .. }, FeatureValue::Categorical(category)) => {
                    if let Some(ws) = weights.get(category) {
                        for (o, w) in out.iter_mut().zip(ws) {
                            *o += w;
                        }
                    }
                }
                (spec, _) => {
                    return Err(AppError::invalid_input(
                        spec.name().to_string(),
                        "value has the wrong type for this feature",
                    ))
                }
            }
        }
        Ok(out)
    }
}

impl ScalarModel for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureVector) -> AppResult<f64> {
        let out = self.evaluate(features)?;
        match out.as_slice() {
            [value] => Ok(*value),
            _ => Err(AppError::Internal(format!(
                "model {} is not a scalar model",
                self.name
            ))),
        }
    }
}

impl TripleModel for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureVector) -> AppResult<NutrientDose> {
        let out = self.evaluate(features)?;
        match out.as_slice() {
            [n, p, k] => Ok(NutrientDose {
                nitrogen: *n,
                phosphorus: *p,
                potassium: *k,
            }),
            _ => Err(AppError::Internal(format!(
                "model {} is not a triple model",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FeatureMap;

    fn scalar_model() -> LinearModel {
        LinearModel::new(
            "yield-test",
            vec![
                FeatureSpec::Categorical {
                    name: "crop".into(),
                    weights: BTreeMap::from([("mustard".to_string(), vec![0.2])]),
                },
                FeatureSpec::Numeric {
                    name: "soil_pH".into(),
                    mean: 6.5,
                    scale: 0.5,
                    weights: vec![0.1],
                },
            ],
            vec![1.0],
        )
        .unwrap()
    }

    fn vector(crop: &str, ph: f64) -> FeatureVector {
        let mut map = FeatureMap::new();
        map.insert("crop", FeatureValue::Categorical(crop.into()));
        map.insert("soil_pH", FeatureValue::Numeric(ph));
        FeatureVector::ordered(&map, &["crop".to_string(), "soil_pH".to_string()]).unwrap()
    }

    #[test]
    fn scalar_prediction_standardizes_and_one_hots() {
        let model = scalar_model();
        let value = ScalarModel::predict(&model, &vector("mustard", 7.0)).unwrap();
        assert!((value - 1.3).abs() < 1e-12);
    }

    #[test]
    fn unseen_category_contributes_nothing() {
        let model = scalar_model();
        let value = ScalarModel::predict(&model, &vector("niger", 6.5)).unwrap();
        assert!((value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_output_count_is_configuration_error() {
        let result = LinearModel::new("bad", vec![], vec![1.0, 2.0]);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn three_outputs_become_a_triple_model() {
        let model = LinearModel::new("npk", vec![], vec![10.0, 5.0, 2.0]).unwrap();
        assert_eq!(
            model.into_numeric_model().output_shape(),
            crate::models::OutputShape::Triple
        );
    }

    #[test]
    fn artifact_json_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let json = serde_json::json!({
            "name": "yield-json",
            "features": [
                {"kind": "numeric", "name": "soil_pH", "mean": 6.5, "weights": [0.5]}
            ],
            "intercepts": [1.5]
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let model = LinearModel::load(&path).unwrap();
        assert_eq!(ScalarModel::feature_names(&model), &["soil_pH".to_string()]);
    }
}
