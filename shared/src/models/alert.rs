//! Flowering-stage weather-risk alerts

use std::fmt;

use serde::{Deserialize, Serialize};

use super::crop::CropCatalog;

/// Margin above the temperature threshold that makes heat severe, degrees C
pub const SEVERE_HEAT_MARGIN: f64 = 3.0;
/// Fraction of the minimum rainfall at or below which moisture stress is severe
pub const SEVERE_RAIN_FRACTION: f64 = 0.5;
/// Margin above the humidity threshold that makes disease risk severe, percent
pub const SEVERE_HUMIDITY_MARGIN: f64 = 5.0;

/// Severity tier of an alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    None,
    Moderate,
    Severe,
    Compound,
}

/// What an alert is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HeatStress,
    MoistureStress,
    DiseaseRisk,
    HeatAndDrought,
    NoRedFlags,
}

/// A single tiered alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

impl Alert {
    fn new(kind: AlertKind, severity: AlertSeverity, message: &str) -> Self {
        Self {
            kind,
            severity,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered, never-empty set of alerts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AlertSet(Vec<Alert>);

impl AlertSet {
    fn from_alerts(mut alerts: Vec<Alert>) -> Self {
        if alerts.is_empty() {
            alerts.push(Alert::new(
                AlertKind::NoRedFlags,
                AlertSeverity::None,
                "No major weather red-flags detected.",
            ));
        }
        Self(alerts)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Alert> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the only entry is the "no red flags" sentinel.
    pub fn is_all_clear(&self) -> bool {
        self.0.len() == 1 && self.0[0].kind == AlertKind::NoRedFlags
    }

    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|a| a.message.as_str()).collect()
    }

    pub fn highest_severity(&self) -> AlertSeverity {
        self.0
            .iter()
            .map(|a| a.severity)
            .max()
            .unwrap_or(AlertSeverity::None)
    }

    pub fn into_vec(self) -> Vec<Alert> {
        self.0
    }
}

impl<'a> IntoIterator for &'a AlertSet {
    type Item = &'a Alert;
    type IntoIter = std::slice::Iter<'a, Alert>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Classify flowering-stage conditions against the crop's thresholds.
///
/// Each dimension is tiered independently; the compound alert is added on top
/// of the individual ones when heat and low rainfall coincide. Output order is
/// temperature, rainfall, humidity, compound.
pub fn evaluate_weather_risk(
    catalog: &CropCatalog,
    crop: &str,
    temp_flowering: f64,
    rain_flowering: f64,
    humidity: f64,
) -> AlertSet {
    let rules = catalog.profile(crop).thresholds;
    let mut alerts = Vec::with_capacity(4);

    if temp_flowering >= rules.max_temp_flowering + SEVERE_HEAT_MARGIN {
        alerts.push(Alert::new(
            AlertKind::HeatStress,
            AlertSeverity::Severe,
            "Severe heat at flowering: high risk of flower drop.",
        ));
    } else if temp_flowering >= rules.max_temp_flowering {
        alerts.push(Alert::new(
            AlertKind::HeatStress,
            AlertSeverity::Moderate,
            "High temperature at flowering: moderate heat stress risk.",
        ));
    }

    if rain_flowering <= SEVERE_RAIN_FRACTION * rules.min_rain_flowering {
        alerts.push(Alert::new(
            AlertKind::MoistureStress,
            AlertSeverity::Severe,
            "Very low rainfall during flowering: severe moisture stress.",
        ));
    } else if rain_flowering <= rules.min_rain_flowering {
        alerts.push(Alert::new(
            AlertKind::MoistureStress,
            AlertSeverity::Moderate,
            "Low rainfall during flowering: moisture stress risk.",
        ));
    }

    if humidity >= rules.max_humidity + SEVERE_HUMIDITY_MARGIN {
        alerts.push(Alert::new(
            AlertKind::DiseaseRisk,
            AlertSeverity::Severe,
            "Very high humidity: strong risk of fungal diseases.",
        ));
    } else if humidity >= rules.max_humidity {
        alerts.push(Alert::new(
            AlertKind::DiseaseRisk,
            AlertSeverity::Moderate,
            "High humidity: increased probability of foliar diseases.",
        ));
    }

    if temp_flowering >= rules.max_temp_flowering && rain_flowering <= rules.min_rain_flowering {
        alerts.push(Alert::new(
            AlertKind::HeatAndDrought,
            AlertSeverity::Compound,
            "Combination of high temperature and low rainfall at flowering.",
        ));
    }

    AlertSet::from_alerts(alerts)
}
