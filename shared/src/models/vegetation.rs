//! Vegetation-index time series and the growth signals derived from it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Samples at or above this cloud fraction are discarded.
pub const MAX_CLOUD_FRACTION: f64 = 0.25;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A single remote-sensing observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub vigor_index: f64,
    /// 0.0 (clear) to 1.0 (fully clouded)
    pub cloud_fraction: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, vigor_index: f64, cloud_fraction: f64) -> Self {
        Self {
            timestamp,
            vigor_index,
            cloud_fraction,
        }
    }

    /// Clear enough to use. Non-finite readings are never usable.
    pub fn is_usable(&self) -> bool {
        self.vigor_index.is_finite() && self.cloud_fraction < MAX_CLOUD_FRACTION
    }
}

/// Where a set of growth signals came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Satellite,
    Synthetic,
}

/// Scalar growth signals derived from one time series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GrowthSignals {
    pub peak: f64,
    /// Equal to `peak`. There is no separate flowering detection; the peak of
    /// canopy vigor is used as an approximation of the flowering-stage value.
    pub flowering_proxy: f64,
    /// Vigor units per day
    pub vegetative_slope: f64,
    pub sample_count: usize,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no usable samples ({discarded} discarded as cloudy or invalid)")]
    NoUsableData { discarded: usize },
}

/// Derive growth signals from a raw sample stream.
///
/// Cloudy samples are dropped, the rest are ordered by time (stable, so
/// equal timestamps keep input order). The peak is the first maximum in that
/// order. The vegetative slope is the least-squares fit of vigor against days
/// since the first usable sample, over the samples up to and including the
/// peak.
pub fn analyze(samples: &[Sample]) -> Result<GrowthSignals, AnalysisError> {
    let mut usable: Vec<&Sample> = samples.iter().filter(|s| s.is_usable()).collect();
    if usable.is_empty() {
        return Err(AnalysisError::NoUsableData {
            discarded: samples.len(),
        });
    }
    usable.sort_by_key(|s| s.timestamp);

    let mut peak_idx = 0;
    for (i, sample) in usable.iter().enumerate() {
        if sample.vigor_index > usable[peak_idx].vigor_index {
            peak_idx = i;
        }
    }
    let peak = usable[peak_idx].vigor_index;

    let origin = usable[0].timestamp;
    let points: Vec<(f64, f64)> = usable[..=peak_idx]
        .iter()
        .map(|s| {
            let days = (s.timestamp - origin).num_seconds() as f64 / SECONDS_PER_DAY;
            (days, s.vigor_index)
        })
        .collect();

    Ok(GrowthSignals {
        peak,
        flowering_proxy: peak,
        vegetative_slope: least_squares_slope(&points),
        sample_count: usable.len(),
        provenance: Provenance::Satellite,
    })
}

/// Ordinary least-squares slope; 0.0 with fewer than two points or no spread in x.
pub fn least_squares_slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), &(x, y)| {
        let dx = x - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });

    if sxx == 0.0 {
        0.0
    } else {
        sxy / sxx
    }
}
