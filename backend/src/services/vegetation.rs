//! Vegetation growth-signal service
//!
//! Reads a vigor time series for a field and derives growth signals. When the
//! source is not configured, fails, or returns nothing usable, signals are
//! synthesized from a generator seeded by the rounded field location, so the
//! same field always gets the same values. Synthetic signals are tagged as
//! such.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    analyze, validate_coordinates, AnalysisError, BoundingRegion, DateRange, GeoPoint,
    GrowthSignals, Provenance, Sample,
};

use crate::config::VegetationConfig;
use crate::error::{AppError, AppResult};
use crate::external::vegetation::lookback_range;
use crate::external::VegetationSource;

/// Synthetic peak vigor range
pub const SYNTHETIC_PEAK_RANGE: (f64, f64) = (0.75, 0.90);

/// Synthetic vegetative slope range, vigor units per day
pub const SYNTHETIC_SLOPE_RANGE: (f64, f64) = (0.01, 0.02);

/// Budget for one source fetch, retries included
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct VegetationService {
    source: Option<Arc<dyn VegetationSource>>,
    lookback_days: i64,
    half_extent_deg: f64,
    fetch_timeout: Duration,
}

impl VegetationService {
    pub fn new(
        source: Option<Arc<dyn VegetationSource>>,
        lookback_days: i64,
        half_extent_deg: f64,
    ) -> Self {
        Self {
            source,
            lookback_days,
            half_extent_deg,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn from_config(source: Option<Arc<dyn VegetationSource>>, config: &VegetationConfig) -> Self {
        Self::new(source, config.lookback_days, config.region_half_extent_deg)
            .with_fetch_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Growth signals for a field, falling back to synthetic values.
    ///
    /// Without a `range` the configured lookback window ending today is used.
    pub async fn growth_signals(
        &self,
        point: GeoPoint,
        range: Option<DateRange>,
    ) -> AppResult<GrowthSignals> {
        validate_coordinates(&point).map_err(|m| AppError::invalid_input("coordinates", m))?;

        let Some(source) = &self.source else {
            tracing::debug!(%point, "no vegetation source configured, using synthetic signals");
            return Ok(synthetic_signals(&point));
        };

        let range = range.unwrap_or_else(|| lookback_range(Utc::now().date_naive(), self.lookback_days));
        let region = BoundingRegion::around(point, self.half_extent_deg);

        match tokio::time::timeout(self.fetch_timeout, source.fetch_samples(&region, &range)).await {
            Ok(Ok(samples)) => Ok(self.signals_from_samples(&point, &samples)),
            Ok(Err(e)) => {
                tracing::warn!(%point, error = %e, "vegetation source unavailable, using synthetic signals");
                Ok(synthetic_signals(&point))
            }
            Err(_) => {
                tracing::warn!(
                    %point,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "vegetation source timed out, using synthetic signals"
                );
                Ok(synthetic_signals(&point))
            }
        }
    }

    /// Analyze samples already in hand; zero usable samples fall back to
    /// synthetic signals for `point`.
    pub fn signals_from_samples(&self, point: &GeoPoint, samples: &[Sample]) -> GrowthSignals {
        match analyze(samples) {
            Ok(signals) => signals,
            Err(AnalysisError::NoUsableData { discarded }) => {
                tracing::info!(%point, discarded, "no usable vegetation samples, using synthetic signals");
                synthetic_signals(point)
            }
        }
    }
}

/// Deterministic stand-in signals for a location.
///
/// The flowering proxy equals the peak, matching the satellite path.
pub fn synthetic_signals(point: &GeoPoint) -> GrowthSignals {
    let mut rng = StdRng::seed_from_u64(point.location_key());
    let peak = rng.gen_range(SYNTHETIC_PEAK_RANGE.0..SYNTHETIC_PEAK_RANGE.1);
    let slope = rng.gen_range(SYNTHETIC_SLOPE_RANGE.0..SYNTHETIC_SLOPE_RANGE.1);
    GrowthSignals {
        peak,
        flowering_proxy: peak,
        vegetative_slope: slope,
        sample_count: 0,
        provenance: Provenance::Synthetic,
    }
}
