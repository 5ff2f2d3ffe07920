//! Crop profiles: benchmark yields and flowering-stage alert thresholds

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Crop used when a lookup misses and nothing else is configured.
pub const DEFAULT_FALLBACK_CROP: &str = "soybean";

/// Flowering-stage thresholds for the weather-risk rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertThresholds {
    /// Degrees Celsius
    pub max_temp_flowering: f64,
    /// Millimetres over the flowering window
    pub min_rain_flowering: f64,
    /// Mean relative humidity, percent
    pub max_humidity: f64,
}

/// Static per-crop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropProfile {
    pub name: String,
    /// Typical farmer yield in t/ha
    #[serde(default)]
    pub benchmark_yield_t_ha: Option<f64>,
    pub thresholds: AlertThresholds,
}

impl CropProfile {
    pub fn new(name: &str, benchmark_yield_t_ha: Option<f64>, thresholds: AlertThresholds) -> Self {
        Self {
            name: canonical_crop_name(name),
            benchmark_yield_t_ha,
            thresholds,
        }
    }
}

/// Lowercase, trimmed crop key.
pub fn canonical_crop_name(crop: &str) -> String {
    crop.trim().to_lowercase()
}

/// Catalog of crop profiles keyed by lowercase crop name.
///
/// Lookups of unknown crops resolve to the designated default profile. The
/// default only supplies thresholds; benchmark yields are never borrowed from
/// it.
#[derive(Debug, Clone)]
pub struct CropCatalog {
    profiles: BTreeMap<String, CropProfile>,
    default_crop: String,
}

impl CropCatalog {
    /// The eight oilseed crops the advisory covers.
    pub fn oilseeds() -> Self {
        let rows: [(&str, f64, f64, f64, f64); 8] = [
            // name, benchmark t/ha, max temp, min rain, max humidity
            ("sunflower", 1.5, 34.0, 30.0, 80.0),
            ("soybean", 1.8, 32.0, 35.0, 85.0),
            ("mustard", 1.4, 30.0, 25.0, 85.0),
            ("groundnut", 2.0, 35.0, 40.0, 82.0),
            ("sesame", 0.9, 33.0, 25.0, 80.0),
            ("castor", 1.7, 34.0, 28.0, 84.0),
            ("safflower", 0.8, 32.0, 22.0, 80.0),
            ("niger", 0.7, 30.0, 20.0, 78.0),
        ];

        let profiles = rows
            .iter()
            .map(|&(name, bench, temp, rain, humidity)| {
                let profile = CropProfile::new(
                    name,
                    Some(bench),
                    AlertThresholds {
                        max_temp_flowering: temp,
                        min_rain_flowering: rain,
                        max_humidity: humidity,
                    },
                );
                (profile.name.clone(), profile)
            })
            .collect();

        Self {
            profiles,
            default_crop: DEFAULT_FALLBACK_CROP.to_string(),
        }
    }

    /// Change the profile used for unknown crops. The crop must be in the catalog.
    pub fn with_default_crop(mut self, crop: &str) -> Result<Self, &'static str> {
        let key = canonical_crop_name(crop);
        if !self.profiles.contains_key(&key) {
            return Err("Default crop must be one of the catalog crops");
        }
        self.default_crop = key;
        Ok(self)
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: CropProfile) {
        let key = canonical_crop_name(&profile.name);
        self.profiles.insert(key, profile);
    }

    pub fn default_crop(&self) -> &str {
        &self.default_crop
    }

    /// Exact (case-insensitive) lookup without fallback.
    pub fn lookup(&self, crop: &str) -> Option<&CropProfile> {
        self.profiles.get(&canonical_crop_name(crop))
    }

    /// Profile for `crop`, or the default profile when the crop is unknown.
    pub fn profile(&self, crop: &str) -> &CropProfile {
        match self.lookup(crop) {
            Some(profile) => profile,
            None => &self.profiles[&self.default_crop],
        }
    }

    pub fn is_known(&self, crop: &str) -> bool {
        self.lookup(crop).is_some()
    }

    /// Benchmark yield for a known crop. Unknown crops have none.
    pub fn benchmark_yield(&self, crop: &str) -> Option<f64> {
        self.lookup(crop).and_then(|p| p.benchmark_yield_t_ha)
    }

    pub fn crop_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

impl Default for CropCatalog {
    fn default() -> Self {
        Self::oilseeds()
    }
}
