//! Validation utilities for farmer and site inputs
//!
//! Checks run once on typed feature schemas before anything is vectorized,
//! so a malformed request is rejected with the offending field named.

use serde::Serialize;

use crate::models::{FertilizerFeatures, YieldFeatures};
use crate::types::GeoPoint;
use rust_decimal::Decimal;

/// A rejected input field
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ============================================================================
// Scalar checks
// ============================================================================

/// Validate a percentage is within 0-100
pub fn validate_percentage(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

/// Validate soil pH is within 0-14
pub fn validate_ph(ph: f64) -> Result<(), &'static str> {
    if !ph.is_finite() || !(0.0..=14.0).contains(&ph) {
        return Err("pH must be between 0 and 14");
    }
    Ok(())
}

/// Validate a quantity that cannot be negative (rainfall, nutrient status, doses)
pub fn validate_non_negative(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() || value < 0.0 {
        return Err("Value must be a non-negative number");
    }
    Ok(())
}

/// Validate a plain finite reading such as temperature
pub fn validate_finite(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() {
        return Err("Value must be a finite number");
    }
    Ok(())
}

/// Validate a vegetation index reading (NDVI is bounded to [-1, 1])
pub fn validate_vigor_index(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
        return Err("Vegetation index must be between -1 and 1");
    }
    Ok(())
}

/// Validate a cloud fraction is within 0-1
pub fn validate_cloud_fraction(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err("Cloud fraction must be between 0 and 1");
    }
    Ok(())
}

/// Validate a crop name is present and plain text
pub fn validate_crop_name(crop: &str) -> Result<(), &'static str> {
    let trimmed = crop.trim();
    if trimmed.is_empty() {
        return Err("Crop name is required");
    }
    if trimmed.len() > 64 {
        return Err("Crop name must be at most 64 characters");
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err("Crop name must contain only letters, digits, spaces, '-' or '_'");
    }
    Ok(())
}

/// Validate GPS coordinates
pub fn validate_coordinates(point: &GeoPoint) -> Result<(), &'static str> {
    if point.latitude < Decimal::from(-90) || point.latitude > Decimal::from(90) {
        return Err("Latitude must be between -90 and 90");
    }
    if point.longitude < Decimal::from(-180) || point.longitude > Decimal::from(180) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

// ============================================================================
// Schema checks
// ============================================================================

fn check(field: &'static str, result: Result<(), &'static str>) -> Result<(), FieldError> {
    result.map_err(|message| FieldError::new(field, message))
}

/// Validate every field of a yield request
pub fn validate_yield_features(f: &YieldFeatures) -> Result<(), FieldError> {
    check("crop", validate_crop_name(&f.crop))?;
    if f.maturity_days == 0 || f.maturity_days > 365 {
        return Err(FieldError::new(
            "maturity_days",
            "Maturity must be between 1 and 365 days",
        ));
    }
    check("mean_temp_gs_C", validate_finite(f.mean_temp_gs_c))?;
    check("temp_flowering_C", validate_finite(f.temp_flowering_c))?;
    check("seasonal_rain_mm", validate_non_negative(f.seasonal_rain_mm))?;
    check("rain_flowering_mm", validate_non_negative(f.rain_flowering_mm))?;
    check("humidity_mean_pct", validate_percentage(f.humidity_mean_pct))?;
    check("soil_pH", validate_ph(f.soil_ph))?;
    check("clay_pct", validate_percentage(f.clay_pct))?;
    check("soil_N_status_kg_ha", validate_non_negative(f.soil_n_status_kg_ha))?;
    check("soil_P_status_kg_ha", validate_non_negative(f.soil_p_status_kg_ha))?;
    check("soil_K_status_kg_ha", validate_non_negative(f.soil_k_status_kg_ha))?;
    check("fert_N_kg_ha", validate_non_negative(f.fert_n_kg_ha))?;
    check("fert_P_kg_ha", validate_non_negative(f.fert_p_kg_ha))?;
    check("fert_K_kg_ha", validate_non_negative(f.fert_k_kg_ha))?;
    check("ndvi_flowering", validate_vigor_index(f.ndvi_flowering))?;
    check("ndvi_peak", validate_vigor_index(f.ndvi_peak))?;
    check("ndvi_veg_slope", validate_finite(f.ndvi_veg_slope))?;
    check("soil_moisture_pct", validate_percentage(f.soil_moisture_pct))?;
    Ok(())
}

/// Validate every field of a fertilizer request
pub fn validate_fertilizer_features(f: &FertilizerFeatures) -> Result<(), FieldError> {
    check("crop", validate_crop_name(&f.crop))?;
    check("target_yield", validate_non_negative(f.target_yield))?;
    check("soil_N", validate_non_negative(f.soil_n))?;
    check("soil_P", validate_non_negative(f.soil_p))?;
    check("soil_K", validate_non_negative(f.soil_k))?;
    check("temperature", validate_finite(f.temperature))?;
    check("ph", validate_ph(f.ph))?;
    check("moisture", validate_percentage(f.moisture))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn percentage_bounds() {
        assert!(validate_percentage(0.0).is_ok());
        assert!(validate_percentage(100.0).is_ok());
        assert!(validate_percentage(100.1).is_err());
        assert!(validate_percentage(f64::NAN).is_err());
    }

    #[test]
    fn crop_name_rules() {
        assert!(validate_crop_name("Rapeseed-Mustard").is_ok());
        assert!(validate_crop_name("   ").is_err());
        assert!(validate_crop_name("soy;drop").is_err());
    }

    #[test]
    fn coordinates_bounds() {
        let ok = GeoPoint::new(Decimal::from_str("20.29").unwrap(), Decimal::from(85));
        let bad = GeoPoint::new(Decimal::from(91), Decimal::from(85));
        assert!(validate_coordinates(&ok).is_ok());
        assert!(validate_coordinates(&bad).is_err());
    }

    #[test]
    fn fertilizer_schema_names_the_field() {
        let f = FertilizerFeatures {
            crop: "groundnut".into(),
            target_yield: 2.0,
            soil_n: 180.0,
            soil_p: 15.0,
            soil_k: -1.0,
            temperature: 27.0,
            ph: 6.4,
            moisture: 22.0,
        };
        assert_eq!(validate_fertilizer_features(&f).unwrap_err().field, "soil_K");
    }
}
