//! Weather-risk integration tests
//!
//! Tiered flowering-stage alerts per crop, the compound heat-and-drought
//! alert, and the all-clear sentinel.

use proptest::prelude::*;
use shared::{evaluate_weather_risk, AlertKind, AlertSeverity, CropCatalog};

const CROPS: [&str; 8] = [
    "sunflower",
    "soybean",
    "mustard",
    "groundnut",
    "sesame",
    "castor",
    "safflower",
    "niger",
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_mustard_extreme_conditions_raise_every_alert() {
        let catalog = CropCatalog::oilseeds();
        let alerts = evaluate_weather_risk(&catalog, "mustard", 33.0, 10.0, 90.0);

        let kinds: Vec<_> = alerts.iter().map(|a| (a.kind, a.severity)).collect();
        assert_eq!(
            kinds,
            vec![
                (AlertKind::HeatStress, AlertSeverity::Severe),
                (AlertKind::MoistureStress, AlertSeverity::Severe),
                (AlertKind::DiseaseRisk, AlertSeverity::Severe),
                (AlertKind::HeatAndDrought, AlertSeverity::Compound),
            ]
        );
        assert_eq!(alerts.highest_severity(), AlertSeverity::Compound);
    }

    #[test]
    fn test_moderate_heat_and_rain_still_compound() {
        let catalog = CropCatalog::oilseeds();
        // groundnut: 35 C, 40 mm, 82 %
        let alerts = evaluate_weather_risk(&catalog, "groundnut", 36.0, 30.0, 60.0);

        assert_eq!(
            alerts.messages(),
            vec![
                "High temperature at flowering: moderate heat stress risk.",
                "Low rainfall during flowering: moisture stress risk.",
                "Combination of high temperature and low rainfall at flowering.",
            ]
        );
    }

    #[test]
    fn test_humidity_alone_has_no_compound() {
        let catalog = CropCatalog::oilseeds();
        let alerts = evaluate_weather_risk(&catalog, "sesame", 25.0, 80.0, 83.0);

        assert_eq!(alerts.len(), 1);
        let only = alerts.iter().next().unwrap();
        assert_eq!(only.kind, AlertKind::DiseaseRisk);
        assert_eq!(only.severity, AlertSeverity::Moderate);
    }

    #[test]
    fn test_unknown_crop_uses_default_thresholds() {
        let catalog = CropCatalog::oilseeds();
        let unknown = evaluate_weather_risk(&catalog, "quinoa", 32.5, 50.0, 60.0);
        let default = evaluate_weather_risk(&catalog, catalog.default_crop(), 32.5, 50.0, 60.0);
        assert_eq!(unknown, default);
    }

    #[test]
    fn test_crop_names_are_case_insensitive() {
        let catalog = CropCatalog::oilseeds();
        assert_eq!(
            evaluate_weather_risk(&catalog, "  Mustard ", 31.0, 20.0, 70.0),
            evaluate_weather_risk(&catalog, "mustard", 31.0, 20.0, 70.0)
        );
    }

    #[test]
    fn test_safe_conditions_give_sentinel() {
        let catalog = CropCatalog::oilseeds();
        let alerts = evaluate_weather_risk(&catalog, "soybean", 25.0, 80.0, 60.0);

        assert!(alerts.is_all_clear());
        assert_eq!(alerts.messages(), vec!["No major weather red-flags detected."]);
        assert_eq!(alerts.highest_severity(), AlertSeverity::None);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Conditions strictly inside every threshold give exactly the sentinel
    #[test]
    fn prop_safe_conditions_are_all_clear(
        crop_idx in 0usize..8,
        temp_margin in 0.1f64..15.0,
        rain_margin in 0.1f64..200.0,
        humidity_margin in 0.1f64..40.0,
    ) {
        let catalog = CropCatalog::oilseeds();
        let crop = CROPS[crop_idx];
        let t = catalog.profile(crop).thresholds;

        let alerts = evaluate_weather_risk(
            &catalog,
            crop,
            t.max_temp_flowering - temp_margin,
            t.min_rain_flowering + rain_margin,
            t.max_humidity - humidity_margin,
        );

        prop_assert_eq!(alerts.len(), 1);
        prop_assert!(alerts.is_all_clear());
    }

    /// Alert sets are never empty, and the sentinel never mixes with real alerts
    #[test]
    fn prop_alert_set_shape(
        crop_idx in 0usize..8,
        temp in 10.0f64..45.0,
        rain in 0.0f64..150.0,
        humidity in 20.0f64..100.0,
    ) {
        let catalog = CropCatalog::oilseeds();
        let alerts = evaluate_weather_risk(&catalog, CROPS[crop_idx], temp, rain, humidity);

        prop_assert!(!alerts.is_empty());
        prop_assert!(alerts.len() <= 4);
        let sentinels = alerts.iter().filter(|a| a.kind == AlertKind::NoRedFlags).count();
        prop_assert!(sentinels == 0 || alerts.len() == 1);
    }

    /// Mustard above its heat limit with short rain always carries the compound alert
    #[test]
    fn prop_mustard_heat_and_drought_compound(
        temp in 30.0f64..45.0,
        rain in 0.0f64..25.0,
        humidity in 20.0f64..100.0,
    ) {
        let catalog = CropCatalog::oilseeds();
        let alerts = evaluate_weather_risk(&catalog, "mustard", temp, rain, humidity);
        let last = alerts.iter().last().unwrap();
        prop_assert_eq!(last.kind, AlertKind::HeatAndDrought);
    }
}
