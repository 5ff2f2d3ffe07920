//! Common types used across the platform

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept when a location is used as a cache or seed key.
/// Two places is roughly a 1 km grid.
pub const LOCATION_KEY_DP: u32 = 2;

/// GPS coordinates of a field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GeoPoint {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GeoPoint {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn from_f64(latitude: f64, longitude: f64) -> Option<Self> {
        Some(Self {
            latitude: Decimal::from_f64_retain(latitude)?,
            longitude: Decimal::from_f64_retain(longitude)?,
        })
    }

    /// Location snapped to the key grid.
    pub fn rounded(&self) -> Self {
        Self {
            latitude: self
                .latitude
                .round_dp_with_strategy(LOCATION_KEY_DP, RoundingStrategy::MidpointAwayFromZero),
            longitude: self
                .longitude
                .round_dp_with_strategy(LOCATION_KEY_DP, RoundingStrategy::MidpointAwayFromZero),
        }
    }

    /// Stable 64-bit key derived from the rounded coordinates.
    ///
    /// Latitude occupies the high 32 bits and longitude the low 32 bits, both
    /// as hundredths of a degree, so nearby-but-distinct grid cells never
    /// collide.
    pub fn location_key(&self) -> u64 {
        let scale = Decimal::from(10u32.pow(LOCATION_KEY_DP));
        let rounded = self.rounded();
        let lat = (rounded.latitude * scale).to_i64().unwrap_or_default() as i32;
        let lon = (rounded.longitude * scale).to_i64().unwrap_or_default() as i32;
        ((lat as u32 as u64) << 32) | (lon as u32 as u64)
    }

    pub fn latitude_f64(&self) -> f64 {
        self.latitude.to_f64().unwrap_or_default()
    }

    pub fn longitude_f64(&self) -> f64 {
        self.longitude.to_f64().unwrap_or_default()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Square region around a field centre, in degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingRegion {
    pub center: GeoPoint,
    pub half_extent_deg: f64,
}

impl BoundingRegion {
    pub fn around(center: GeoPoint, half_extent_deg: f64) -> Self {
        Self {
            center,
            half_extent_deg,
        }
    }

    /// Closed ring of `[lon, lat]` corners, counter-clockwise, GeoJSON order.
    pub fn ring(&self) -> Vec<[f64; 2]> {
        let lat = self.center.latitude_f64();
        let lon = self.center.longitude_f64();
        let d = self.half_extent_deg;
        vec![
            [lon - d, lat - d],
            [lon + d, lat - d],
            [lon + d, lat + d],
            [lon - d, lat + d],
            [lon - d, lat - d],
        ]
    }
}

/// Supported advisory languages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Infer from the farmer's query
    #[default]
    Auto,
    #[serde(alias = "en")]
    English,
    #[serde(alias = "hi")]
    Hindi,
    #[serde(alias = "or")]
    Odia,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Auto => "auto",
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Odia => "or",
        }
    }

    /// Instruction appended at the end of the advisory prompt.
    pub fn directive(&self) -> &'static str {
        match self {
            Language::Auto => {
                "Answer in the language of the farmer's query. Do not mix languages."
            }
            Language::English => "Answer only in English.",
            Language::Hindi => "Answer only in Hindi (Devanagari script).",
            Language::Odia => "Answer only in Odia (Odia script).",
        }
    }
}

impl FromStr for Language {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Language::Auto),
            "en" | "english" => Ok(Language::English),
            "hi" | "hindi" => Ok(Language::Hindi),
            "or" | "od" | "odia" | "oriya" => Ok(Language::Odia),
            _ => Err("Unsupported language"),
        }
    }
}

/// Date range for queries (inclusive)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, &'static str> {
        if start > end {
            return Err("Date range start must not be after its end");
        }
        Ok(Self { start, end })
    }

    /// The same window moved back by a whole year.
    pub fn shifted_back_one_year(&self) -> Self {
        let shift = chrono::Duration::days(365);
        Self {
            start: self.start - shift,
            end: self.end - shift,
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn location_key_is_stable_within_grid_cell() {
        let a = GeoPoint::new(dec("20.2961"), dec("85.8245"));
        let b = GeoPoint::new(dec("20.2989"), dec("85.8212"));
        assert_eq!(a.location_key(), b.location_key());
    }

    #[test]
    fn location_key_differs_between_cells() {
        let a = GeoPoint::new(dec("20.29"), dec("85.82"));
        let b = GeoPoint::new(dec("20.30"), dec("85.82"));
        let c = GeoPoint::new(dec("-20.29"), dec("85.82"));
        assert_ne!(a.location_key(), b.location_key());
        assert_ne!(a.location_key(), c.location_key());
    }

    #[test]
    fn language_parsing() {
        assert_eq!("hi".parse::<Language>().unwrap(), Language::Hindi);
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert_eq!("".parse::<Language>().unwrap(), Language::Auto);
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(DateRange::new(start, end).is_err());
        let range = DateRange::new(end, start).unwrap();
        assert_eq!(range.days(), 61);
    }

    #[test]
    fn bounding_region_ring_is_closed() {
        let region = BoundingRegion::around(GeoPoint::new(dec("20.0"), dec("85.0")), 0.01);
        let ring = region.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }
}
