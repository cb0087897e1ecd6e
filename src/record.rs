//! Input Data Model
//!
//! A parsed CSV row is a [`RangeRow`]: an inclusive IPv4 range plus the
//! geographic payload attached to every address in it. The payload variant
//! carries the database mode.

use crate::types::DbMode;
use std::collections::BTreeSet;

/// Geographic payload attached to an IP range
///
/// Coordinates stay in their source string form; the data section
/// deduplicates doubles on the exact input spelling, so `"51.50"` and
/// `"51.5"` are distinct entries even though they encode the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoPayload {
    /// Country schema payload
    Country {
        /// ISO 3166-1 alpha-2 code
        iso_code: String,
        /// English country name
        country_name: String,
    },
    /// City schema payload
    City {
        /// ISO 3166-1 alpha-2 code
        iso_code: String,
        /// English country name
        country_name: String,
        /// Region / subdivision name
        region: String,
        /// City name
        city: String,
        /// Latitude, as written in the input
        latitude: String,
        /// Longitude, as written in the input
        longitude: String,
        /// Postal code
        postal_code: String,
    },
}

impl GeoPayload {
    /// Database mode this payload belongs to
    pub fn mode(&self) -> DbMode {
        match self {
            GeoPayload::Country { .. } => DbMode::Country,
            GeoPayload::City { .. } => DbMode::City,
        }
    }

    /// Stable key identifying the encoded data record this payload maps to
    ///
    /// Two rows with equal keys share one record in the data section.
    pub fn key(&self) -> String {
        match self {
            GeoPayload::Country { iso_code, .. } => iso_code.clone(),
            GeoPayload::City {
                iso_code,
                region,
                city,
                latitude,
                longitude,
                postal_code,
                ..
            } => format!(
                "{}|{}|{}|{}|{}|{}",
                iso_code, region, city, latitude, longitude, postal_code
            ),
        }
    }

    /// Add this payload's string values to the token table and its
    /// coordinates to the double table
    pub(crate) fn collect_strings(
        &self,
        tokens: &mut BTreeSet<String>,
        latlongs: &mut BTreeSet<String>,
    ) {
        match self {
            GeoPayload::Country {
                iso_code,
                country_name,
            } => {
                tokens.insert(iso_code.clone());
                tokens.insert(country_name.clone());
            }
            GeoPayload::City {
                iso_code,
                country_name,
                region,
                city,
                latitude,
                longitude,
                postal_code,
            } => {
                tokens.insert(iso_code.clone());
                tokens.insert(country_name.clone());
                tokens.insert(region.clone());
                tokens.insert(city.clone());
                tokens.insert(postal_code.clone());
                latlongs.insert(latitude.clone());
                latlongs.insert(longitude.clone());
            }
        }
    }
}

/// One parsed input row: an inclusive IPv4 range and its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRow {
    /// First address of the range
    pub start: u32,
    /// Last address of the range (inclusive)
    pub end: u32,
    /// Geographic payload for every address in the range
    pub payload: GeoPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city_payload() -> GeoPayload {
        GeoPayload::City {
            iso_code: "GB".to_string(),
            country_name: "United Kingdom".to_string(),
            region: "England".to_string(),
            city: "London".to_string(),
            latitude: "51.5".to_string(),
            longitude: "-0.1".to_string(),
            postal_code: "EC1".to_string(),
        }
    }

    #[test]
    fn test_country_key_is_iso_code() {
        let p = GeoPayload::Country {
            iso_code: "US".to_string(),
            country_name: "United States".to_string(),
        };
        assert_eq!(p.key(), "US");
        assert_eq!(p.mode(), DbMode::Country);
    }

    #[test]
    fn test_city_key_excludes_country_name() {
        let p = city_payload();
        assert_eq!(p.key(), "GB|England|London|51.5|-0.1|EC1");
        assert_eq!(p.mode(), DbMode::City);
    }

    #[test]
    fn test_collect_strings_city() {
        let mut tokens = BTreeSet::new();
        let mut latlongs = BTreeSet::new();
        city_payload().collect_strings(&mut tokens, &mut latlongs);
        assert!(tokens.contains("London"));
        assert!(tokens.contains("United Kingdom"));
        assert!(tokens.contains("EC1"));
        assert!(!tokens.contains("51.5"));
        assert_eq!(latlongs.len(), 2);
        assert!(latlongs.contains("-0.1"));
    }
}
