//! Position samples as delivered by the host data source.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, RouteViewError};
use crate::FloorLabel;

/// One positioning record for a tracked device.
///
/// The host delivers records newest first; [`crate::aggregate`] reverses
/// them before building routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Tracked device identifier
    #[serde(rename = "hash_id", alias = "device_id")]
    pub device_id: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Unix timestamp (seconds since epoch)
    pub timestamp: f64,
    /// Estimated positioning error in map units
    #[serde(rename = "uncertainty", default)]
    pub uncertainty_radius: Option<f64>,
    #[serde(rename = "floor", default, deserialize_with = "deserialize_floor")]
    pub floor_label: Option<FloorLabel>,
    #[serde(rename = "vendor", default)]
    pub vendor_name: Option<String>,
}

impl PositionSample {
    /// Create a sample with no uncertainty, floor or vendor.
    pub fn new(device_id: &str, longitude: f64, latitude: f64, timestamp: f64) -> Self {
        Self {
            device_id: device_id.to_string(),
            longitude,
            latitude,
            timestamp,
            uncertainty_radius: None,
            floor_label: None,
            vendor_name: None,
        }
    }

    pub fn with_floor(mut self, floor: impl Into<FloorLabel>) -> Self {
        self.floor_label = Some(floor.into());
        self
    }

    pub fn with_uncertainty(mut self, radius: f64) -> Self {
        self.uncertainty_radius = Some(radius);
        self
    }

    pub fn with_vendor(mut self, vendor: &str) -> Self {
        self.vendor_name = Some(vendor.to_string());
        self
    }

    /// Coordinates and timestamp are all finite.
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite() && self.timestamp.is_finite()
    }
}

/// Floor value as hosts send it.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFloor {
    Number(FloorLabel),
    Text(String),
}

impl RawFloor {
    /// Numeric strings compare equal to the number they spell; anything
    /// else matches no floor.
    fn into_label(self) -> Option<FloorLabel> {
        let label = match self {
            RawFloor::Number(n) => n,
            RawFloor::Text(s) => s.trim().parse().ok()?,
        };
        label.is_finite().then_some(label)
    }
}

/// Read a floor given as a number, a numeric string or null.
pub(crate) fn deserialize_floor<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<FloorLabel>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawFloor>::deserialize(deserializer)?.and_then(RawFloor::into_label))
}

/// Parse the host's record buffer (a JSON array of objects).
///
/// Records missing a device id, coordinate or timestamp are rejected with
/// the index of the first offending record.
pub fn parse_samples(json: &str) -> Result<Vec<PositionSample>> {
    let records: Vec<serde_json::Value> = serde_json::from_str(json)?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record).map_err(|e| RouteViewError::MalformedSample {
                index,
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_records() {
        let json = r#"[
            {"hash_id": "a1", "longitude": 11.6, "latitude": 48.2, "timestamp": 105,
             "uncertainty": 3.5, "floor": 1, "vendor": "Apple"},
            {"device_id": "b2", "longitude": 11.7, "latitude": 48.3, "timestamp": 100}
        ]"#;
        let samples = parse_samples(json).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].device_id, "a1");
        assert_eq!(samples[0].floor_label, Some(1.0));
        assert_eq!(samples[0].vendor_name.as_deref(), Some("Apple"));
        assert_eq!(samples[1].device_id, "b2");
        assert_eq!(samples[1].uncertainty_radius, None);
    }

    #[test]
    fn test_parse_fractional_and_text_floors() {
        let json = r#"[
            {"hash_id": "a1", "longitude": 11.6, "latitude": 48.2, "timestamp": 110, "floor": 2.5},
            {"hash_id": "a1", "longitude": 11.6, "latitude": 48.2, "timestamp": 105, "floor": "1"},
            {"hash_id": "a1", "longitude": 11.6, "latitude": 48.2, "timestamp": 100, "floor": "lobby"},
            {"hash_id": "a1", "longitude": 11.6, "latitude": 48.2, "timestamp": 95, "floor": null}
        ]"#;
        let samples = parse_samples(json).unwrap();
        assert_eq!(samples[0].floor_label, Some(2.5));
        assert_eq!(samples[1].floor_label, Some(1.0));
        assert_eq!(samples[2].floor_label, None);
        assert_eq!(samples[3].floor_label, None);
    }

    #[test]
    fn test_parse_reports_malformed_index() {
        let json = r#"[
            {"hash_id": "a1", "longitude": 11.6, "latitude": 48.2, "timestamp": 105},
            {"hash_id": "a1", "latitude": 48.2, "timestamp": 100}
        ]"#;
        let err = parse_samples(json).unwrap_err();
        assert!(matches!(err, RouteViewError::MalformedSample { index: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_samples(r#"{"hash_id": "a1"}"#),
            Err(RouteViewError::Json(_))
        ));
    }

    #[test]
    fn test_sample_validation() {
        assert!(PositionSample::new("x", 0.0, 0.0, 1.0).is_valid());
        assert!(!PositionSample::new("x", f64::NAN, 0.0, 1.0).is_valid());
        assert!(!PositionSample::new("x", 0.0, 0.0, f64::INFINITY).is_valid());
    }
}
