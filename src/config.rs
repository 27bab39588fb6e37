//! Widget options as delivered by the dashboard host.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, RouteViewError};
use crate::samples::deserialize_floor;
use crate::FloorLabel;

/// Highest zoom level accepted for the initial map view.
pub const MAX_ZOOM_LEVEL: f64 = 28.0;

/// Options recognised by the route widget.
///
/// Field names follow the host's option keys, so a partial JSON object from
/// the panel editor deserializes with the remaining fields at their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Initial map center latitude.
    /// Default: 48.262725
    pub center_lat: f64,

    /// Initial map center longitude.
    /// Default: 11.66725
    pub center_lon: f64,

    /// XYZ tile URL template for the default floor. Empty = no floor overlay.
    pub tile_url: String,

    /// XYZ tile URL template for the other floor. Empty disables tile swapping.
    pub tile_other: String,

    /// Initial zoom level.
    /// Default: 18
    pub zoom_level: f64,

    /// Floor label that selects the alternate colors, arrow and tile set.
    /// Default: 1
    #[serde(deserialize_with = "deserialize_other_floor")]
    pub other_floor: FloorLabel,

    /// Draw one uncertainty circle per visible sample.
    /// Default: true
    #[serde(rename = "showRadius")]
    pub show_radius: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center_lat: 48.262725,
            center_lon: 11.66725,
            tile_url: String::new(),
            tile_other: String::new(),
            zoom_level: 18.0,
            other_floor: 1.0,
            show_radius: true,
        }
    }
}

impl MapOptions {
    /// Parse options from the host's JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: MapOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject options the map view cannot be initialised with.
    pub fn validate(&self) -> Result<()> {
        if !self.center_lat.is_finite() || !(-90.0..=90.0).contains(&self.center_lat) {
            return Err(RouteViewError::InvalidConfig {
                message: format!("center_lat {} is outside [-90, 90]", self.center_lat),
            });
        }
        if !self.center_lon.is_finite() || !(-180.0..=180.0).contains(&self.center_lon) {
            return Err(RouteViewError::InvalidConfig {
                message: format!("center_lon {} is outside [-180, 180]", self.center_lon),
            });
        }
        if !self.zoom_level.is_finite() || !(0.0..=MAX_ZOOM_LEVEL).contains(&self.zoom_level) {
            return Err(RouteViewError::InvalidConfig {
                message: format!(
                    "zoom_level {} is outside [0, {}]",
                    self.zoom_level, MAX_ZOOM_LEVEL
                ),
            });
        }
        Ok(())
    }

    /// Both floor tile sets are configured, so segment steps may swap tiles.
    pub fn floor_tiles_enabled(&self) -> bool {
        !self.tile_url.is_empty() && !self.tile_other.is_empty()
    }

    /// Map center differs from `other`.
    pub(crate) fn center_changed(&self, other: &MapOptions) -> bool {
        self.center_lat != other.center_lat || self.center_lon != other.center_lon
    }
}

fn deserialize_other_floor<'de, D>(deserializer: D) -> std::result::Result<FloorLabel, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_floor(deserializer)?
        .ok_or_else(|| D::Error::custom("other_floor must be a number"))
}
