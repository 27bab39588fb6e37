//! Spherical Web Mercator (EPSG:3857), the projection the map engine draws in.
//!
//! Emitted geometry is in projected meters so arrow rotations match what
//! the operator sees on screen.

use serde::{Deserialize, Serialize};

use crate::GpsPoint;

/// WGS84 semi-major axis used by EPSG:3857.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A projected map coordinate in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCoord {
    pub x: f64,
    pub y: f64,
}

impl MapCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Project a GPS point to Web Mercator.
pub fn to_map(point: &GpsPoint) -> MapCoord {
    let lat = point.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS_M * point.longitude.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    MapCoord::new(x, y)
}

/// Screen rotation (radians, clockwise) for an icon pointing from `from` to `to`.
pub fn heading_rotation(from: &MapCoord, to: &MapCoord) -> f64 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    -dy.atan2(dx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_projects_to_origin() {
        let c = to_map(&GpsPoint::new(0.0, 0.0));
        assert!(c.x.abs() < 1e-9);
        assert!(c.y.abs() < 1e-9);
    }

    #[test]
    fn test_antimeridian_x() {
        let c = to_map(&GpsPoint::new(0.0, 180.0));
        assert!((c.x - 20_037_508.342_789_244).abs() < 1e-3);
    }

    #[test]
    fn test_heading_rotation() {
        let origin = MapCoord::new(0.0, 0.0);
        // East: no rotation
        assert_eq!(heading_rotation(&origin, &MapCoord::new(1.0, 0.0)), 0.0);
        // North: quarter turn counter-clockwise on screen
        let north = heading_rotation(&origin, &MapCoord::new(0.0, 1.0));
        assert!((north + std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
