//! Geographic utilities.

use geo::{Distance, Haversine, Point};

use crate::GpsPoint;

/// Great-circle distance between two points in meters (mean Earth radius).
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Haversine::distance(
        Point::new(p1.longitude, p1.latitude),
        Point::new(p2.longitude, p2.latitude),
    )
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}
