//! Free-hand distance measurement.
//!
//! The operator clicks vertices on the map; finishing stores the polyline
//! and every segment gets its own length label. Escape drops the line
//! being drawn.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_distance, polyline_length};
use crate::GpsPoint;

/// Lengths above this many meters are shown in kilometers.
pub const KM_THRESHOLD_M: f64 = 100.0;

/// Key that aborts an in-progress measurement.
pub const ABORT_KEY: &str = "Escape";

/// A finished measurement polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub vertices: Vec<GpsPoint>,
}

impl Measurement {
    /// Length of each segment in meters.
    pub fn segment_lengths(&self) -> Vec<f64> {
        self.vertices
            .windows(2)
            .map(|w| haversine_distance(&w[0], &w[1]))
            .collect()
    }

    pub fn total_length(&self) -> f64 {
        polyline_length(&self.vertices)
    }
}

/// Measurement tool state.
#[derive(Debug, Clone, Default)]
pub struct MeasureTool {
    sketch: Option<Vec<GpsPoint>>,
    finished: Vec<Measurement>,
}

impl MeasureTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.sketch.is_some()
    }

    /// Vertices of the line being drawn, if any.
    pub fn sketch(&self) -> Option<&[GpsPoint]> {
        self.sketch.as_deref()
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.finished
    }

    /// Begin a new line, discarding any unfinished one.
    pub fn start(&mut self) {
        self.sketch = Some(Vec::new());
    }

    /// Append a vertex. Starts a line if none is in progress.
    pub fn add_vertex(&mut self, point: GpsPoint) {
        if !point.is_valid() {
            debug!("[Measure] Ignoring invalid vertex {:?}", point);
            return;
        }
        self.sketch.get_or_insert_with(Vec::new).push(point);
    }

    /// Finish the current line. Lines with fewer than two vertices are dropped.
    pub fn finish(&mut self) -> Option<&Measurement> {
        let vertices = self.sketch.take()?;
        if vertices.len() < 2 {
            return None;
        }
        let measurement = Measurement { vertices };
        debug!(
            "[Measure] Finished {} ({} vertices)",
            format_length(measurement.total_length()),
            measurement.vertices.len()
        );
        self.finished.push(measurement);
        self.finished.last()
    }

    /// Drop the line being drawn.
    pub fn abort(&mut self) {
        if self.sketch.take().is_some() {
            debug!("[Measure] Aborted");
        }
    }

    /// Keyboard handler; returns whether the key was consumed.
    pub fn handle_key(&mut self, key: &str) -> bool {
        if key == ABORT_KEY && self.is_drawing() {
            self.abort();
            return true;
        }
        false
    }

    /// Remove all measurements and any sketch.
    pub fn clear(&mut self) {
        self.sketch = None;
        self.finished.clear();
    }
}

/// Format a length for display: meters up to 100 m, kilometers above,
/// both rounded to two decimals.
///
/// # Example
/// ```
/// use route_viewer::format_length;
/// assert_eq!(format_length(42.0), "42 m");
/// assert_eq!(format_length(1234.0), "1.23 km");
/// ```
pub fn format_length(meters: f64) -> String {
    if meters > KM_THRESHOLD_M {
        format!("{} km", round2(meters / 1000.0))
    } else {
        format!("{} m", round2(meters))
    }
}

/// Round to two decimals, ties away from zero.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk() -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(48.2620, 11.6670),
            GpsPoint::new(48.2625, 11.6670),
            GpsPoint::new(48.2625, 11.6680),
        ]
    }

    #[test]
    fn test_format_length() {
        assert_eq!(format_length(0.0), "0 m");
        assert_eq!(format_length(12.346), "12.35 m");
        assert_eq!(format_length(100.0), "100 m");
        assert_eq!(format_length(150.0), "0.15 km");
        assert_eq!(format_length(2000.0), "2 km");
    }

    #[test]
    fn test_finish_stores_measurement() {
        let mut tool = MeasureTool::new();
        tool.start();
        for p in walk() {
            tool.add_vertex(p);
        }
        let m = tool.finish().unwrap();
        assert_eq!(m.vertices.len(), 3);
        assert_eq!(m.segment_lengths().len(), 2);
        assert!(!tool.is_drawing());
        assert_eq!(tool.measurements().len(), 1);
    }

    #[test]
    fn test_short_sketch_dropped() {
        let mut tool = MeasureTool::new();
        tool.add_vertex(GpsPoint::new(48.0, 11.0));
        assert!(tool.finish().is_none());
        assert!(tool.measurements().is_empty());
    }

    #[test]
    fn test_escape_aborts() {
        let mut tool = MeasureTool::new();
        tool.start();
        tool.add_vertex(GpsPoint::new(48.0, 11.0));
        assert!(!tool.handle_key("Enter"));
        assert!(tool.handle_key(ABORT_KEY));
        assert!(!tool.is_drawing());
        assert!(tool.finish().is_none());
        // Nothing left to abort
        assert!(!tool.handle_key(ABORT_KEY));
    }

    #[test]
    fn test_invalid_vertex_ignored() {
        let mut tool = MeasureTool::new();
        tool.start();
        tool.add_vertex(GpsPoint::new(f64::NAN, 11.0));
        assert_eq!(tool.sketch().map(|s| s.len()), Some(0));
    }
}
