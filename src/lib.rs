//! # Route Viewer
//!
//! Per-device route aggregation and map view state for indoor positioning
//! dashboards.
//!
//! This library provides:
//! - Grouping of flat positioning samples into chronological device routes
//! - A view state machine for stepping through a route segment by segment
//! - Declarative map layers (tiles, route lines, uncertainty circles,
//!   distance measurements) for an external map engine to draw
//!
//! ## Features
//!
//! - **`ffi`** - Enable FFI bindings for dashboard hosts
//!
//! ## Quick Start
//!
//! ```rust
//! use route_viewer::{ContainerHandle, MapOptions, PositionSample, RouteWidget, UiEvent};
//!
//! // Host data arrives newest first
//! let samples = vec![
//!     PositionSample::new("tag-1", 11.6674, 48.2628, 120.0).with_floor(0),
//!     PositionSample::new("tag-1", 11.6673, 48.2627, 110.0).with_floor(0),
//!     PositionSample::new("tag-1", 11.6672, 48.2626, 100.0).with_floor(1),
//! ];
//!
//! let mut widget = RouteWidget::new(ContainerHandle::from("panel-7"));
//! widget.on_mount(MapOptions::default(), &samples).unwrap();
//! widget
//!     .handle_event(UiEvent::SelectDevice { device_id: Some("tag-1".to_string()) })
//!     .unwrap();
//!
//! let scene = widget.scene().unwrap();
//! assert!(!scene.layers.is_empty());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, RouteViewError};

// Widget options
pub mod config;
pub use config::MapOptions;

// Host records
pub mod samples;
pub use samples::{parse_samples, PositionSample};

// Per-device route aggregation
pub mod aggregate;
pub use aggregate::{aggregate, AggregatedRoutes, DeviceRoute};

// Geographic utilities (distance, lengths)
pub mod geo_utils;

// Web Mercator projection
pub mod projection;
pub use projection::MapCoord;

// Route view state machine
pub mod view;
pub use view::{FloorTile, StepDirection, ViewController, ViewMode, ViewState};

// Declarative map layers
pub mod layers;
pub use layers::{Feature, Layer, LayerId, MapScene, TileLayer, VectorLayer, Viewport};

// Free-hand distance measurement
pub mod measure;
pub use measure::{format_length, MeasureTool, Measurement};

// Widget lifecycle and per-container registry
pub mod widget;
pub use widget::{
    register_widget, remove_widget, with_widget, ContainerHandle, DeviceOption, RouteWidget,
    Toolbar, UiEvent, WIDGETS,
};

// FFI bindings for dashboard hosts
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RouteViewerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// Floor label reported by the positioning system.
///
/// Hosts send plain numbers, so half levels such as mezzanine `2.5` occur.
pub type FloorLabel = f64;

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use route_viewer::GpsPoint;
/// let point = GpsPoint::new(48.262725, 11.66725);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(48.262725, 11.66725).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_end_to_end_segment_label() {
        let samples = vec![
            PositionSample::new("x", 1.0, 1.0, 105.0),
            PositionSample::new("x", 0.0, 0.0, 100.0),
        ];
        let routes = aggregate(&samples);
        let mut view = ViewController::new(1.0, false);
        view.select_device(Some("x"), &routes);
        view.toggle_show_total(&routes);

        let options = MapOptions::default();
        let layers = layers::build_layers(&routes, &view, &options, &MeasureTool::new());
        let segment = layers
            .iter()
            .find_map(|l| match l {
                Layer::Vector(v) if v.id == LayerId::Segment => Some(v),
                _ => None,
            })
            .unwrap();

        let label = segment.features.iter().find_map(|f| match f {
            Feature::Line { label: Some(label), .. } => Some(label.text.clone()),
            _ => None,
        });
        assert_eq!(label.as_deref(), Some("5.00s"));
    }
}
