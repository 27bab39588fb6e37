//! Declarative map layers for the external map engine.
//!
//! Every transition rebuilds the full layer list from the aggregated
//! routes, the view state and the options. The engine replaces what it
//! draws wholesale, so no layer handle outlives a transition.

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedRoutes, DeviceRoute};
use crate::config::MapOptions;
use crate::measure::{format_length, round2, MeasureTool, Measurement};
use crate::projection::{heading_rotation, to_map, MapCoord};
use crate::view::{FloorTile, ViewController, ViewMode};
use crate::{FloorLabel, GpsPoint};

/// CARTO Voyager raster basemap, always drawn underneath.
pub const BASEMAP_URL: &str =
    "https://{1-4}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png";

pub const DEFAULT_COLOR: &str = "rgba(73,168,222)";
pub const OTHER_FLOOR_COLOR: &str = "rgba(255,176,0)";
pub const DEFAULT_FILL: &str = "rgba(73,168,222,0.6)";
pub const OTHER_FLOOR_FILL: &str = "rgba(255,176,0,0.6)";
pub const MEASURE_COLOR: &str = "rgba(0, 0, 0, 0.5)";
pub const HALO_COLOR: &str = "#fff";

pub const LINE_WIDTH: f64 = 2.0;
pub const SEGMENT_LABEL_FONT: &str = "18px Calibri,sans-serif";
pub const MEASURE_LABEL_FONT: &str = "12px/1 sans-serif";

/// Circle radius used when a sample has no usable uncertainty.
pub const FALLBACK_RADIUS: f64 = 2.0;

/// Arrow icon anchor, fraction of the icon size.
pub const ARROW_ANCHOR: [f64; 2] = [0.75, 0.5];

pub const BASEMAP_Z: i32 = 0;
pub const FLOOR_TILE_Z: i32 = 1;
pub const ROUTE_Z: i32 = 2;
pub const MEASURE_Z: i32 = 2;

/// Initial camera for the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: MapCoord,
    pub zoom: f64,
    /// Animate to `center` over this many milliseconds instead of jumping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_ms: Option<u32>,
}

impl Viewport {
    pub fn from_options(options: &MapOptions) -> Self {
        Self {
            center: to_map(&GpsPoint::new(options.center_lat, options.center_lon)),
            zoom: options.zoom_level,
            animation_ms: None,
        }
    }
}

/// Everything the map engine needs to draw one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapScene {
    pub container: String,
    pub viewport: Viewport,
    pub layers: Vec<Layer>,
}

impl MapScene {
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn vector_layer(&self, id: LayerId) -> Option<&VectorLayer> {
        match self.layer(id)? {
            Layer::Vector(v) => Some(v),
            Layer::Tile(_) => None,
        }
    }

    pub fn tile_layer(&self, id: LayerId) -> Option<&TileLayer> {
        match self.layer(id)? {
            Layer::Tile(t) => Some(t),
            Layer::Vector(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    Basemap,
    FloorTile,
    TotalRoute,
    Segment,
    Measurement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    Tile(TileLayer),
    Vector(VectorLayer),
}

impl Layer {
    pub fn id(&self) -> LayerId {
        match self {
            Layer::Tile(t) => t.id,
            Layer::Vector(v) => v.id,
        }
    }
}

/// XYZ raster tile layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub id: LayerId,
    pub url: String,
    pub z_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    pub id: LayerId,
    pub z_index: i32,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_dash: Option<Vec<f64>>,
}

impl Stroke {
    fn solid(color: &str) -> Self {
        Self {
            color: color.to_string(),
            width: LINE_WIDTH,
            line_dash: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLabel {
    pub text: String,
    pub font: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    pub halo: Stroke,
}

/// Arrow sprite, chosen by the floor of the point the arrow sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowIcon {
    Default,
    OtherFloor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowMarker {
    pub position: MapCoord,
    pub icon: ArrowIcon,
    pub anchor: [f64; 2],
    /// Clockwise radians
    pub rotation: f64,
    pub rotate_with_view: bool,
}

/// Length label for one segment of a measurement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentLabel {
    pub from: MapCoord,
    pub to: MapCoord,
    pub label: TextLabel,
}

/// A drawable map feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Feature {
    /// Route segment between two samples
    Line {
        coords: Vec<MapCoord>,
        stroke: Stroke,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<TextLabel>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arrow: Option<ArrowMarker>,
    },
    /// Uncertainty circle around a sample
    Circle {
        center: MapCoord,
        radius: f64,
        fill: String,
    },
    /// Measured polyline with per-segment lengths
    Measurement {
        coords: Vec<MapCoord>,
        stroke: Stroke,
        segment_labels: Vec<SegmentLabel>,
    },
}

// ============================================================================
// Feature builders
// ============================================================================

/// Segment duration label, e.g. `"10.50s"`. Ties round up, so 0.125 s
/// reads `"0.13s"`.
pub fn format_duration(secs: f64) -> String {
    format!("{:.2}s", round2(secs))
}

fn floor_color(route: &DeviceRoute, index: usize, other_floor: FloorLabel) -> &'static str {
    if route.is_on_floor(index, other_floor) {
        OTHER_FLOOR_COLOR
    } else {
        DEFAULT_COLOR
    }
}

/// Line for segment `index` with an arrow at its end point.
///
/// `projected` holds the route's coordinates already in map space.
pub fn segment_line(
    route: &DeviceRoute,
    projected: &[MapCoord],
    index: usize,
    other_floor: FloorLabel,
    with_duration: bool,
) -> Option<Feature> {
    let from = *projected.get(index)?;
    let to = *projected.get(index + 1)?;

    let icon = if route.is_on_floor(index + 1, other_floor) {
        ArrowIcon::OtherFloor
    } else {
        ArrowIcon::Default
    };

    let label = if with_duration {
        route.segment_duration(index).map(|secs| TextLabel {
            text: format_duration(secs),
            font: SEGMENT_LABEL_FONT.to_string(),
            fill: None,
            halo: Stroke::solid(HALO_COLOR),
        })
    } else {
        None
    };

    Some(Feature::Line {
        coords: vec![from, to],
        stroke: Stroke::solid(floor_color(route, index, other_floor)),
        label,
        arrow: Some(ArrowMarker {
            position: to,
            icon,
            anchor: ARROW_ANCHOR,
            rotation: heading_rotation(&from, &to),
            rotate_with_view: true,
        }),
    })
}

/// Uncertainty circle for sample `index`.
pub fn uncertainty_circle(
    route: &DeviceRoute,
    projected: &[MapCoord],
    index: usize,
    other_floor: FloorLabel,
) -> Option<Feature> {
    let center = *projected.get(index)?;
    let radius = route
        .uncertainties
        .get(index)
        .copied()
        .flatten()
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(FALLBACK_RADIUS);
    let fill = if route.is_on_floor(index, other_floor) {
        OTHER_FLOOR_FILL
    } else {
        DEFAULT_FILL
    };
    Some(Feature::Circle {
        center,
        radius,
        fill: fill.to_string(),
    })
}

fn project_route(route: &DeviceRoute) -> Vec<MapCoord> {
    route.coords.iter().map(to_map).collect()
}

/// All segments of a route, plus one circle per sample when enabled.
pub fn total_route_layer(route: &DeviceRoute, options: &MapOptions) -> VectorLayer {
    let projected = project_route(route);
    let other = options.other_floor;

    let mut features = Vec::with_capacity(route.len() * 2);
    if options.show_radius {
        features.extend(
            (0..route.len()).filter_map(|i| uncertainty_circle(route, &projected, i, other)),
        );
    }
    features.extend(
        (0..route.segment_count()).filter_map(|i| segment_line(route, &projected, i, other, false)),
    );

    VectorLayer {
        id: LayerId::TotalRoute,
        z_index: ROUTE_Z,
        features,
    }
}

/// The current segment with its duration label, plus begin/end circles when enabled.
pub fn segment_layer(route: &DeviceRoute, index: usize, options: &MapOptions) -> VectorLayer {
    let projected = project_route(route);
    let other = options.other_floor;

    let mut features: Vec<Feature> = segment_line(route, &projected, index, other, true)
        .into_iter()
        .collect();
    if options.show_radius {
        features.extend(uncertainty_circle(route, &projected, index, other));
        features.extend(uncertainty_circle(route, &projected, index + 1, other));
    }

    VectorLayer {
        id: LayerId::Segment,
        z_index: ROUTE_Z,
        features,
    }
}

/// Floor overlay for the displayed tile, if its URL is configured.
pub fn floor_tile_layer(tile: FloorTile, options: &MapOptions) -> Option<TileLayer> {
    let url = match tile {
        FloorTile::OtherFloor if options.floor_tiles_enabled() => &options.tile_other,
        _ => &options.tile_url,
    };
    if url.is_empty() {
        return None;
    }
    Some(TileLayer {
        id: LayerId::FloorTile,
        url: url.clone(),
        z_index: FLOOR_TILE_Z,
    })
}

fn measurement_feature(vertices: &[GpsPoint], dashed: bool) -> Feature {
    let coords: Vec<MapCoord> = vertices.iter().map(to_map).collect();
    let segment_labels = Measurement {
        vertices: vertices.to_vec(),
    }
    .segment_lengths()
    .into_iter()
    .zip(coords.windows(2))
    .map(|(meters, pair)| SegmentLabel {
        from: pair[0],
        to: pair[1],
        label: TextLabel {
            text: format_length(meters),
            font: MEASURE_LABEL_FONT.to_string(),
            fill: Some("#000".to_string()),
            halo: Stroke::solid(HALO_COLOR),
        },
    })
    .collect();

    Feature::Measurement {
        coords,
        stroke: Stroke {
            line_dash: dashed.then(|| vec![10.0, 10.0]),
            ..Stroke::solid(MEASURE_COLOR)
        },
        segment_labels,
    }
}

/// Finished measurements, plus the dashed line being drawn.
pub fn measurement_layer(tool: &MeasureTool) -> VectorLayer {
    let mut features: Vec<Feature> = tool
        .measurements()
        .iter()
        .map(|m| measurement_feature(&m.vertices, false))
        .collect();
    if let Some(sketch) = tool.sketch().filter(|s| !s.is_empty()) {
        features.push(measurement_feature(sketch, true));
    }
    VectorLayer {
        id: LayerId::Measurement,
        z_index: MEASURE_Z,
        features,
    }
}

/// Build every layer for the current state, bottom to top.
pub fn build_layers(
    routes: &AggregatedRoutes,
    view: &ViewController,
    options: &MapOptions,
    measure: &MeasureTool,
) -> Vec<Layer> {
    let mut layers = vec![Layer::Tile(TileLayer {
        id: LayerId::Basemap,
        url: BASEMAP_URL.to_string(),
        z_index: BASEMAP_Z,
    })];

    if let Some(tile) = floor_tile_layer(view.floor_tile(), options) {
        layers.push(Layer::Tile(tile));
    }

    match view.mode(routes) {
        ViewMode::NoSelection => {}
        ViewMode::TotalRoute { route } => {
            layers.push(Layer::Vector(total_route_layer(route, options)));
        }
        ViewMode::Segment { route, index } => {
            layers.push(Layer::Vector(segment_layer(route, index, options)));
        }
    }

    layers.push(Layer::Vector(measurement_layer(measure)));
    layers
}
