//! # Route Widget
//!
//! One widget instance per dashboard panel. The host drives it through
//! three lifecycle hooks and a stream of UI events:
//!
//! - [`RouteWidget::on_mount`] aggregates the first dataset
//! - [`RouteWidget::on_data_or_config_changed`] diffs the previous and next
//!   options/data and applies only what changed
//! - [`RouteWidget::on_unmount`] drops everything the widget owns
//!
//! After every transition the scene is rebuilt wholesale, so the host can
//! hand it to the map engine as-is.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::DateTime;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, AggregatedRoutes};
use crate::config::MapOptions;
use crate::error::{OptionExt, Result, RouteViewError};
use crate::layers::{build_layers, MapScene, Viewport};
use crate::measure::MeasureTool;
use crate::view::{StepDirection, ViewController, ViewMode, ViewState};
use crate::{GpsPoint, PositionSample};

/// Duration of the camera animation when the configured center moves.
pub const RECENTER_ANIMATION_MS: u32 = 2000;

/// Opaque reference to the host element the widget renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHandle(String);

impl ContainerHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContainerHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// UI events delivered by the host toolbar and map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// Device picked in the selector or search box; `None` clears it
    SelectDevice { device_id: Option<String> },
    ToggleShowTotal,
    Step { direction: StepDirection },
    /// Slider is being dragged. Hosts may send fractional positions.
    SliderSliding { value: f64 },
    /// Slider released
    SliderCommitted { value: f64 },
    MeasureStart,
    MeasureVertex { longitude: f64, latitude: f64 },
    MeasureFinish,
    MeasureAbort,
    /// Remove every finished measurement
    MeasureClear,
    KeyPressed { key: String },
}

/// Selector entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOption {
    pub key: String,
    pub label: String,
}

/// Position slider, only shown in segment view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderModel {
    pub value: usize,
    pub max: usize,
}

/// Toolbar model for the host to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toolbar {
    pub options: Vec<DeviceOption>,
    pub selected: Option<String>,
    /// Previous/next buttons are clickable
    pub step_enabled: bool,
    pub toggle_label: String,
    pub status: Option<String>,
    pub slider: Option<SliderModel>,
    pub single_point_count: usize,
}

/// State that exists only while mounted.
#[derive(Debug)]
struct Mounted {
    options: MapOptions,
    samples: Vec<PositionSample>,
    routes: AggregatedRoutes,
    view: ViewController,
    measure: MeasureTool,
    viewport: Viewport,
    scene: MapScene,
}

/// A route widget bound to one host container.
#[derive(Debug)]
pub struct RouteWidget {
    container: ContainerHandle,
    mounted: Option<Mounted>,
}

impl RouteWidget {
    pub fn new(container: ContainerHandle) -> Self {
        Self {
            container,
            mounted: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initialise the map and aggregate the first dataset.
    pub fn on_mount(&mut self, options: MapOptions, samples: &[PositionSample]) -> Result<()> {
        if self.mounted.is_some() {
            return Err(RouteViewError::AlreadyMounted {
                container: self.container.to_string(),
            });
        }
        options.validate()?;

        let routes = aggregate(samples);
        info!(
            "[RouteWidget] Mounted '{}' with {} selectable devices",
            self.container,
            routes.ranking.len()
        );

        let viewport = Viewport::from_options(&options);
        let view = ViewController::new(options.other_floor, options.floor_tiles_enabled());
        let mut mounted = Mounted {
            scene: MapScene {
                container: self.container.to_string(),
                viewport: viewport.clone(),
                layers: Vec::new(),
            },
            options,
            samples: samples.to_vec(),
            routes,
            view,
            measure: MeasureTool::new(),
            viewport,
        };
        mounted.rebuild_scene();
        self.mounted = Some(mounted);
        Ok(())
    }

    /// Apply a host update. Only the parts that differ between `prev_*` and
    /// `next_*` are acted on.
    pub fn on_data_or_config_changed(
        &mut self,
        prev_options: &MapOptions,
        next_options: &MapOptions,
        prev_data: &[PositionSample],
        next_data: &[PositionSample],
    ) -> Result<()> {
        next_options.validate()?;
        let container = self.container.to_string();
        let m = self.mounted.as_mut().ok_or_not_mounted(&container)?;

        if prev_data != next_data {
            info!(
                "[RouteWidget] Dataset replaced for '{}' ({} samples)",
                container,
                next_data.len()
            );
            m.view.dataset_replaced();
            m.routes = aggregate(next_data);
            m.samples = next_data.to_vec();
        }

        if prev_options.tile_url != next_options.tile_url {
            debug!("[RouteWidget] Default tile URL changed");
            m.view.reset_floor_tile();
        }

        m.view
            .set_floor_rule(next_options.other_floor, next_options.floor_tiles_enabled());
        if prev_options.other_floor != next_options.other_floor {
            m.view.refresh_floor_tile(&m.routes);
        }

        if prev_options.zoom_level != next_options.zoom_level {
            m.viewport.zoom = next_options.zoom_level;
        }
        if prev_options.center_changed(next_options) {
            let target = Viewport::from_options(next_options);
            m.viewport.center = target.center;
            m.viewport.animation_ms = Some(RECENTER_ANIMATION_MS);
        } else {
            m.viewport.animation_ms = None;
        }

        m.options = next_options.clone();
        m.rebuild_scene();
        Ok(())
    }

    /// Convenience for hosts that only hand over the next options and data.
    pub fn update(&mut self, next_options: &MapOptions, next_data: &[PositionSample]) -> Result<()> {
        let (prev_options, prev_data) = {
            let m = self
                .mounted
                .as_ref()
                .ok_or_not_mounted(self.container.as_str())?;
            (m.options.clone(), m.samples.clone())
        };
        self.on_data_or_config_changed(&prev_options, next_options, &prev_data, next_data)
    }

    /// Drop all state owned by this widget.
    pub fn on_unmount(&mut self) {
        if self.mounted.take().is_some() {
            info!("[RouteWidget] Unmounted '{}'", self.container);
        }
    }

    // ========================================================================
    // UI events
    // ========================================================================

    /// Run one UI event to completion.
    pub fn handle_event(&mut self, event: UiEvent) -> Result<()> {
        let m = self
            .mounted
            .as_mut()
            .ok_or_not_mounted(self.container.as_str())?;

        match event {
            UiEvent::SelectDevice { device_id } => {
                m.view.select_device(device_id.as_deref(), &m.routes);
            }
            UiEvent::ToggleShowTotal => m.view.toggle_show_total(&m.routes),
            UiEvent::Step { direction } => {
                m.view.step(direction, &m.routes);
            }
            UiEvent::SliderSliding { value } | UiEvent::SliderCommitted { value } => {
                m.view.scrub(slider_position(value), &m.routes);
            }
            UiEvent::MeasureStart => m.measure.start(),
            UiEvent::MeasureVertex {
                longitude,
                latitude,
            } => m.measure.add_vertex(GpsPoint::new(latitude, longitude)),
            UiEvent::MeasureFinish => {
                m.measure.finish();
            }
            UiEvent::MeasureAbort => m.measure.abort(),
            UiEvent::MeasureClear => m.measure.clear(),
            UiEvent::KeyPressed { key } => {
                m.measure.handle_key(&key);
            }
        }

        m.viewport.animation_ms = None;
        m.rebuild_scene();
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Layers and camera for the map engine.
    pub fn scene(&self) -> Result<&MapScene> {
        Ok(&self.mounted()?.scene)
    }

    pub fn routes(&self) -> Result<&AggregatedRoutes> {
        Ok(&self.mounted()?.routes)
    }

    pub fn view_state(&self) -> Result<&ViewState> {
        Ok(self.mounted()?.view.state())
    }

    pub fn options(&self) -> Result<&MapOptions> {
        Ok(&self.mounted()?.options)
    }

    /// Toolbar model for the current state.
    pub fn toolbar(&self) -> Result<Toolbar> {
        let m = self.mounted()?;
        let state = m.view.state();
        let mode = m.view.mode(&m.routes);

        let status = match mode {
            ViewMode::NoSelection => None,
            ViewMode::TotalRoute { route } | ViewMode::Segment { route, .. } => {
                let i = state.segment_index;
                let end_index = if mode.is_segment() {
                    i + 1
                } else {
                    route.len() - 1
                };
                Some(format!(
                    "{} {} / {} -- Begin: {} -- End: {}",
                    route.device_id,
                    i + 1,
                    route.len() - 1,
                    format_timestamp(route.timestamps.get(i).copied()),
                    format_timestamp(route.timestamps.get(end_index).copied()),
                ))
            }
        };

        Ok(Toolbar {
            options: device_options(&m.routes),
            selected: match mode {
                ViewMode::NoSelection => None,
                _ => state.selected_device.clone(),
            },
            step_enabled: mode.is_segment(),
            toggle_label: if state.show_total {
                "Show Single Route".to_string()
            } else {
                "Show Total Route".to_string()
            },
            status,
            slider: mode.is_segment().then(|| SliderModel {
                value: state.segment_index,
                max: m.view.max_segment_index(),
            }),
            single_point_count: m.routes.single_point_count,
        })
    }

    /// Selector entries whose label contains `query` (case-insensitive),
    /// in ranking order. An empty query returns every entry.
    pub fn search_devices(&self, query: &str) -> Result<Vec<DeviceOption>> {
        let needle = query.trim().to_lowercase();
        Ok(device_options(&self.mounted()?.routes)
            .into_iter()
            .filter(|o| o.label.to_lowercase().contains(&needle))
            .collect())
    }

    fn mounted(&self) -> Result<&Mounted> {
        self.mounted
            .as_ref()
            .ok_or_not_mounted(self.container.as_str())
    }
}

impl Mounted {
    fn rebuild_scene(&mut self) {
        self.scene = MapScene {
            container: self.scene.container.clone(),
            viewport: self.viewport.clone(),
            layers: build_layers(&self.routes, &self.view, &self.options, &self.measure),
        };
    }
}

/// Whole slider position; the controller clamps it to the route.
/// NaN reads as 0 and infinities saturate.
fn slider_position(value: f64) -> i64 {
    value.trunc() as i64
}

fn device_options(routes: &AggregatedRoutes) -> Vec<DeviceOption> {
    routes
        .ranked()
        .map(|r| DeviceOption {
            key: r.device_id.clone(),
            label: r.label(),
        })
        .collect()
}

/// `d/m/YYYY, HH:MM:SS` in UTC.
fn format_timestamp(timestamp: Option<f64>) -> String {
    let Some(ts) = timestamp.filter(|t| t.is_finite()) else {
        return "-".to_string();
    };
    let secs = ts.floor();
    let nanos = ((ts - secs) * 1e9) as u32;
    match DateTime::from_timestamp(secs as i64, nanos) {
        Some(dt) => dt.format("%-d/%-m/%Y, %H:%M:%S").to_string(),
        None => {
            warn!("[RouteWidget] Timestamp {} out of range", ts);
            "-".to_string()
        }
    }
}

// ============================================================================
// Widget registry
// ============================================================================

/// Widgets by container id, for hosts that address widgets by handle.
pub static WIDGETS: Lazy<Mutex<HashMap<String, RouteWidget>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Create (or keep) the widget for `container`.
pub fn register_widget(container: &str) {
    let mut widgets = WIDGETS.lock().unwrap_or_else(|e| e.into_inner());
    widgets
        .entry(container.to_string())
        .or_insert_with(|| RouteWidget::new(ContainerHandle::from(container)));
}

/// Run `f` against the widget registered for `container`.
pub fn with_widget<F, R>(container: &str, f: F) -> Result<R>
where
    F: FnOnce(&mut RouteWidget) -> Result<R>,
{
    let mut widgets = WIDGETS.lock().unwrap_or_else(|e| e.into_inner());
    let widget = widgets.get_mut(container).ok_or_unknown_widget(container)?;
    f(widget)
}

/// Unmount and forget the widget for `container`.
pub fn remove_widget(container: &str) -> bool {
    let mut widgets = WIDGETS.lock().unwrap_or_else(|e| e.into_inner());
    match widgets.remove(container) {
        Some(mut widget) => {
            widget.on_unmount();
            true
        }
        None => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
