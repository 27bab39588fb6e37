//! # Route View Controller
//!
//! State machine deciding what part of the selected route is visible.
//!
//! ```text
//!   NoSelection ──select(d)──▶ TotalRoute(d) ◀──toggle──▶ Segment(d, i)
//!        ▲                                                   │ step / scrub
//!        └──────── dataset replaced / select(none) ──────────┘
//! ```
//!
//! Out-of-range navigation is clamped or ignored, never reported as an
//! error. A selection that no longer exists in the current dataset reads
//! as `NoSelection`.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedRoutes, DeviceRoute};
use crate::FloorLabel;

/// Direction for segment stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDirection {
    Previous,
    Next,
}

/// Which basemap overlay is currently shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorTile {
    #[default]
    Default,
    OtherFloor,
}

/// Raw view state owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub selected_device: Option<String>,
    pub segment_index: usize,
    pub route_length: usize,
    pub show_total: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            selected_device: None,
            segment_index: 0,
            route_length: 0,
            show_total: true,
        }
    }
}

/// View state resolved against the current dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewMode<'a> {
    NoSelection,
    TotalRoute { route: &'a DeviceRoute },
    Segment { route: &'a DeviceRoute, index: usize },
}

impl ViewMode<'_> {
    pub fn is_segment(&self) -> bool {
        matches!(self, ViewMode::Segment { .. })
    }
}

/// The route view state machine.
#[derive(Debug, Clone)]
pub struct ViewController {
    state: ViewState,
    floor_tile: FloorTile,
    other_floor: FloorLabel,
    tile_swapping: bool,
}

impl ViewController {
    /// Create a controller in `NoSelection`.
    ///
    /// `tile_swapping` is false when only one floor tile set is configured.
    pub fn new(other_floor: FloorLabel, tile_swapping: bool) -> Self {
        Self {
            state: ViewState::default(),
            floor_tile: FloorTile::Default,
            other_floor,
            tile_swapping,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn floor_tile(&self) -> FloorTile {
        self.floor_tile
    }

    /// Resolve the raw state against `routes`.
    pub fn mode<'a>(&self, routes: &'a AggregatedRoutes) -> ViewMode<'a> {
        let Some(route) = self
            .state
            .selected_device
            .as_deref()
            .and_then(|id| routes.get(id))
        else {
            return ViewMode::NoSelection;
        };

        if self.state.show_total {
            ViewMode::TotalRoute { route }
        } else {
            ViewMode::Segment {
                route,
                index: self.state.segment_index,
            }
        }
    }

    /// Highest valid segment index for the selected route.
    pub fn max_segment_index(&self) -> usize {
        self.state.route_length.saturating_sub(2)
    }

    /// Update the floor pivot and whether both tile sets are available.
    pub fn set_floor_rule(&mut self, other_floor: FloorLabel, tile_swapping: bool) {
        self.other_floor = other_floor;
        self.tile_swapping = tile_swapping;
        if !tile_swapping {
            self.floor_tile = FloorTile::Default;
        }
    }

    /// Re-evaluate the floor tile for the visible segment.
    pub fn refresh_floor_tile(&mut self, routes: &AggregatedRoutes) {
        if let Some(route) = self.segment_route(routes) {
            self.sync_floor_tile(route);
        }
    }

    /// Show the default tile set again (the default tile URL changed).
    pub fn reset_floor_tile(&mut self) {
        self.floor_tile = FloorTile::Default;
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Select a device, or clear the selection with `None`.
    ///
    /// Unknown devices clear the selection.
    pub fn select_device(&mut self, device_id: Option<&str>, routes: &AggregatedRoutes) {
        match device_id.and_then(|id| routes.get(id)) {
            Some(route) => {
                info!(
                    "[RouteView] Selected '{}' ({} points)",
                    route.device_id,
                    route.len()
                );
                self.state = ViewState {
                    selected_device: Some(route.device_id.clone()),
                    segment_index: 0,
                    route_length: route.len(),
                    show_total: true,
                };
            }
            None => {
                if let Some(id) = device_id {
                    debug!("[RouteView] '{}' is not selectable, clearing selection", id);
                }
                self.state = ViewState::default();
            }
        }
    }

    /// Flip between the whole route and the current segment.
    pub fn toggle_show_total(&mut self, routes: &AggregatedRoutes) {
        let Some(route) = self.selected_route(routes) else {
            return;
        };

        self.state.show_total = !self.state.show_total;
        if !self.state.show_total {
            self.state.segment_index = self.state.segment_index.min(self.max_segment_index());
            self.sync_floor_tile(route);
        }
        debug!(
            "[RouteView] show_total={} at segment {}",
            self.state.show_total, self.state.segment_index
        );
    }

    /// Move one segment back or forward. Returns whether the index changed.
    pub fn step(&mut self, direction: StepDirection, routes: &AggregatedRoutes) -> bool {
        let Some(route) = self.segment_route(routes) else {
            return false;
        };

        let index = self.state.segment_index;
        let next = match direction {
            StepDirection::Previous if index > 0 => index - 1,
            StepDirection::Next if index < self.max_segment_index() => index + 1,
            _ => return false,
        };

        self.state.segment_index = next;
        self.sync_floor_tile(route);
        true
    }

    /// Jump to a segment from the slider, clamped to the route.
    pub fn scrub(&mut self, value: i64, routes: &AggregatedRoutes) -> bool {
        let Some(route) = self.segment_route(routes) else {
            return false;
        };

        let max = self.max_segment_index();
        let index = usize::try_from(value.max(0)).unwrap_or(usize::MAX).min(max);
        let changed = index != self.state.segment_index;
        self.state.segment_index = index;
        self.sync_floor_tile(route);
        changed
    }

    /// The underlying dataset was replaced; drop the selection.
    pub fn dataset_replaced(&mut self) {
        self.state = ViewState::default();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn selected_route<'a>(&self, routes: &'a AggregatedRoutes) -> Option<&'a DeviceRoute> {
        self.state
            .selected_device
            .as_deref()
            .and_then(|id| routes.get(id))
    }

    fn segment_route<'a>(&self, routes: &'a AggregatedRoutes) -> Option<&'a DeviceRoute> {
        if self.state.show_total {
            return None;
        }
        self.selected_route(routes)
    }

    /// Swap the floor tile when the visible segment ends on the other tile's floor.
    fn sync_floor_tile(&mut self, route: &DeviceRoute) -> bool {
        if !self.tile_swapping {
            return false;
        }
        let target = if route.trailing_floor(self.state.segment_index) == Some(self.other_floor) {
            FloorTile::OtherFloor
        } else {
            FloorTile::Default
        };
        if target == self.floor_tile {
            return false;
        }
        info!(
            "[RouteView] Floor tile {:?} -> {:?} at segment {}",
            self.floor_tile, target, self.state.segment_index
        );
        self.floor_tile = target;
        true
    }
}
