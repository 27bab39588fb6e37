//! Route aggregation: flat sample lists into per-device chronological routes.
//!
//! The host delivers samples newest first. Aggregation walks them oldest
//! first, appends each sample to its device's series and then ranks the
//! devices by trip duration (longest first, ties in encounter order).

use std::cmp::Ordering;
use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{FloorLabel, GpsPoint, PositionSample};

/// Chronological series for one tracked device.
///
/// `coords`, `timestamps`, `uncertainties` and `floors` always have the
/// same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRoute {
    pub device_id: String,
    pub coords: Vec<GpsPoint>,
    /// Unix timestamps (seconds), ascending in arrival order
    pub timestamps: Vec<f64>,
    pub uncertainties: Vec<Option<f64>>,
    pub floors: Vec<Option<FloorLabel>>,
    /// First non-empty vendor name seen for this device
    pub vendor: Option<String>,
}

impl DeviceRoute {
    fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            coords: Vec::new(),
            timestamps: Vec::new(),
            uncertainties: Vec::new(),
            floors: Vec::new(),
            vendor: None,
        }
    }

    fn push(&mut self, sample: &PositionSample) {
        self.coords
            .push(GpsPoint::new(sample.latitude, sample.longitude));
        self.timestamps.push(sample.timestamp);
        self.uncertainties.push(sample.uncertainty_radius);
        self.floors.push(sample.floor_label);
        if self.vendor.is_none() {
            self.vendor = sample
                .vendor_name
                .as_ref()
                .filter(|v| !v.is_empty())
                .cloned();
        }
    }

    /// Number of samples in the route.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Number of segments (consecutive point pairs).
    pub fn segment_count(&self) -> usize {
        self.len().saturating_sub(1)
    }

    /// Seconds between the first and last sample.
    pub fn duration(&self) -> f64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Seconds spent on segment `index`, if it exists.
    pub fn segment_duration(&self, index: usize) -> Option<f64> {
        let start = self.timestamps.get(index)?;
        let end = self.timestamps.get(index + 1)?;
        Some(end - start)
    }

    /// Whether sample `index` was recorded on `other_floor`.
    pub fn is_on_floor(&self, index: usize, other_floor: FloorLabel) -> bool {
        matches!(self.floors.get(index), Some(Some(floor)) if *floor == other_floor)
    }

    /// Floor of the point segment `index` ends at.
    pub fn trailing_floor(&self, index: usize) -> Option<FloorLabel> {
        self.floors.get(index + 1).copied().flatten()
    }

    /// Human-readable selector label: `"{id} - {vendor}"`.
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.device_id,
            self.vendor.as_deref().unwrap_or("undefined")
        )
    }
}

/// Output of [`aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRoutes {
    /// Selectable routes (two or more samples), keyed by device id
    pub routes: HashMap<String, DeviceRoute>,
    /// Device ids by descending trip duration
    pub ranking: Vec<String>,
    /// Devices that produced exactly one valid sample
    pub single_point_count: usize,
    /// Samples dropped for non-finite coordinates or timestamp
    pub skipped_count: usize,
}

impl AggregatedRoutes {
    pub fn get(&self, device_id: &str) -> Option<&DeviceRoute> {
        self.routes.get(device_id)
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.routes.contains_key(device_id)
    }

    /// Routes in ranking order.
    pub fn ranked(&self) -> impl Iterator<Item = &DeviceRoute> {
        self.ranking.iter().filter_map(|id| self.routes.get(id))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Group samples into per-device chronological routes.
///
/// `samples` must be in the host's newest-first order. Pure: the same input
/// always yields the same output.
///
/// # Example
/// ```
/// use route_viewer::{aggregate, PositionSample};
///
/// let samples = vec![
///     PositionSample::new("x", 1.0, 1.0, 105.0),
///     PositionSample::new("x", 0.0, 0.0, 100.0),
/// ];
/// let result = aggregate(&samples);
/// let route = result.get("x").unwrap();
/// assert_eq!(route.coords[0].longitude, 0.0);
/// assert_eq!(route.duration(), 5.0);
/// ```
pub fn aggregate(samples: &[PositionSample]) -> AggregatedRoutes {
    // Encounter order matters for the stable ranking, so keep routes in a Vec
    let mut order: Vec<DeviceRoute> = Vec::new();
    let mut index_by_id: HashMap<&str, usize> = HashMap::new();
    let mut skipped_count = 0;

    for sample in samples.iter().rev() {
        if !sample.is_valid() {
            warn!(
                "[RouteAggregator] Skipping sample for '{}' with non-finite position or timestamp",
                sample.device_id
            );
            skipped_count += 1;
            continue;
        }

        let idx = *index_by_id
            .entry(sample.device_id.as_str())
            .or_insert_with(|| {
                order.push(DeviceRoute::new(&sample.device_id));
                order.len() - 1
            });
        order[idx].push(sample);
    }

    let (mut selectable, single): (Vec<DeviceRoute>, Vec<DeviceRoute>) =
        order.into_iter().partition(|route| route.len() > 1);

    // Vec::sort_by is stable, equal durations keep encounter order
    selectable.sort_by(|a, b| {
        b.duration()
            .partial_cmp(&a.duration())
            .unwrap_or(Ordering::Equal)
    });

    let ranking: Vec<String> = selectable.iter().map(|r| r.device_id.clone()).collect();
    let routes: HashMap<String, DeviceRoute> = selectable
        .into_iter()
        .map(|r| (r.device_id.clone(), r))
        .collect();

    debug!(
        "[RouteAggregator] {} samples -> {} routes, {} single-point devices, {} skipped",
        samples.len(),
        routes.len(),
        single.len(),
        skipped_count
    );

    AggregatedRoutes {
        routes,
        ranking,
        single_point_count: single.len(),
        skipped_count,
    }
}
