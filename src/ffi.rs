//! FFI exports for dashboard hosts.
//!
//! Widgets live in the process-wide registry keyed by container id. Every
//! call locks the registry once, runs one transition and returns JSON.

use log::info;

use crate::error::RouteViewError;
use crate::widget::{register_widget, remove_widget, with_widget, RouteWidget, UiEvent};
use crate::{parse_samples, MapOptions};

type FfiResult = std::result::Result<String, RouteViewError>;

fn scene_json(widget: &RouteWidget) -> FfiResult {
    Ok(serde_json::to_string(widget.scene()?)?)
}

/// Mount a widget into `container_id`. Returns the initial scene as JSON.
#[uniffi::export]
pub fn widget_mount(
    container_id: String,
    options_json: String,
    samples_json: String,
) -> FfiResult {
    crate::init_logging();
    let options = MapOptions::from_json(&options_json)?;
    let samples = parse_samples(&samples_json)?;
    info!(
        "[RouteWidget] FFI mount '{}' ({} samples)",
        container_id,
        samples.len()
    );

    register_widget(&container_id);
    with_widget(&container_id, |w| {
        w.on_mount(options, &samples)?;
        scene_json(w)
    })
}

/// Hand new options and data to a mounted widget. Returns the scene as JSON.
#[uniffi::export]
pub fn widget_update(
    container_id: String,
    options_json: String,
    samples_json: String,
) -> FfiResult {
    let options = MapOptions::from_json(&options_json)?;
    let samples = parse_samples(&samples_json)?;
    with_widget(&container_id, |w| {
        w.update(&options, &samples)?;
        scene_json(w)
    })
}

/// Deliver one UI event, e.g. `{"type": "step", "direction": "next"}`.
/// Returns the scene as JSON.
#[uniffi::export]
pub fn widget_event(container_id: String, event_json: String) -> FfiResult {
    let event: UiEvent = serde_json::from_str(&event_json)?;
    with_widget(&container_id, |w| {
        w.handle_event(event)?;
        scene_json(w)
    })
}

/// Toolbar model as JSON.
#[uniffi::export]
pub fn widget_toolbar_json(container_id: String) -> FfiResult {
    with_widget(&container_id, |w| Ok(serde_json::to_string(&w.toolbar()?)?))
}

/// Selector entries matching `query` as JSON.
#[uniffi::export]
pub fn widget_search_json(container_id: String, query: String) -> FfiResult {
    with_widget(&container_id, |w| {
        Ok(serde_json::to_string(&w.search_devices(&query)?)?)
    })
}

/// Unmount and forget the widget. Returns false if none was registered.
#[uniffi::export]
pub fn widget_unmount(container_id: String) -> bool {
    let removed = remove_widget(&container_id);
    if removed {
        info!("[RouteWidget] FFI unmount '{}'", container_id);
    }
    removed
}
