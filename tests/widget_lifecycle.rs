//! Widget lifecycle integration tests.
//!
//! Drives a widget the way a dashboard host does: mount, user events,
//! data/config updates, unmount. Uses synthetic walks so counts and
//! rankings are known up front.
//!
//! Run with: `cargo test --test widget_lifecycle`

use route_viewer::{
    ContainerHandle, Feature, LayerId, MapOptions, PositionSample, RouteViewError, RouteWidget,
    StepDirection, UiEvent,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `devices` walks; walk `k` has `k + 2` points one second apart and
/// alternates floors 0/1. Returned newest first, interleaved across devices.
fn synthetic_walks(devices: usize) -> Vec<PositionSample> {
    let mut samples = Vec::new();
    for k in 0..devices {
        for j in 0..(k + 2) {
            let id = format!("tag-{:02}", k);
            samples.push(
                PositionSample::new(
                    &id,
                    11.667 + j as f64 * 1e-4,
                    48.262 + k as f64 * 1e-4,
                    1_000.0 + j as f64,
                )
                .with_floor((j % 2) as i32)
                .with_uncertainty(1.5),
            );
        }
    }
    samples.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
    samples
}

fn select(widget: &mut RouteWidget, id: &str) {
    widget
        .handle_event(UiEvent::SelectDevice {
            device_id: Some(id.to_string()),
        })
        .expect("select failed");
}

fn line_count(widget: &RouteWidget, id: LayerId) -> usize {
    widget
        .scene()
        .expect("not mounted")
        .vector_layer(id)
        .map(|l| {
            l.features
                .iter()
                .filter(|f| matches!(f, Feature::Line { .. }))
                .count()
        })
        .unwrap_or(0)
}

// ============================================================================
// Test: Full Lifecycle
// ============================================================================

#[test]
fn test_mount_select_step_unmount() {
    init();
    let mut widget = RouteWidget::new(ContainerHandle::from("lifecycle"));
    widget
        .on_mount(MapOptions::default(), &synthetic_walks(10))
        .expect("mount failed");

    // Longest walk ranks first
    let toolbar = widget.toolbar().unwrap();
    assert_eq!(toolbar.options.len(), 10);
    assert_eq!(toolbar.options[0].key, "tag-09");
    assert_eq!(toolbar.options[9].key, "tag-00");

    // Total view: every segment of tag-04 (6 points, 5 segments)
    select(&mut widget, "tag-04");
    assert_eq!(line_count(&widget, LayerId::TotalRoute), 5);
    assert_eq!(line_count(&widget, LayerId::Segment), 0);

    // Segment view: exactly one line
    widget.handle_event(UiEvent::ToggleShowTotal).unwrap();
    assert_eq!(line_count(&widget, LayerId::Segment), 1);
    assert!(widget.scene().unwrap().layer(LayerId::TotalRoute).is_none());

    for _ in 0..10 {
        widget
            .handle_event(UiEvent::Step {
                direction: StepDirection::Next,
            })
            .unwrap();
    }
    assert_eq!(widget.view_state().unwrap().segment_index, 4);

    widget
        .handle_event(UiEvent::SliderCommitted { value: -3.0 })
        .unwrap();
    assert_eq!(widget.view_state().unwrap().segment_index, 0);

    widget.on_unmount();
    assert!(matches!(
        widget.toolbar(),
        Err(RouteViewError::NotMounted { .. })
    ));
}

// ============================================================================
// Test: Host Updates
// ============================================================================

#[test]
fn test_data_replace_and_option_updates() {
    init();
    let mut widget = RouteWidget::new(ContainerHandle::from("updates"));
    let options = MapOptions::default();
    widget.on_mount(options.clone(), &synthetic_walks(3)).unwrap();
    select(&mut widget, "tag-02");

    // Radius toggle only re-derives, the selection stays
    let no_radius = MapOptions {
        show_radius: false,
        ..options.clone()
    };
    widget.update(&no_radius, &synthetic_walks(3)).unwrap();
    assert_eq!(
        widget.view_state().unwrap().selected_device.as_deref(),
        Some("tag-02")
    );
    let layer = widget
        .scene()
        .unwrap()
        .vector_layer(LayerId::TotalRoute)
        .unwrap();
    assert!(layer
        .features
        .iter()
        .all(|f| !matches!(f, Feature::Circle { .. })));

    // Segment view without radius: the line alone, no begin/end circles
    widget.handle_event(UiEvent::ToggleShowTotal).unwrap();
    let layer = widget
        .scene()
        .unwrap()
        .vector_layer(LayerId::Segment)
        .unwrap();
    assert_eq!(layer.features.len(), 1);
    assert!(matches!(layer.features[0], Feature::Line { .. }));

    // New dataset clears the selection
    widget.update(&no_radius, &synthetic_walks(5)).unwrap();
    assert!(widget.view_state().unwrap().selected_device.is_none());
    assert_eq!(widget.toolbar().unwrap().options.len(), 5);
}

#[test]
fn test_empty_dataset() {
    init();
    let mut widget = RouteWidget::new(ContainerHandle::from("empty"));
    widget.on_mount(MapOptions::default(), &[]).unwrap();

    let toolbar = widget.toolbar().unwrap();
    assert!(toolbar.options.is_empty());
    assert_eq!(toolbar.single_point_count, 0);

    // Selecting anything is a no-op
    select(&mut widget, "tag-00");
    assert!(widget.view_state().unwrap().selected_device.is_none());
}

#[test]
#[ignore] // large synthetic dataset
fn test_many_devices() {
    init();
    let mut widget = RouteWidget::new(ContainerHandle::from("many"));
    widget
        .on_mount(MapOptions::default(), &synthetic_walks(500))
        .unwrap();
    assert_eq!(widget.routes().unwrap().ranking.len(), 500);
    select(&mut widget, "tag-499");
    assert_eq!(line_count(&widget, LayerId::TotalRoute), 500);
}
