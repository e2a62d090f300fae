use std::cell::RefCell;
use std::rc::Rc;

use formats::{FeatureCollection, Properties, features_from_geojson_str};
use foundation::math::Vec3;
use foundation::time::Time;
use geomap::{
    EngineConfig, EngineError, ErrorPolicy, GeoMap, GeoMapOptions, HoverChange, Renderers, Surface,
};
use gpu::{HeadlessLog, HeadlessRenderer, RenderLayer};
use layers::{AREA_LIST_NAME, POINT_LIST_NAME};
use pretty_assertions::assert_eq;
use runtime::{FrameScheduler, FrameToken, LoopError, TickOutcome};
use scene::components::{GroupKind, OverlayLayer};

const TWO_SQUARES: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"name":"West","adcode":1},
     "geometry":{"type":"Polygon","coordinates":[[[119.8,29.9],[120.0,29.9],[120.0,30.1],[119.8,30.1],[119.8,29.9]]]}},
    {"type":"Feature","properties":{"name":"East","adcode":2},
     "geometry":{"type":"Polygon","coordinates":[[[120.0,29.9],[120.2,29.9],[120.2,30.1],[120.0,30.1],[120.0,29.9]]]}}
]}"#;

const ONE_SQUARE: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"name":"Only"},
     "geometry":{"type":"Polygon","coordinates":[[[119.9,29.9],[120.1,29.9],[120.1,30.1],[119.9,30.1],[119.9,29.9]]]}}
]}"#;

const WITH_SLIVER: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"name":"Good"},
     "geometry":{"type":"Polygon","coordinates":[[[119.9,29.9],[120.1,29.9],[120.1,30.1],[119.9,30.1],[119.9,29.9]]]}},
    {"type":"Feature","properties":{"name":"Sliver"},
     "geometry":{"type":"Polygon","coordinates":[[[120.0,30.0],[120.1,30.0],[120.0,30.0]]]}}
]}"#;

const WITH_MALFORMED: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","properties":{"name":"Good"},
     "geometry":{"type":"Polygon","coordinates":[[[119.9,29.9],[120.1,29.9],[120.1,30.1],[119.9,30.1],[119.9,29.9]]]}},
    {"type":"Feature","properties":{"name":"Unlocated"},"geometry":null},
    {"type":"Feature","properties":{"name":"Typo"},
     "geometry":{"type":"Polygon","coordinates":[[[120.0,30.0],[120.1,"30.0"],[120.1,30.1],[120.0,30.0]]]}}
]}"#;

fn one_region_with(extra: &str) -> String {
    format!(
        r#"{{"type":"FeatureCollection","features":[
            {{"type":"Feature","properties":{{"name":"Good"}},
              "geometry":{{"type":"Polygon","coordinates":[[[119.9,29.9],[120.1,29.9],[120.1,30.1],[119.9,30.1],[119.9,29.9]]]}}}},
            {extra}
        ]}}"#
    )
}

fn strict() -> EngineConfig {
    EngineConfig {
        error_policy: ErrorPolicy::Strict,
        ..EngineConfig::default()
    }
}

#[derive(Default)]
struct SchedulerLog {
    requested: usize,
    cancelled: Vec<FrameToken>,
}

struct FakeScheduler(Rc<RefCell<SchedulerLog>>);

impl FrameScheduler for FakeScheduler {
    fn request_frame(&mut self) -> Result<FrameToken, LoopError> {
        let mut log = self.0.borrow_mut();
        log.requested += 1;
        Ok(FrameToken(log.requested as i32))
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.0.borrow_mut().cancelled.push(token);
    }
}

struct Harness {
    map: GeoMap,
    clicks: Rc<RefCell<Vec<Properties>>>,
    logs: [Rc<RefCell<HeadlessLog>>; 3],
    scheduler: Rc<RefCell<SchedulerLog>>,
}

fn harness(geojson: &str, config: EngineConfig) -> Result<Harness, EngineError> {
    let clicks = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&clicks);
    let mut map = GeoMap::new(GeoMapOptions {
        geojson: FeatureCollection::from_geojson_str(geojson)?,
        config,
        on_click: Box::new(move |props: &Properties| sink.borrow_mut().push(props.clone())),
    });

    let (scene, scene_log) = HeadlessRenderer::new(RenderLayer::Scene);
    let (labels, labels_log) = HeadlessRenderer::new(RenderLayer::Overlay(OverlayLayer::Labels));
    let (sprites, sprites_log) = HeadlessRenderer::new(RenderLayer::Overlay(OverlayLayer::Sprites));
    let scheduler = Rc::new(RefCell::new(SchedulerLog::default()));

    map.init(
        Surface {
            width: 800.0,
            height: 600.0,
            pixel_ratio: 1.0,
        },
        Renderers {
            scene: Box::new(scene),
            labels: Box::new(labels),
            sprites: Box::new(sprites),
        },
        Box::new(FakeScheduler(Rc::clone(&scheduler))),
    )?;

    Ok(Harness {
        map,
        clicks,
        logs: [scene_log, labels_log, sprites_log],
        scheduler,
    })
}

fn region_groups(map: &GeoMap) -> Vec<scene::NodeId> {
    let state = map.state().expect("running");
    let list = state.area_list.expect("area list");
    state.graph.children(list).to_vec()
}

fn group_z(map: &GeoMap, group: scene::NodeId) -> f64 {
    map.state()
        .expect("running")
        .graph
        .node(group)
        .expect("group")
        .transform
        .position
        .z
}

/// Screen position of the top face center of the region named `name`.
fn pointer_over(map: &GeoMap, name: &str) -> (f64, f64) {
    let feature = map
        .projected()
        .features
        .iter()
        .find(|f| f.name().as_deref() == Some(name))
        .expect("feature");
    let state = map.state().expect("running");
    let top = Vec3::new(feature.center.x, feature.center.y, 0.1);
    let ndc = state.camera.project(top).expect("camera").expect("in view");
    let screen = state.renderers.viewport().from_ndc(ndc.xy());
    (screen.x, screen.y)
}

fn settle(map: &mut GeoMap, start_ms: f64) {
    map.frame(Time::from_millis(start_ms)).expect("frame");
    map.frame(Time::from_millis(start_ms + 150.0)).expect("frame");
}

#[test]
fn map_center_projects_to_origin() {
    let h = harness(TWO_SQUARES, EngineConfig::default()).expect("harness");
    let projection = &h.map.projected().projection;
    assert_eq!(h.map.projected().map_center(), [120.0, 30.0]);
    let origin = projection.project(h.map.projected().map_center()).expect("project");
    assert!(origin.distance(Vec3::ZERO) < 1e-9);
}

#[test]
fn single_polygon_yields_one_group_and_one_target() {
    let h = harness(ONE_SQUARE, EngineConfig::default()).expect("harness");
    let state = h.map.state().expect("running");
    let root = state.graph.root();
    let list = state
        .graph
        .find_child_by_name(root, AREA_LIST_NAME)
        .expect("area list");
    assert_eq!(Some(list), state.area_list);

    let groups = region_groups(&h.map);
    assert_eq!(groups.len(), 1);
    assert_eq!(state.hit_targets.len(), 1);
    assert_eq!(state.graph.parent(state.hit_targets[0]), Some(groups[0]));
    let tag = state.graph.node(groups[0]).and_then(|n| n.tag.clone()).expect("tag");
    assert_eq!(tag.kind, GroupKind::RegionBlock);
    assert_eq!(tag.name, "Only");
}

#[test]
fn hover_moves_elevation_from_one_region_to_the_next() {
    let mut h = harness(TWO_SQUARES, EngineConfig::default()).expect("harness");
    let groups = region_groups(&h.map);
    let (west, east) = (groups[0], groups[1]);

    let (x, y) = pointer_over(&h.map, "West");
    assert_eq!(
        h.map.on_pointer_move(x, y).expect("move"),
        HoverChange::Moved {
            from: None,
            to: west
        }
    );
    settle(&mut h.map, 0.0);
    assert_eq!(group_z(&h.map, west), 0.1);
    assert_eq!(group_z(&h.map, east), 0.0);

    // Same region again: nothing restarts.
    let (x, y) = pointer_over(&h.map, "West");
    assert_eq!(h.map.on_pointer_move(x, y).expect("move"), HoverChange::Unchanged);

    let (x, y) = pointer_over(&h.map, "East");
    assert_eq!(
        h.map.on_pointer_move(x, y).expect("move"),
        HoverChange::Moved {
            from: Some(west),
            to: east
        }
    );
    settle(&mut h.map, 1000.0);
    assert_eq!(group_z(&h.map, west), 0.0);
    assert_eq!(group_z(&h.map, east), 0.1);

    let state = h.map.state().expect("running");
    assert_eq!(state.hover.elevated(), Some(east));
    let raised = groups.iter().filter(|g| group_z(&h.map, **g) > 0.0).count();
    assert_eq!(raised, 1);
}

#[test]
fn pointer_over_empty_ground_changes_nothing() {
    let mut h = harness(TWO_SQUARES, EngineConfig::default()).expect("harness");
    assert_eq!(h.map.on_pointer_move(1.0, 1.0).expect("move"), HoverChange::Unchanged);
    assert_eq!(h.map.state().expect("running").hover.elevated(), None);
}

#[test]
fn preempted_hover_settles_on_the_newest_target() {
    let mut h = harness(TWO_SQUARES, EngineConfig::default()).expect("harness");
    let groups = region_groups(&h.map);
    let (west, east) = (groups[0], groups[1]);

    let (wx, wy) = pointer_over(&h.map, "West");
    let (ex, ey) = pointer_over(&h.map, "East");
    h.map.on_pointer_move(wx, wy).expect("move");
    h.map.frame(Time::from_millis(0.0)).expect("frame");
    h.map.frame(Time::from_millis(50.0)).expect("frame");
    h.map.on_pointer_move(ex, ey).expect("move");
    h.map.on_pointer_move(wx, wy).expect("move");
    settle(&mut h.map, 100.0);

    assert_eq!(group_z(&h.map, west), 0.1);
    assert_eq!(group_z(&h.map, east), 0.0);
}

#[test]
fn replacing_markers_keeps_only_the_latest_set() {
    let mut h = harness(TWO_SQUARES, EngineConfig::default()).expect("harness");
    let live_before = {
        let state = h.map.state().expect("running");
        (state.resources.live_geometries(), state.resources.live_materials())
    };

    let first = features_from_geojson_str(
        r#"[{"type":"Feature","properties":{"name":"A"},"geometry":{"type":"Point","coordinates":[119.9,30.0]}},
            {"type":"Feature","properties":{"name":"B"},"geometry":{"type":"Point","coordinates":[120.1,30.0]}}]"#,
    )
    .expect("points");
    let second = features_from_geojson_str(
        r#"[{"type":"Feature","properties":{"name":"C"},"geometry":{"type":"Point","coordinates":[120.0,30.0]}}]"#,
    )
    .expect("points");

    let r1 = h.map.add_point_list("pin.png", &first).expect("first");
    assert_eq!(r1.added, 2);
    assert_eq!(r1.disposed, None);
    let first_container = h.map.state().and_then(|s| s.markers.as_ref()).expect("set").container;

    let r2 = h.map.add_point_list("pin.png", &second).expect("second");
    assert_eq!(r2.added, 1);
    let disposed = r2.disposed.expect("previous set disposed");
    assert_eq!(disposed.nodes_removed, 2);
    assert!(disposed.is_clean());

    let state = h.map.state().expect("running");
    assert!(!state.graph.contains(first_container));
    let root = state.graph.root();
    let marker_lists: Vec<_> = state
        .graph
        .children(root)
        .iter()
        .filter(|c| state.graph.node(**c).is_some_and(|n| n.name == POINT_LIST_NAME))
        .collect();
    assert_eq!(marker_lists.len(), 1);
    let set = state.markers.as_ref().expect("set");
    assert_eq!(set.len(), 1);
    assert_eq!(state.graph.children(set.container).len(), 1);
    assert_eq!(
        (state.resources.live_geometries(), state.resources.live_materials()),
        live_before
    );
}

#[test]
fn resize_updates_camera_and_every_renderer() {
    let mut h = harness(ONE_SQUARE, EngineConfig::default()).expect("harness");
    h.map.on_resize(1200.0, 400.0).expect("resize");

    let state = h.map.state().expect("running");
    assert_eq!(state.camera.aspect, 3.0);
    for log in &h.logs {
        let log = log.borrow();
        assert_eq!(log.resizes, 2);
        assert_eq!(log.size.map(|s| (s.width, s.height)), Some((1200.0, 400.0)));
    }

    assert!(matches!(
        h.map.on_resize(0.0, 400.0),
        Err(EngineError::Render(gpu::RenderError::InvalidViewport { .. }))
    ));
}

#[test]
fn marker_click_reports_properties_once() {
    let mut h = harness(ONE_SQUARE, EngineConfig::default()).expect("harness");
    let points = features_from_geojson_str(
        r#"[{"type":"Feature","properties":{"name":"Depot","id":7},"geometry":{"type":"Point","coordinates":[120.0,30.0]}}]"#,
    )
    .expect("points");
    h.map.add_point_list("pin.png", &points).expect("markers");
    let marker = h
        .map
        .state()
        .and_then(|s| s.markers.as_ref())
        .and_then(|set| set.ids().next())
        .expect("marker id");

    h.map.click_marker(marker).expect("click");
    let clicks = h.clicks.borrow();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0], points[0].properties);
}

#[test]
fn stale_marker_clicks_are_rejected() {
    let mut h = harness(ONE_SQUARE, EngineConfig::default()).expect("harness");
    let points = features_from_geojson_str(
        r#"[{"type":"Feature","properties":{"name":"Depot"},"geometry":{"type":"Point","coordinates":[120.0,30.0]}}]"#,
    )
    .expect("points");
    h.map.add_point_list("pin.png", &points).expect("first");
    let old = h
        .map
        .state()
        .and_then(|s| s.markers.as_ref())
        .and_then(|set| set.ids().next())
        .expect("marker id");
    h.map.add_point_list("pin.png", &points).expect("second");

    assert_eq!(h.map.click_marker(old), Err(EngineError::UnknownMarker(old)));
    assert!(h.clicks.borrow().is_empty());
}

#[test]
fn frames_render_all_layers_until_teardown() {
    let mut h = harness(ONE_SQUARE, EngineConfig::default()).expect("harness");
    assert_eq!(h.map.frame(Time::from_millis(16.0)).expect("frame"), TickOutcome::Rendered);
    for log in &h.logs {
        assert_eq!(log.borrow().frames, 1);
    }
    // Body caps, body sides, two outlines, ground.
    assert_eq!(h.logs[0].borrow().last_item_count, 5);

    let pending = h.scheduler.borrow().requested;
    h.map.teardown();
    assert!(!h.map.is_running());
    assert_eq!(h.scheduler.borrow().cancelled, vec![FrameToken(pending as i32)]);
    assert_eq!(h.map.frame(Time::from_millis(32.0)).expect("frame"), TickOutcome::Stopped);
    assert_eq!(h.logs[0].borrow().frames, 1);
    assert_eq!(h.map.on_pointer_move(0.0, 0.0), Err(EngineError::TornDown));
}

#[test]
fn init_twice_is_rejected() {
    let mut h = harness(ONE_SQUARE, EngineConfig::default()).expect("harness");
    let (scene, _) = HeadlessRenderer::new(RenderLayer::Scene);
    let (labels, _) = HeadlessRenderer::new(RenderLayer::Overlay(OverlayLayer::Labels));
    let (sprites, _) = HeadlessRenderer::new(RenderLayer::Overlay(OverlayLayer::Sprites));
    let again = h.map.init(
        Surface {
            width: 10.0,
            height: 10.0,
            pixel_ratio: 1.0,
        },
        Renderers {
            scene: Box::new(scene),
            labels: Box::new(labels),
            sprites: Box::new(sprites),
        },
        Box::new(FakeScheduler(Rc::clone(&h.scheduler))),
    );
    assert_eq!(again, Err(EngineError::AlreadyInitialized));
}

#[test]
fn bad_regions_are_skipped_or_fatal_depending_on_policy() {
    let h = harness(WITH_SLIVER, EngineConfig::default()).expect("lenient");
    assert_eq!(region_groups(&h.map).len(), 1);
    assert_eq!(h.map.state().expect("running").hit_targets.len(), 1);

    assert!(matches!(
        harness(WITH_SLIVER, strict()).err(),
        Some(EngineError::Mesh(layers::MeshError::DegenerateRing { .. }))
    ));
}

#[test]
fn strict_marker_failure_keeps_previous_markers() {
    let mut h = harness(ONE_SQUARE, strict()).expect("harness");
    let good = features_from_geojson_str(
        r#"[{"type":"Feature","properties":{"name":"A"},"geometry":{"type":"Point","coordinates":[120.0,30.0]}}]"#,
    )
    .expect("points");
    let bad = features_from_geojson_str(
        r#"[{"type":"Feature","properties":{"name":"B"},"geometry":{"type":"Point","coordinates":[120.0,30.0]}},
            {"type":"Feature","properties":{"name":"Road"},"geometry":{"type":"LineString","coordinates":[[120,30],[121,30]]}}]"#,
    )
    .expect("points");

    h.map.add_point_list("pin.png", &good).expect("good");
    let before = h.map.state().and_then(|s| s.markers.clone()).expect("set");
    assert!(h.map.add_point_list("pin.png", &bad).is_err());

    let state = h.map.state().expect("running");
    assert_eq!(state.markers.as_ref(), Some(&before));
    assert!(state.graph.is_attached(before.container));
    let root = state.graph.root();
    let lists = state
        .graph
        .children(root)
        .iter()
        .filter(|c| state.graph.node(**c).is_some_and(|n| n.name == POINT_LIST_NAME))
        .count();
    assert_eq!(lists, 1);
}

#[test]
fn malformed_features_do_not_abort_the_scene() {
    let mut h = harness(WITH_MALFORMED, EngineConfig::default()).expect("lenient");
    assert_eq!(h.map.projected().map_center(), [120.0, 30.0]);
    let groups = region_groups(&h.map);
    assert_eq!(groups.len(), 1);
    let state = h.map.state().expect("running");
    assert_eq!(state.graph.node(groups[0]).expect("group").name, "Good");
    assert_eq!(state.hit_targets.len(), 1);

    assert_eq!(h.map.frame(Time::from_millis(16.0)).expect("frame"), TickOutcome::Rendered);
    assert_eq!(h.logs[0].borrow().last_item_count, 5);
}

#[test]
fn strict_policy_fails_on_null_or_malformed_geometry() {
    let unlocated = one_region_with(r#"{"type":"Feature","properties":{"name":"Unlocated"},"geometry":null}"#);
    assert_eq!(
        harness(&unlocated, strict()).err(),
        Some(EngineError::Mesh(layers::MeshError::NoPolygons {
            feature: "Unlocated".to_string()
        }))
    );

    let typo = one_region_with(
        r#"{"type":"Feature","properties":{"name":"Typo"},"geometry":{"type":"Polygon","coordinates":[[[120,"30"]]]}}"#,
    );
    assert_eq!(
        harness(&typo, strict()).err(),
        Some(EngineError::Mesh(layers::MeshError::Malformed {
            feature: "Typo".to_string(),
            reason: "lat must be a number".to_string()
        }))
    );

    let collection = one_region_with(
        r#"{"type":"Feature","properties":{"name":"Bundle"},"geometry":{"type":"GeometryCollection","geometries":[]}}"#,
    );
    assert!(harness(&collection, EngineConfig::default()).is_ok());
    assert!(matches!(
        harness(&collection, strict()).err(),
        Some(EngineError::Mesh(layers::MeshError::Malformed { .. }))
    ));
}

#[test]
fn empty_dataset_still_runs_the_scene() {
    let mut h = harness(r#"{"features":[]}"#, EngineConfig::default()).expect("empty");
    assert_eq!(h.map.projected().map_center(), formats::FALLBACK_CENTER);
    assert!(region_groups(&h.map).is_empty());
    assert!(h.map.state().expect("running").hit_targets.is_empty());

    assert_eq!(h.map.frame(Time::from_millis(16.0)).expect("frame"), TickOutcome::Rendered);
    // Ground only.
    assert_eq!(h.logs[0].borrow().last_item_count, 1);
    assert_eq!(h.map.on_pointer_move(400.0, 300.0), Ok(HoverChange::Unchanged));

    let points = features_from_geojson_str(
        r#"[{"type":"Feature","properties":{"name":"Depot"},"geometry":{"type":"Point","coordinates":[0.0,0.0]}}]"#,
    )
    .expect("points");
    let report = h.map.add_point_list("pin.png", &points).expect("markers");
    assert_eq!(report.added, 1);
}

#[test]
fn malformed_markers_are_skipped_one_by_one() {
    let mut h = harness(ONE_SQUARE, EngineConfig::default()).expect("harness");
    let points = features_from_geojson_str(
        r#"[{"type":"Feature","properties":{"name":"Depot"},"geometry":{"type":"Point","coordinates":[120.0,30.0]}},
            {"type":"Feature","properties":{"name":"Unlocated"},"geometry":null},
            {"type":"Feature","properties":{"name":"Typo"},"geometry":{"type":"Point","coordinates":["120",30]}}]"#,
    )
    .expect("points");
    let report = h.map.add_point_list("pin.png", &points).expect("lenient");
    assert_eq!((report.added, report.skipped), (1, 2));
    let set = h.map.state().and_then(|s| s.markers.as_ref()).expect("set");
    assert_eq!(set.len(), 1);

    let mut h = harness(ONE_SQUARE, strict()).expect("harness");
    assert_eq!(
        h.map.add_point_list("pin.png", &points[..1]).map(|r| r.added),
        Ok(1)
    );
    assert_eq!(
        h.map.add_point_list("pin.png", &points[2..]).err(),
        Some(EngineError::Marker(layers::MarkerError::Malformed(
            "lon must be a number".to_string()
        )))
    );
}
