use std::path::Path;

use wirelay::config::LayoutConfig;
use wirelay::ir::{Diagram, load_diagram};
use wirelay::layout::{
    Bundle, FailureReason, Layout, NetworkKey, Orientation, compute_layout,
};
use wirelay::layout_dump::LayoutDump;

fn fixture(name: &str) -> Diagram {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    load_diagram(&path).unwrap_or_else(|err| panic!("{name}: {err}"))
}

fn layout_of(name: &str) -> (Diagram, Layout) {
    let diagram = fixture(name);
    let layout = compute_layout(&diagram, &LayoutConfig::default())
        .unwrap_or_else(|err| panic!("{name}: {err}"));
    (diagram, layout)
}

const FIXTURES: [&str; 5] = [
    "adjacent.json",
    "t_junction.json",
    "grouped.json",
    "enclosed.json",
    "dense.json5",
];

fn interval(layout: &Layout, bundle: &Bundle, epsilon: f32) -> (f32, f32) {
    let (min, max) = bundle.extent();
    let mut lo = min as f32;
    let mut hi = max as f32;
    if layout.grid().node_at(bundle.start_point()).is_some() {
        lo += epsilon;
    }
    if layout.grid().node_at(bundle.end_point()).is_some() {
        hi -= epsilon;
    }
    (lo, hi)
}

#[test]
fn route_segments_alternate_orientation() {
    for name in FIXTURES {
        let (_, layout) = layout_of(name);
        for route in layout.routes() {
            assert!(!route.segments.is_empty(), "{name}: empty route {}", route.name);
            for pair in route.segments.windows(2) {
                assert_ne!(
                    pair[0].vector.orientation(),
                    pair[1].vector.orientation(),
                    "{name}: route {} repeats an orientation",
                    route.name
                );
                assert_eq!(pair[0].vector.end_point(), pair[1].vector.start_point());
            }
        }
    }
}

#[test]
fn bundles_are_single_axis_and_cover_every_segment() {
    for name in FIXTURES {
        let (_, layout) = layout_of(name);
        let mut covered = 0;
        for bundle in layout.bundles() {
            assert!(!bundle.segments.is_empty(), "{name}: empty bundle");
            for &seg in &bundle.segments {
                assert_eq!(layout.route(seg.route).segments[seg.seq].vector.axis, bundle.axis);
                assert_eq!(layout.bundle_of(seg), Some(bundle.id));
            }
            covered += bundle.segments.len();
        }
        let segments: usize = layout.routes().iter().map(|r| r.segments.len()).sum();
        assert_eq!(covered, segments, "{name}");
    }
}

#[test]
fn overlapping_parallel_bundles_never_share_an_offset() {
    let epsilon = LayoutConfig::default().overlap_epsilon;
    for name in FIXTURES {
        let (_, layout) = layout_of(name);
        let bundles = layout.bundles();
        for (idx, a) in bundles.iter().enumerate() {
            for b in &bundles[idx + 1..] {
                if a.axis != b.axis {
                    continue;
                }
                let (ia, ib) = (interval(&layout, a, epsilon), interval(&layout, b, epsilon));
                if ia.0 <= ib.1 && ib.0 <= ia.1 {
                    assert_ne!(
                        layout.offset(a.id),
                        layout.offset(b.id),
                        "{name}: bundles {:?} and {:?} overlap on one lane",
                        a.id,
                        b.id
                    );
                }
            }
        }
        for structure in layout.bundle_structures() {
            let depth = structure.depth() as i32;
            let offsets: Vec<i32> = structure.layers.iter().map(|l| l.offset).collect();
            assert_eq!(offsets.first().copied(), Some(-((depth - 1) / 2)), "{name}");
            assert!(offsets.windows(2).all(|w| w[1] == w[0] + 1), "{name}");
        }
    }
}

#[test]
fn junction_rules_only_order_parallel_bundles() {
    for name in FIXTURES {
        let (_, layout) = layout_of(name);
        for rule in layout.accepted_rules() {
            assert_eq!(
                layout.bundle(rule.first).axis.orientation,
                layout.bundle(rule.second).axis.orientation,
                "{name}: {rule:?} crosses axes"
            );
            let initial = layout.initial_offsets();
            assert!(initial.get(rule.second) > initial.get(rule.first));
        }
    }
}

#[test]
fn layouts_are_deterministic() {
    for name in FIXTURES {
        let (diagram, first) = layout_of(name);
        let second = compute_layout(&diagram, &LayoutConfig::default()).unwrap();
        let a = serde_json::to_string(&LayoutDump::from_layout(&first, &diagram)).unwrap();
        let b = serde_json::to_string(&LayoutDump::from_layout(&second, &diagram)).unwrap();
        assert_eq!(a, b, "{name}");
    }
}

#[test]
fn adjacent_blocks_get_one_straight_lane() {
    let (_, layout) = layout_of("adjacent.json");
    assert_eq!(layout.routes().len(), 1);
    let route = &layout.routes()[0];
    assert_eq!(route.segments.len(), 1);
    assert_eq!(route.segments[0].vector.orientation(), Orientation::Horizontal);
    assert_eq!(layout.bundles().len(), 1);
    assert_eq!(layout.offset(layout.bundles()[0].id), 0);
    assert!(layout.failures().is_empty());
}

#[test]
fn t_junction_separates_the_turning_wire() {
    let (_, layout) = layout_of("t_junction.json");
    let stats = layout.stats();
    assert_eq!(stats.refine.t_junctions, 1);
    assert_eq!(stats.refine.accepted, 1);

    let straight = &layout.routes()[0];
    let turning = &layout.routes()[1];
    assert_eq!(straight.segments.len(), 1);
    assert_eq!(turning.segments.len(), 2);
    let straight_bundle = layout.bundle_of(straight.segments[0].key()).unwrap();
    let turning_bundle = layout.bundle_of(turning.segments[0].key()).unwrap();
    // stem points down, so the turning wire takes the lower lane
    assert_eq!(layout.offset(straight_bundle), 0);
    assert_eq!(layout.offset(turning_bundle), 1);
    let vertical = layout.bundle_of(turning.segments[1].key()).unwrap();
    assert_eq!(layout.offset(vertical), 0);
}

#[test]
fn grouped_connections_collapse_into_one_network() {
    let (_, layout) = layout_of("grouped.json");
    assert_eq!(layout.networks().len(), 1);
    let network = &layout.networks()[0];
    assert_eq!(network.key, NetworkKey::Group("g".to_string()));
    assert_eq!(network.wires.len(), 2);
    assert_eq!(layout.bundles().len(), 1);
    assert_eq!(layout.bundles()[0].segments.len(), 2);
    assert_eq!(layout.offset(layout.bundles()[0].id), 0);
}

#[test]
fn unreachable_connections_are_dropped_not_fatal() {
    let (_, layout) = layout_of("enclosed.json");
    assert_eq!(layout.routes().len(), 1);
    assert_eq!(layout.routes()[0].name, "free");
    assert_eq!(layout.failures().len(), 1);
    assert_eq!(layout.failures()[0].name, "trapped");
    assert_eq!(layout.failures()[0].reason, FailureReason::NoPath);
    assert_eq!(layout.wire_labels().len(), 1);
    assert_eq!(layout.wire_labels()[0].text, "ok");
}

#[test]
fn dense_diagram_routes_everything_and_places_labels() {
    let (diagram, layout) = layout_of("dense.json5");
    assert!(layout.failures().is_empty());
    assert_eq!(layout.routes().len(), diagram.connections.len());
    for label in layout.wire_labels() {
        assert!(label.length >= LayoutConfig::default().min_label_span);
    }
    for wire in layout.wires() {
        let points = layout.polyline(wire);
        assert_eq!(points.len(), wire.segments.len() + 1);
        for pair in points.windows(2) {
            let axis_aligned = (pair[0].0 - pair[1].0).abs() < 1e-4
                || (pair[0].1 - pair[1].1).abs() < 1e-4;
            assert!(axis_aligned, "wire drawn off-axis: {pair:?}");
        }
    }
}
