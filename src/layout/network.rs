use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::ir::{BlockId, ConnectionId, Diagram, Side};

use super::constraints::Offsets;
use super::geometry::{Axis, GridPoint, Orientation, OrientedVector};
use super::routing::{Route, RouteId, Router, SegmentRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NetworkId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BundleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JointId(pub usize);

/// Grouping key of a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum NetworkKey {
    /// Connections sharing a declared group (only when the diagram collapses connections).
    Group(String),
    /// A lone route, keyed by its name.
    Route(String),
}

/// Collinear, mutually touching segments of one network: a single drawing lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    pub id: BundleId,
    pub network: NetworkId,
    pub axis: Axis,
    pub segments: Vec<SegmentRef>,
    min: i32,
    max: i32,
}

impl Bundle {
    pub fn extent(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    pub fn start_point(&self) -> GridPoint {
        self.axis.point(self.min)
    }

    pub fn end_point(&self) -> GridPoint {
        self.axis.point(self.max)
    }

    pub fn covers(&self, p: GridPoint) -> bool {
        self.axis.contains(p) && (self.min..=self.max).contains(&self.axis.along(p))
    }
}

/// Grid point where at most one horizontal and one vertical bundle of a network meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Joint {
    pub id: JointId,
    pub network: NetworkId,
    pub point: GridPoint,
    pub horizontal: Option<BundleId>,
    pub vertical: Option<BundleId>,
    /// Block whose node sits on this point.
    pub node: Option<BlockId>,
}

impl Joint {
    /// Lateral displacement `(dx, dy)` in lanes: columns move with the vertical bundle,
    /// rows with the horizontal one.
    pub fn displacement(&self, offsets: &Offsets) -> (i32, i32) {
        let dx = self.vertical.map(|b| offsets.get(b)).unwrap_or(0);
        let dy = self.horizontal.map(|b| offsets.get(b)).unwrap_or(0);
        (dx, dy)
    }

    /// Drawn position in grid units.
    pub fn position(&self, offsets: &Offsets, lane: f32) -> (f32, f32) {
        let (dx, dy) = self.displacement(offsets);
        (
            self.point.j as f32 + dx as f32 * lane,
            self.point.i as f32 + dy as f32 * lane,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireSegment {
    pub segment: SegmentRef,
    pub bundle: BundleId,
    pub vector: OrientedVector,
    pub start: JointId,
    pub end: JointId,
    pub first: bool,
    pub last: bool,
}

/// A route bound to the joints of its network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wire {
    pub route: RouteId,
    pub connection: ConnectionId,
    pub segments: Vec<WireSegment>,
}

impl Wire {
    /// Side of the source block the wire leaves through.
    pub fn exit_side(&self) -> Side {
        self.segments[0].vector.direction()
    }

    /// Side of the destination block the wire enters through.
    pub fn entry_side(&self) -> Side {
        self.segments[self.segments.len() - 1]
            .vector
            .direction()
            .opposite()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub id: NetworkId,
    pub key: NetworkKey,
    pub routes: Vec<RouteId>,
    pub bundles: Vec<BundleId>,
    pub joints: Vec<JointId>,
    pub wires: Vec<Wire>,
}

/// Arena of every network, bundle and joint of a layout.
#[derive(Debug, Clone, Default)]
pub struct Wiring {
    networks: Vec<Network>,
    bundles: Vec<Bundle>,
    joints: Vec<Joint>,
    segment_bundles: HashMap<SegmentRef, BundleId>,
    route_networks: HashMap<RouteId, NetworkId>,
}

impl Wiring {
    pub fn build(diagram: &Diagram, router: &Router) -> Self {
        let mut wiring = Wiring::default();
        let mut keys: HashMap<NetworkKey, NetworkId> = HashMap::new();
        for route in router.routes() {
            let key = network_key(diagram, route);
            let id = *keys.entry(key.clone()).or_insert_with(|| {
                let id = NetworkId(wiring.networks.len());
                wiring.networks.push(Network {
                    id,
                    key,
                    routes: Vec::new(),
                    bundles: Vec::new(),
                    joints: Vec::new(),
                    wires: Vec::new(),
                });
                id
            });
            wiring.networks[id.0].routes.push(route.id);
            wiring.route_networks.insert(route.id, id);
        }

        for idx in 0..wiring.networks.len() {
            wiring.build_network(NetworkId(idx), router);
        }
        tracing::debug!(
            networks = wiring.networks.len(),
            bundles = wiring.bundles.len(),
            joints = wiring.joints.len(),
            "wiring built"
        );
        wiring
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn network(&self, id: NetworkId) -> &Network {
        &self.networks[id.0]
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub fn bundle(&self, id: BundleId) -> &Bundle {
        &self.bundles[id.0]
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, id: JointId) -> &Joint {
        &self.joints[id.0]
    }

    pub fn bundle_of(&self, segment: SegmentRef) -> Option<BundleId> {
        self.segment_bundles.get(&segment).copied()
    }

    pub fn network_of(&self, route: RouteId) -> Option<NetworkId> {
        self.route_networks.get(&route).copied()
    }

    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.networks.iter().flat_map(|n| n.wires.iter())
    }

    /// Drawn polyline of a wire in grid units, offsets applied.
    pub fn polyline(&self, wire: &Wire, offsets: &Offsets, lane: f32) -> Vec<(f32, f32)> {
        let mut points = Vec::with_capacity(wire.segments.len() + 1);
        for seg in &wire.segments {
            points.push(self.joint(seg.start).position(offsets, lane));
        }
        if let Some(last) = wire.segments.last() {
            points.push(self.joint(last.end).position(offsets, lane));
        }
        points
    }

    fn build_network(&mut self, id: NetworkId, router: &Router) {
        let segments: Vec<SegmentRef> = self.networks[id.0]
            .routes
            .iter()
            .flat_map(|&route| router.route(route).segments.iter().map(|s| s.key()))
            .collect();

        // Interacts: same axis with at least one shared point.
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); segments.len()];
        for a in 0..segments.len() {
            let va = router.segment(segments[a]).vector;
            for b in (a + 1)..segments.len() {
                if va.touches(&router.segment(segments[b]).vector) {
                    adjacency[a].push(b);
                    adjacency[b].push(a);
                }
            }
        }

        let mut component = vec![usize::MAX; segments.len()];
        let mut by_axis: HashMap<Axis, Vec<BundleId>> = HashMap::new();
        for seed in 0..segments.len() {
            if component[seed] != usize::MAX {
                continue;
            }
            let bundle_id = BundleId(self.bundles.len());
            let mut members = Vec::new();
            let mut queue = VecDeque::from([seed]);
            component[seed] = bundle_id.0;
            while let Some(cur) = queue.pop_front() {
                members.push(cur);
                for &next in &adjacency[cur] {
                    if component[next] == usize::MAX {
                        component[next] = bundle_id.0;
                        queue.push_back(next);
                    }
                }
            }
            members.sort_unstable();

            let axis = router.segment(segments[seed]).vector.axis;
            let (mut min, mut max) = (i32::MAX, i32::MIN);
            let mut refs = Vec::with_capacity(members.len());
            for member in members {
                let vector = router.segment(segments[member]).vector;
                debug_assert_eq!(vector.axis, axis);
                min = min.min(vector.min());
                max = max.max(vector.max());
                refs.push(segments[member]);
                self.segment_bundles.insert(segments[member], bundle_id);
            }
            self.bundles.push(Bundle {
                id: bundle_id,
                network: id,
                axis,
                segments: refs,
                min,
                max,
            });
            self.networks[id.0].bundles.push(bundle_id);
            by_axis.entry(axis).or_default().push(bundle_id);
        }

        let mut joints_at: HashMap<GridPoint, JointId> = HashMap::new();
        for &key in &segments {
            let vector = router.segment(key).vector;
            for point in [vector.start_point(), vector.end_point()] {
                if joints_at.contains_key(&point) {
                    continue;
                }
                let joint_id = JointId(self.joints.len());
                let horizontal = self.covering(&by_axis, Orientation::Horizontal, point);
                let vertical = self.covering(&by_axis, Orientation::Vertical, point);
                self.joints.push(Joint {
                    id: joint_id,
                    network: id,
                    point,
                    horizontal,
                    vertical,
                    node: router.grid().node_at(point),
                });
                self.networks[id.0].joints.push(joint_id);
                joints_at.insert(point, joint_id);
            }
        }

        let routes = self.networks[id.0].routes.clone();
        for route_id in routes {
            let wire = self.build_wire(router.route(route_id), &joints_at);
            self.networks[id.0].wires.push(wire);
        }
    }

    fn covering(
        &self,
        by_axis: &HashMap<Axis, Vec<BundleId>>,
        orientation: Orientation,
        point: GridPoint,
    ) -> Option<BundleId> {
        by_axis
            .get(&Axis::through(orientation, point))?
            .iter()
            .copied()
            .find(|&b| self.bundles[b.0].covers(point))
    }

    fn build_wire(&self, route: &Route, joints_at: &HashMap<GridPoint, JointId>) -> Wire {
        let count = route.segments.len();
        let segments = route
            .segments
            .iter()
            .enumerate()
            .map(|(idx, seg)| WireSegment {
                segment: seg.key(),
                bundle: self.segment_bundles[&seg.key()],
                vector: seg.vector,
                start: joints_at[&seg.vector.start_point()],
                end: joints_at[&seg.vector.end_point()],
                first: idx == 0,
                last: idx + 1 == count,
            })
            .collect();
        Wire {
            route: route.id,
            connection: route.connection,
            segments,
        }
    }
}

fn network_key(diagram: &Diagram, route: &Route) -> NetworkKey {
    if diagram.collapse_connections {
        if let Some(group) = diagram.connection(route.connection).group.as_ref() {
            return NetworkKey::Group(group.clone());
        }
    }
    NetworkKey::Route(route.name.clone())
}
