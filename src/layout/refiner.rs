use std::collections::HashMap;

use serde::Serialize;

use super::constraints::{ConstraintSystem, Offsets};
use super::geometry::GridPoint;
use super::junction::{self, BundleRule, Junction, JunctionKind, Passthrough};
use super::network::Wiring;
use super::routing::{Route, Router};
use super::structure::{self, BundleStructure};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefineStats {
    /// Ordered passthrough pairs of different routes that were classified.
    pub interactions: usize,
    pub t_junctions: usize,
    pub v_junctions: usize,
    pub s_junctions: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Assigns every bundle its lane offset: junction rules first, then dense per-axis stacking.
#[derive(Debug, Clone)]
pub struct Refiner {
    initial: Offsets,
    offsets: Offsets,
    structures: Vec<BundleStructure>,
    rules: Vec<BundleRule>,
    stats: RefineStats,
}

impl Refiner {
    pub fn new(router: &Router, wiring: &Wiring, overlap_epsilon: f32) -> Self {
        let mut stats = RefineStats::default();
        let points = collect_passthroughs(router, wiring);
        let (system, rules) = order_junctions(points, wiring.bundles().len(), &mut stats);
        let initial = system.solve();
        let (structures, offsets) =
            structure::stack_bundles(wiring.bundles(), router.grid(), &initial, overlap_epsilon);
        tracing::debug!(
            interactions = stats.interactions,
            accepted = stats.accepted,
            rejected = stats.rejected,
            structures = structures.len(),
            "refined bundle offsets"
        );
        Self {
            initial,
            offsets,
            structures,
            rules,
            stats,
        }
    }

    /// Offsets after the junction rules, before stacking.
    pub fn initial_offsets(&self) -> &Offsets {
        &self.initial
    }

    pub fn offsets(&self) -> &Offsets {
        &self.offsets
    }

    pub fn structures(&self) -> &[BundleStructure] {
        &self.structures
    }

    /// Junction rules admitted by pass 1, in admission order.
    pub fn accepted_rules(&self) -> &[BundleRule] {
        &self.rules
    }

    pub fn stats(&self) -> RefineStats {
        self.stats
    }
}

/// Admits the rules of every interaction, sparsest points first.
fn order_junctions(
    mut points: Vec<(GridPoint, Vec<Passthrough>)>,
    bundles: usize,
    stats: &mut RefineStats,
) -> (ConstraintSystem, Vec<BundleRule>) {
    let mut system = ConstraintSystem::new(bundles);
    let mut rules = Vec::new();
    points.retain(|(_, group)| group.len() >= 2);
    // busiest points last
    points.sort_by_key(|(_, group)| group.len());

    for (point, group) in &points {
        for (x, a) in group.iter().enumerate() {
            for (y, b) in group.iter().enumerate() {
                if x == y || a.route == b.route {
                    continue;
                }
                stats.interactions += 1;
                let Some(junction) = junction::classify(a, b) else {
                    continue;
                };
                match junction.kind() {
                    JunctionKind::T => stats.t_junctions += 1,
                    JunctionKind::V => stats.v_junctions += 1,
                    JunctionKind::S => stats.s_junctions += 1,
                }
                apply(&mut system, &junction, *point, stats, &mut rules);
            }
        }
    }
    (system, rules)
}

fn apply(
    system: &mut ConstraintSystem,
    junction: &Junction,
    point: GridPoint,
    stats: &mut RefineStats,
    accepted: &mut Vec<BundleRule>,
) {
    let rules = junction.attempted();
    if junction.is_atomic() {
        match system.add_all(rules) {
            Ok(()) => {
                stats.accepted += rules.len();
                accepted.extend_from_slice(rules);
            }
            Err(err) => {
                stats.rejected += rules.len();
                tracing::debug!(?point, kind = ?junction.kind(), %err, "rule pair rejected");
            }
        }
        return;
    }
    for rule in rules {
        match system.add(rule) {
            Ok(()) => {
                stats.accepted += 1;
                accepted.push(*rule);
            }
            Err(err) => {
                stats.rejected += 1;
                tracing::debug!(?point, kind = ?rule.kind, %err, "rule rejected");
            }
        }
    }
}

/// Passthroughs grouped by point, points in first-visit order.
fn collect_passthroughs(router: &Router, wiring: &Wiring) -> Vec<(GridPoint, Vec<Passthrough>)> {
    let mut groups: Vec<(GridPoint, Vec<Passthrough>)> = Vec::new();
    let mut index: HashMap<GridPoint, usize> = HashMap::new();
    for route in router.routes() {
        for pass in route_passthroughs(route, wiring) {
            let slot = *index.entry(pass.point).or_insert_with(|| {
                groups.push((pass.point, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(pass);
        }
    }
    groups
}

fn route_passthroughs(route: &Route, wiring: &Wiring) -> Vec<Passthrough> {
    let Some(network) = wiring.network_of(route.id) else {
        return Vec::new();
    };
    let mut passes = Vec::new();
    let mut incoming = None;
    for seg in &route.segments {
        let Some(bundle) = wiring.bundle_of(seg.key()) else {
            continue;
        };
        let dir = seg.vector.direction();
        let len = seg.vector.len() as usize;
        for (step, point) in seg.vector.points().enumerate().take(len) {
            let mut pass = Passthrough::new(route.id, network, point);
            if step == 0 {
                if let Some((side, prev)) = incoming {
                    pass.set(side, prev);
                }
            } else {
                pass.set(dir.opposite(), bundle);
            }
            pass.set(dir, bundle);
            passes.push(pass);
        }
        incoming = Some((dir.opposite(), bundle));
    }
    if let (Some((side, bundle)), Some(last)) = (incoming, route.segments.last()) {
        let mut pass = Passthrough::new(route.id, network, last.vector.end_point());
        pass.set(side, bundle);
        passes.push(pass);
    }
    passes
}
