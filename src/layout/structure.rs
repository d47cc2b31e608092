use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use super::constraints::Offsets;
use super::geometry::Axis;
use super::grid::Grid;
use super::network::{Bundle, BundleId};

/// Bundles sharing one final offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleLayer {
    pub offset: i32,
    pub bundles: Vec<BundleId>,
}

/// Parallel bundles of one axis that overlap, directly or through each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleStructure {
    pub axis: Axis,
    pub bundles: Vec<BundleId>,
    /// Ascending by offset.
    pub layers: Vec<BundleLayer>,
}

impl BundleStructure {
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

/// Span of a bundle along its axis, pulled in where it ends on a block node.
fn interval(bundle: &Bundle, grid: &Grid, epsilon: f32) -> (f32, f32) {
    let (min, max) = bundle.extent();
    let mut lo = min as f32;
    let mut hi = max as f32;
    if grid.node_at(bundle.start_point()).is_some() {
        lo += epsilon;
    }
    if grid.node_at(bundle.end_point()).is_some() {
        hi -= epsilon;
    }
    (lo, hi)
}

fn overlaps(a: (f32, f32), b: (f32, f32)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Splits bundles into per-axis structures and restacks each one densely, keeping the
/// relative order of `initial`. Returns the structures and the final offsets.
pub fn stack_bundles(
    bundles: &[Bundle],
    grid: &Grid,
    initial: &Offsets,
    epsilon: f32,
) -> (Vec<BundleStructure>, Offsets) {
    let mut by_axis: BTreeMap<Axis, Vec<BundleId>> = BTreeMap::new();
    for bundle in bundles {
        by_axis.entry(bundle.axis).or_default().push(bundle.id);
    }

    let mut structures = Vec::new();
    let mut offsets = Offsets::zeroed(bundles.len());
    for (axis, members) in by_axis {
        let spans: Vec<(f32, f32)> = members
            .iter()
            .map(|b| interval(&bundles[b.0], grid, epsilon))
            .collect();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
        for a in 0..members.len() {
            for b in (a + 1)..members.len() {
                if overlaps(spans[a], spans[b]) {
                    adjacency[a].push(b);
                    adjacency[b].push(a);
                }
            }
        }

        let mut seen = vec![false; members.len()];
        for seed in 0..members.len() {
            if seen[seed] {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::from([seed]);
            seen[seed] = true;
            while let Some(cur) = queue.pop_front() {
                component.push(cur);
                for &next in &adjacency[cur] {
                    if !seen[next] {
                        seen[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            let structure = restack(axis, &members, &adjacency, &component, initial);
            for layer in &structure.layers {
                for &bundle in &layer.bundles {
                    offsets.set(bundle, layer.offset);
                }
            }
            structures.push(structure);
        }
    }

    tracing::debug!(structures = structures.len(), "bundles stacked");
    (structures, offsets)
}

fn restack(
    axis: Axis,
    members: &[BundleId],
    adjacency: &[Vec<usize>],
    component: &[usize],
    initial: &Offsets,
) -> BundleStructure {
    // Pass-1 offset then id orders every overlapping pair, so the edges form a DAG.
    let rank = |local: usize| (initial.get(members[local]), members[local]);
    let mut order = component.to_vec();
    order.sort_by_key(|&local| rank(local));

    let mut level = vec![0i32; members.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for &high in &order {
            for &low in &adjacency[high] {
                if rank(low) < rank(high) && level[high] < level[low] + 1 {
                    level[high] = level[low] + 1;
                    changed = true;
                }
            }
        }
    }

    let max = component.iter().map(|&local| level[local]).max().unwrap_or(0);
    let mut layers: Vec<BundleLayer> = (0..=max)
        .map(|k| BundleLayer {
            offset: k - max / 2,
            bundles: Vec::new(),
        })
        .collect();
    for &local in component {
        layers[level[local] as usize].bundles.push(members[local]);
    }
    layers.retain(|layer| !layer.bundles.is_empty());

    BundleStructure {
        axis,
        bundles: component.iter().map(|&local| members[local]).collect(),
        layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Connection, Diagram, Side};
    use crate::layout::network::Wiring;
    use crate::layout::routing::Router;

    fn fixture(diagram: &Diagram) -> (Grid, Wiring) {
        let router = Router::new(diagram, Grid::new(diagram).unwrap());
        let wiring = Wiring::build(diagram, &router);
        (router.grid().clone(), wiring)
    }

    fn three_parallel() -> Diagram {
        let mut diagram = Diagram::new()
            .with_block(Block::new("A", 0, 0))
            .with_block(Block::new("B", 0, 2));
        for id in ["one", "two", "three"] {
            diagram = diagram.with_connection(
                Connection::new(id, "A", "B")
                    .exits(&[Side::Right])
                    .entrances(&[Side::Left]),
            );
        }
        diagram
    }

    #[test]
    fn overlapping_bundles_are_stacked_and_centered() {
        let (grid, wiring) = fixture(&three_parallel());
        assert_eq!(wiring.bundles().len(), 3);
        let initial = Offsets::zeroed(3);
        let (structures, offsets) = stack_bundles(wiring.bundles(), &grid, &initial, 0.01);
        assert_eq!(structures.len(), 1);
        let structure = &structures[0];
        assert_eq!(structure.axis, Axis::horizontal(1));
        assert_eq!(structure.depth(), 3);
        let finals: Vec<i32> = (0..3).map(|b| offsets.get(BundleId(b))).collect();
        assert_eq!(finals, vec![-1, 0, 1]);
    }

    #[test]
    fn pass_one_order_is_kept() {
        let (grid, wiring) = fixture(&three_parallel());
        let mut initial = Offsets::zeroed(3);
        initial.set(BundleId(0), 5);
        initial.set(BundleId(1), 2);
        let (_, offsets) = stack_bundles(wiring.bundles(), &grid, &initial, 0.01);
        assert_eq!(offsets.get(BundleId(2)), -1);
        assert_eq!(offsets.get(BundleId(1)), 0);
        assert_eq!(offsets.get(BundleId(0)), 1);
    }

    #[test]
    fn bundles_meeting_at_a_node_do_not_overlap() {
        let diagram = Diagram::new()
            .with_block(Block::new("A", 0, 0))
            .with_block(Block::new("B", 0, 1))
            .with_block(Block::new("C", 0, 2))
            .with_connection(Connection::new("a-b", "A", "B"))
            .with_connection(Connection::new("b-c", "B", "C"));
        let (grid, wiring) = fixture(&diagram);
        let initial = Offsets::zeroed(wiring.bundles().len());
        let (structures, offsets) = stack_bundles(wiring.bundles(), &grid, &initial, 0.01);
        assert_eq!(structures.len(), 2);
        assert!(structures.iter().all(|s| s.depth() == 1));
        assert!(offsets.iter().all(|(_, o)| o == 0));
    }

    #[test]
    fn even_depth_centers_low() {
        let mut diagram = three_parallel();
        diagram.connections.pop();
        let (grid, wiring) = fixture(&diagram);
        let (structures, offsets) =
            stack_bundles(wiring.bundles(), &grid, &Offsets::zeroed(2), 0.01);
        assert_eq!(structures[0].layers[0].offset, 0);
        assert_eq!(offsets.get(BundleId(1)), 1);
    }
}
