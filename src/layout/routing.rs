use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::ir::{BlockId, Connection, ConnectionId, Diagram, Side};

use super::geometry::{GridPoint, Orientation, OrientedVector};
use super::grid::{Grid, GridRect};

// ── Edge weights ────────────────────────────────────────────────────
// Weights are scaled by 10 so the 0.9 bias compares exactly on ties.
/// Weight of an ordinary grid edge (1.0).
const DEFAULT_WEIGHT: u32 = 10;
/// Weight of an edge continuing a declared exit or entrance (0.9).
const LIGHT_WEIGHT: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RouteId(pub usize);

/// Address of one segment: its route and sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SegmentRef {
    pub route: RouteId,
    pub seq: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSegment {
    pub route: RouteId,
    pub connection: ConnectionId,
    pub seq: usize,
    pub vector: OrientedVector,
}

impl RouteSegment {
    pub fn key(&self) -> SegmentRef {
        SegmentRef {
            route: self.route,
            seq: self.seq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub id: RouteId,
    pub connection: ConnectionId,
    pub name: String,
    pub segments: Vec<RouteSegment>,
}

impl Route {
    pub fn start(&self) -> GridPoint {
        self.segments[0].vector.start_point()
    }

    pub fn end(&self) -> GridPoint {
        self.segments[self.segments.len() - 1].vector.end_point()
    }

    /// Path points in travel order, corners only.
    pub fn corners(&self) -> Vec<GridPoint> {
        let mut points = vec![self.start()];
        points.extend(self.segments.iter().map(|s| s.vector.end_point()));
        points
    }

    /// Total length in grid steps.
    pub fn length(&self) -> i32 {
        self.segments.iter().map(|s| s.vector.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    /// No outer-node pair of the two endpoints is connected.
    NoPath,
    /// The endpoints share their only node, leaving nothing to draw.
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingFailure {
    pub connection: ConnectionId,
    pub name: String,
    pub reason: FailureReason,
}

/// Per-connection view of the endpoints that drives edge weights.
struct RouteContext<'a> {
    conn: &'a Connection,
    allowed: [BlockId; 2],
    source: GridRect,
    target: GridRect,
}

/// Path cost: total edge weight first, bends only to break weight ties.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct PathCost {
    weight: u32,
    bends: u32,
}

impl PathCost {
    const ZERO: Self = Self { weight: 0, bends: 0 };
    const UNREACHED: Self = Self {
        weight: u32::MAX,
        bends: u32::MAX,
    };
}

/// Search state: a point plus the side it was entered moving towards.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct PathState {
    point: GridPoint,
    heading: Side,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct PathEntry {
    cost: PathCost,
    state: PathState,
}

impl Ord for PathEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.state.point.cmp(&self.state.point))
            .then_with(|| other.state.heading.cmp(&self.state.heading))
    }
}

impl PartialOrd for PathEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct ShortestPaths {
    cost: Vec<PathCost>,
    prev: Vec<Option<PathState>>,
}

impl ShortestPaths {
    /// Cheapest arrival state at `point`, if reachable.
    fn best_at(&self, grid: &Grid, point: GridPoint) -> Option<(PathCost, PathState)> {
        let base = grid.index(point) * 4;
        Side::ALL
            .into_iter()
            .map(|heading| (self.cost[base + heading.slot()], PathState { point, heading }))
            .filter(|(cost, _)| *cost != PathCost::UNREACHED)
            .min_by_key(|(cost, _)| *cost)
    }
}

/// Routes every connection of a diagram over its grid.
#[derive(Debug, Clone)]
pub struct Router {
    grid: Grid,
    routes: Vec<Route>,
    failures: Vec<RoutingFailure>,
    /// Weight of leaving each point through each slot; rebuilt per connection.
    weights: Vec<[Option<u32>; 4]>,
}

impl Router {
    /// Expects a validated diagram.
    pub fn new(diagram: &Diagram, grid: Grid) -> Self {
        let mut router = Self {
            weights: vec![[None; 4]; grid.point_count()],
            grid,
            routes: Vec::new(),
            failures: Vec::new(),
        };
        for (idx, conn) in diagram.connections.iter().enumerate() {
            router.route_connection(diagram, ConnectionId(idx), conn);
        }
        tracing::debug!(
            routes = router.routes.len(),
            failures = router.failures.len(),
            "routing finished"
        );
        router
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, id: RouteId) -> &Route {
        &self.routes[id.0]
    }

    pub fn segment(&self, key: SegmentRef) -> &RouteSegment {
        &self.routes[key.route.0].segments[key.seq]
    }

    pub fn failures(&self) -> &[RoutingFailure] {
        &self.failures
    }

    fn route_connection(&mut self, diagram: &Diagram, id: ConnectionId, conn: &Connection) {
        let (Some(from_id), Some(to_id)) = (
            diagram.block_index(&conn.from.block),
            diagram.block_index(&conn.to.block),
        ) else {
            tracing::warn!(connection = %conn.id, "connection references an unknown block; dropped");
            self.fail(id, conn, FailureReason::NoPath);
            return;
        };
        let ctx = RouteContext {
            conn,
            allowed: [from_id, to_id],
            source: GridRect::from_cells(&conn.from.resolve(diagram.block(from_id))),
            target: GridRect::from_cells(&conn.to.resolve(diagram.block(to_id))),
        };
        self.reweigh(&ctx);

        let targets = ctx.target.outer_nodes();
        let mut best: Option<(u32, Vec<GridPoint>)> = None;
        for source in ctx.source.outer_nodes() {
            let paths = self.shortest_paths(source);
            for &target in &targets {
                let Some((cost, state)) = paths.best_at(&self.grid, target) else {
                    continue;
                };
                // first pair wins on equal weight
                if best.as_ref().is_some_and(|(weight, _)| cost.weight >= *weight) {
                    continue;
                }
                best = Some((cost.weight, self.trace(&paths, source, state)));
            }
        }

        let Some((cost, points)) = best else {
            tracing::warn!(connection = %conn.id, "no path between endpoints; connection dropped");
            self.fail(id, conn, FailureReason::NoPath);
            return;
        };
        let route_id = RouteId(self.routes.len());
        let segments = compress_path(&points)
            .into_iter()
            .enumerate()
            .map(|(seq, vector)| RouteSegment {
                route: route_id,
                connection: id,
                seq,
                vector,
            })
            .collect::<Vec<_>>();
        if segments.is_empty() {
            tracing::warn!(connection = %conn.id, "endpoints share a single node; connection dropped");
            self.fail(id, conn, FailureReason::Degenerate);
            return;
        }
        tracing::trace!(
            connection = %conn.id,
            cost,
            segments = segments.len(),
            "routed connection"
        );
        self.routes.push(Route {
            id: route_id,
            connection: id,
            name: conn.id.clone(),
            segments,
        });
    }

    fn fail(&mut self, id: ConnectionId, conn: &Connection, reason: FailureReason) {
        self.failures.push(RoutingFailure {
            connection: id,
            name: conn.id.clone(),
            reason,
        });
    }

    /// Clears and refills the edge weights for one connection.
    fn reweigh(&mut self, ctx: &RouteContext<'_>) {
        for idx in 0..self.grid.point_count() {
            let p = self.grid.point(idx);
            let mut slots = [None; 4];
            if !self.grid.is_forbidden(p, &ctx.allowed) {
                for (side, q) in self.grid.neighbors(p) {
                    if self.grid.is_forbidden(q, &ctx.allowed) {
                        continue;
                    }
                    slots[side.slot()] = Some(edge_weight(ctx, p, q, side));
                }
            }
            self.weights[idx] = slots;
        }
    }

    fn shortest_paths(&self, source: GridPoint) -> ShortestPaths {
        let states = self.grid.point_count() * 4;
        let mut cost = vec![PathCost::UNREACHED; states];
        let mut prev: Vec<Option<PathState>> = vec![None; states];
        let mut heap = BinaryHeap::new();

        // The first step never counts as a bend.
        for heading in Side::ALL {
            let state = PathState {
                point: source,
                heading,
            };
            cost[self.state_index(state)] = PathCost::ZERO;
            heap.push(PathEntry {
                cost: PathCost::ZERO,
                state,
            });
        }

        while let Some(PathEntry { cost: current, state }) = heap.pop() {
            if current != cost[self.state_index(state)] {
                continue;
            }
            let idx = self.grid.index(state.point);
            for side in Side::ALL {
                let Some(weight) = self.weights[idx][side.slot()] else {
                    continue;
                };
                let next = PathState {
                    point: state.point.step(side),
                    heading: side,
                };
                let next_cost = PathCost {
                    weight: current.weight.saturating_add(weight),
                    bends: current.bends + u32::from(side != state.heading),
                };
                let next_idx = self.state_index(next);
                if next_cost >= cost[next_idx] {
                    continue;
                }
                cost[next_idx] = next_cost;
                prev[next_idx] = Some(state);
                heap.push(PathEntry {
                    cost: next_cost,
                    state: next,
                });
            }
        }

        ShortestPaths { cost, prev }
    }

    fn state_index(&self, state: PathState) -> usize {
        self.grid.index(state.point) * 4 + state.heading.slot()
    }

    fn trace(&self, paths: &ShortestPaths, source: GridPoint, target: PathState) -> Vec<GridPoint> {
        let mut points = vec![target.point];
        let mut cur = target;
        while let Some(prev) = paths.prev[self.state_index(cur)] {
            points.push(prev.point);
            cur = prev;
        }
        debug_assert_eq!(cur.point, source);
        points.reverse();
        points
    }
}

fn edge_weight(ctx: &RouteContext<'_>, from: GridPoint, to: GridPoint, side: Side) -> u32 {
    let leaves_source = ctx.source.contains(from) && !ctx.source.contains(to);
    if leaves_source && ctx.conn.exits.contains(&side) {
        return LIGHT_WEIGHT;
    }
    // Entering through the left side means stepping right.
    let enters_target = !ctx.target.contains(from) && ctx.target.contains(to);
    if enters_target && ctx.conn.entrances.contains(&side.opposite()) {
        return LIGHT_WEIGHT;
    }
    DEFAULT_WEIGHT
}

/// Merges collinear runs of a unit-step path into straight vectors.
pub(crate) fn compress_path(points: &[GridPoint]) -> Vec<OrientedVector> {
    let mut vectors = Vec::new();
    if points.len() < 2 {
        return vectors;
    }
    let mut start = points[0];
    let mut orientation: Option<Orientation> = None;
    for window in points.windows(2) {
        let (prev, next) = (window[0], window[1]);
        let Some(step) = OrientedVector::between(prev, next) else {
            continue;
        };
        match orientation {
            Some(current) if current != step.orientation() => {
                vectors.extend(OrientedVector::between(start, prev));
                start = prev;
                orientation = Some(step.orientation());
            }
            Some(_) => {}
            None => orientation = Some(step.orientation()),
        }
    }
    vectors.extend(OrientedVector::between(start, points[points.len() - 1]));
    vectors
}
