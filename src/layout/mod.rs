mod constraints;
mod error;
mod geometry;
mod grid;
mod junction;
mod label_placement;
mod network;
mod refiner;
mod routing;
mod structure;

pub use constraints::{ConstraintError, ConstraintSystem, Offsets};
pub use error::LayoutError;
pub use geometry::{Axis, GridPoint, Orientation, OrientedVector};
pub use grid::{Grid, GridRect};
pub use junction::{BundleRule, Junction, JunctionKind, Passthrough, classify};
pub use label_placement::{Labeler, WireLabel};
pub use network::{
    Bundle, BundleId, Joint, JointId, Network, NetworkId, NetworkKey, Wire, WireSegment, Wiring,
};
pub use refiner::{RefineStats, Refiner};
pub use routing::{
    FailureReason, Route, RouteId, RouteSegment, Router, RoutingFailure, SegmentRef,
};
pub use structure::{BundleLayer, BundleStructure};

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::ir::Diagram;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutStats {
    pub routes: usize,
    pub failures: usize,
    pub networks: usize,
    pub bundles: usize,
    pub structures: usize,
    pub refine: RefineStats,
}

/// Finished wiring layout of one diagram.
#[derive(Debug, Clone)]
pub struct Layout {
    router: Router,
    wiring: Wiring,
    refiner: Refiner,
    labels: Vec<WireLabel>,
    lane_spacing: f32,
}

impl Layout {
    pub fn grid(&self) -> &Grid {
        self.router.grid()
    }

    pub fn routes(&self) -> &[Route] {
        self.router.routes()
    }

    pub fn route(&self, id: RouteId) -> &Route {
        self.router.route(id)
    }

    /// Connections that could not be routed.
    pub fn failures(&self) -> &[RoutingFailure] {
        self.router.failures()
    }

    pub fn networks(&self) -> &[Network] {
        self.wiring.networks()
    }

    pub fn bundles(&self) -> &[Bundle] {
        self.wiring.bundles()
    }

    pub fn bundle(&self, id: BundleId) -> &Bundle {
        self.wiring.bundle(id)
    }

    pub fn bundle_of(&self, segment: SegmentRef) -> Option<BundleId> {
        self.wiring.bundle_of(segment)
    }

    pub fn joint(&self, id: JointId) -> &Joint {
        self.wiring.joint(id)
    }

    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wiring.wires()
    }

    /// Final lane offset of a bundle.
    pub fn offset(&self, bundle: BundleId) -> i32 {
        self.refiner.offsets().get(bundle)
    }

    pub fn offsets(&self) -> &Offsets {
        self.refiner.offsets()
    }

    /// Offsets from the junction rules alone, before stacking.
    pub fn initial_offsets(&self) -> &Offsets {
        self.refiner.initial_offsets()
    }

    pub fn bundle_structures(&self) -> &[BundleStructure] {
        self.refiner.structures()
    }

    /// Junction rules that shaped the initial offsets.
    pub fn accepted_rules(&self) -> &[BundleRule] {
        self.refiner.accepted_rules()
    }

    pub fn wire_labels(&self) -> &[WireLabel] {
        &self.labels
    }

    pub fn lane_spacing(&self) -> f32 {
        self.lane_spacing
    }

    /// Drawn corner points of a wire as `(x, y)` in grid units.
    pub fn polyline(&self, wire: &Wire) -> Vec<(f32, f32)> {
        self.wiring
            .polyline(wire, self.refiner.offsets(), self.lane_spacing)
    }

    pub fn stats(&self) -> LayoutStats {
        LayoutStats {
            routes: self.routes().len(),
            failures: self.failures().len(),
            networks: self.networks().len(),
            bundles: self.bundles().len(),
            structures: self.bundle_structures().len(),
            refine: self.refiner.stats(),
        }
    }
}

/// Routes, bundles, refines and labels every connection of `diagram`.
pub fn compute_layout(diagram: &Diagram, config: &LayoutConfig) -> Result<Layout, LayoutError> {
    diagram.validate()?;
    let (grid_rows, grid_cols) = grid::grid_size(diagram);
    if grid_rows.saturating_mul(grid_cols) > config.max_grid_points {
        return Err(LayoutError::GridTooLarge {
            rows: grid_rows,
            cols: grid_cols,
            limit: config.max_grid_points,
        });
    }

    let router = Router::new(diagram, Grid::new(diagram)?);
    let wiring = Wiring::build(diagram, &router);
    let refiner = Refiner::new(&router, &wiring, config.overlap_epsilon);
    let labels = Labeler::new(diagram, &wiring, refiner.offsets(), config).into_labels();
    tracing::debug!(
        routes = router.routes().len(),
        labels = labels.len(),
        "layout computed"
    );
    Ok(Layout {
        router,
        wiring,
        refiner,
        labels,
        lane_spacing: config.lane_spacing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Connection};

    #[test]
    fn oversized_grids_fail_fast() {
        let diagram = Diagram::new().with_block(Block::new("A", 10, 10));
        let config = LayoutConfig {
            max_grid_points: 100,
            ..LayoutConfig::default()
        };
        assert_eq!(
            compute_layout(&diagram, &config).unwrap_err(),
            LayoutError::GridTooLarge {
                rows: 23,
                cols: 23,
                limit: 100
            }
        );
    }

    #[test]
    fn overflowing_sizes_are_reported_not_wrapped() {
        let mut diagram = Diagram::new().with_block(Block::new("A", 0, 0));
        diagram.rows = Some(usize::MAX / 2 + 1);
        assert_eq!(
            compute_layout(&diagram, &LayoutConfig::default()).unwrap_err(),
            LayoutError::GridTooLarge {
                rows: usize::MAX,
                cols: 3,
                limit: 1_000_000
            }
        );

        // a raised limit still cannot outgrow i32 indexing
        diagram.rows = Some(40_000);
        diagram.cols = Some(40_000);
        let config = LayoutConfig {
            max_grid_points: usize::MAX,
            ..LayoutConfig::default()
        };
        assert_eq!(
            compute_layout(&diagram, &config).unwrap_err(),
            LayoutError::GridTooLarge {
                rows: 80_001,
                cols: 80_001,
                limit: i32::MAX as usize
            }
        );
    }

    #[test]
    fn invalid_diagrams_are_reported() {
        let diagram = Diagram::new()
            .with_block(Block::new("A", 0, 0))
            .with_connection(Connection::new("c", "A", "missing"));
        assert!(matches!(
            compute_layout(&diagram, &LayoutConfig::default()),
            Err(LayoutError::Diagram(_))
        ));
    }

    #[test]
    fn polyline_applies_offsets() {
        let diagram = Diagram::new()
            .with_block(Block::new("A", 0, 0))
            .with_block(Block::new("B", 0, 1))
            .with_connection(Connection::new("one", "A", "B"))
            .with_connection(Connection::new("two", "A", "B"));
        let layout = compute_layout(&diagram, &LayoutConfig::default()).unwrap();
        let lines: Vec<_> = layout.wires().map(|w| layout.polyline(w)).collect();
        assert_eq!(lines[0], vec![(1.0, 1.0), (3.0, 1.0)]);
        assert_eq!(lines[1], vec![(1.0, 1.2), (3.0, 1.2)]);
        let stats = layout.stats();
        assert_eq!((stats.routes, stats.bundles, stats.structures), (2, 2, 1));
    }
}
