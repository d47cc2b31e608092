use crate::ir::{BlockId, CellRect, Diagram, Side};

use super::error::LayoutError;
use super::geometry::GridPoint;

/// Inclusive rectangle of grid points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl GridRect {
    /// Grid points covered by a rectangle of diagram cells, including the lanes between them.
    pub fn from_cells(cells: &CellRect) -> Self {
        Self {
            top: 2 * cells.row as i32 + 1,
            left: 2 * cells.col as i32 + 1,
            bottom: 2 * cells.bottom() as i32 - 1,
            right: 2 * cells.right() as i32 - 1,
        }
    }

    pub fn contains(&self, p: GridPoint) -> bool {
        p.i >= self.top && p.i <= self.bottom && p.j >= self.left && p.j <= self.right
    }

    /// Cell nodes on the rectangle's perimeter, row-major.
    pub fn outer_nodes(&self) -> Vec<GridPoint> {
        let mut nodes = Vec::new();
        for i in (self.top..=self.bottom).step_by(2) {
            for j in (self.left..=self.right).step_by(2) {
                if i == self.top || i == self.bottom || j == self.left || j == self.right {
                    nodes.push(GridPoint::new(i, j));
                }
            }
        }
        nodes
    }
}

/// Routing grid of `2H+1` rows by `2W+1` columns for an `H`x`W` diagram.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: i32,
    cols: i32,
    /// Blocks covering each point, smallest block first.
    point_blocks: Vec<Vec<BlockId>>,
    pass_through: Vec<bool>,
}

/// Routing grid `(rows, cols)` for a diagram, saturating on overflow.
pub fn grid_size(diagram: &Diagram) -> (usize, usize) {
    let (rows, cols) = diagram.size();
    let extent = |cells: usize| cells.saturating_mul(2).saturating_add(1);
    (extent(rows), extent(cols))
}

impl Grid {
    /// Fails when the point count does not fit `i32` indexing.
    pub fn new(diagram: &Diagram) -> Result<Self, LayoutError> {
        let (grid_rows, grid_cols) = grid_size(diagram);
        let too_large = LayoutError::GridTooLarge {
            rows: grid_rows,
            cols: grid_cols,
            limit: i32::MAX as usize,
        };
        let points = grid_rows.checked_mul(grid_cols).ok_or(too_large.clone())?;
        if i32::try_from(points).is_err() {
            return Err(too_large);
        }
        // both factors are at most the product
        let (rows, cols) = (grid_rows as i32, grid_cols as i32);
        let mut point_blocks = vec![Vec::new(); (rows * cols) as usize];

        let mut order: Vec<usize> = (0..diagram.blocks.len()).collect();
        order.sort_by_key(|&idx| diagram.blocks[idx].cells().area());
        for idx in order {
            let rect = GridRect::from_cells(&diagram.blocks[idx].cells());
            for i in rect.top..=rect.bottom.min(rows - 1) {
                for j in rect.left..=rect.right.min(cols - 1) {
                    point_blocks[(i * cols + j) as usize].push(BlockId(idx));
                }
            }
        }

        Ok(Self {
            rows,
            cols,
            point_blocks,
            pass_through: diagram.blocks.iter().map(|b| b.pass_through).collect(),
        })
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn point_count(&self) -> usize {
        (self.rows * self.cols) as usize
    }

    pub fn contains(&self, p: GridPoint) -> bool {
        p.i >= 0 && p.j >= 0 && p.i < self.rows && p.j < self.cols
    }

    pub(crate) fn index(&self, p: GridPoint) -> usize {
        (p.i * self.cols + p.j) as usize
    }

    pub(crate) fn point(&self, index: usize) -> GridPoint {
        let index = index as i32;
        GridPoint::new(index / self.cols, index % self.cols)
    }

    /// Grid point of a diagram cell.
    pub fn cell_point(row: usize, col: usize) -> GridPoint {
        GridPoint::new(2 * row as i32 + 1, 2 * col as i32 + 1)
    }

    pub fn blocks_at(&self, p: GridPoint) -> &[BlockId] {
        if !self.contains(p) {
            return &[];
        }
        &self.point_blocks[self.index(p)]
    }

    /// Block node at `p`: the innermost block whose cell sits on this point.
    pub fn node_at(&self, p: GridPoint) -> Option<BlockId> {
        if !p.is_cell() {
            return None;
        }
        self.blocks_at(p).first().copied()
    }

    /// Points of opaque blocks other than `allowed` cannot carry wires.
    pub fn is_forbidden(&self, p: GridPoint, allowed: &[BlockId]) -> bool {
        let blocks = self.blocks_at(p);
        if blocks.iter().any(|b| allowed.contains(b)) {
            return false;
        }
        blocks.iter().any(|b| !self.pass_through[b.0])
    }

    /// In-bounds 4-neighbours in slot order (bottom, left, right, top).
    pub fn neighbors(&self, p: GridPoint) -> impl Iterator<Item = (Side, GridPoint)> + '_ {
        Side::ALL
            .into_iter()
            .map(move |side| (side, p.step(side)))
            .filter(move |(_, q)| self.contains(*q))
    }

    /// Every undirected adjacency once, as `(a, b)` with `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (GridPoint, GridPoint)> + '_ {
        (0..self.point_count()).flat_map(move |idx| {
            let p = self.point(idx);
            [Side::Bottom, Side::Right]
                .into_iter()
                .map(move |side| (p, p.step(side)))
                .filter(move |(_, q)| self.contains(*q))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, Diagram};

    fn diagram() -> Diagram {
        Diagram::new()
            .with_block(Block::new("outer", 0, 0).sized(3, 3).pass_through())
            .with_block(Block::new("inner", 1, 1))
            .with_block(Block::new("wall", 0, 3).sized(3, 1))
    }

    #[test]
    fn grid_doubles_the_diagram() {
        let grid = Grid::new(&diagram()).unwrap();
        assert_eq!((grid.rows(), grid.cols()), (7, 9));
        assert_eq!(grid.edges().count(), (7 * 8) + (6 * 9));
        let corner: Vec<_> = grid.neighbors(GridPoint::new(0, 0)).map(|(s, _)| s).collect();
        assert_eq!(corner, vec![Side::Bottom, Side::Right]);
    }

    #[test]
    fn nodes_prefer_the_innermost_block() {
        let d = diagram();
        let grid = Grid::new(&d).unwrap();
        let inner = d.block_index("inner").unwrap();
        let outer = d.block_index("outer").unwrap();
        assert_eq!(grid.node_at(GridPoint::new(3, 3)), Some(inner));
        assert_eq!(grid.node_at(GridPoint::new(1, 1)), Some(outer));
        assert_eq!(grid.node_at(GridPoint::new(2, 2)), None);
        assert_eq!(grid.blocks_at(GridPoint::new(3, 3)), &[inner, outer]);
    }

    #[test]
    fn forbidden_points_respect_pass_through_and_own_blocks() {
        let d = diagram();
        let grid = Grid::new(&d).unwrap();
        let inner = d.block_index("inner").unwrap();
        let wall = d.block_index("wall").unwrap();
        // inside the pass-through container only
        assert!(!grid.is_forbidden(GridPoint::new(1, 1), &[]));
        assert!(grid.is_forbidden(GridPoint::new(3, 3), &[]));
        assert!(!grid.is_forbidden(GridPoint::new(3, 3), &[inner]));
        assert!(grid.is_forbidden(GridPoint::new(2, 7), &[inner]));
        assert!(!grid.is_forbidden(GridPoint::new(2, 7), &[wall]));
        assert!(!grid.is_forbidden(GridPoint::new(0, 8), &[]));
    }

    #[test]
    fn outer_nodes_walk_the_perimeter() {
        let rect = GridRect::from_cells(&CellRect::new(0, 0, 3, 3));
        let nodes = rect.outer_nodes();
        assert_eq!(nodes.len(), 8);
        assert!(!nodes.contains(&GridPoint::new(3, 3)));
        assert_eq!(nodes[0], GridPoint::new(1, 1));
        let single = GridRect::from_cells(&CellRect::new(2, 4, 1, 1));
        assert_eq!(single.outer_nodes(), vec![GridPoint::new(5, 9)]);
    }
}
