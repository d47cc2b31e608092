use serde::Serialize;

use crate::ir::Side;

/// Point of the routing grid: `i` is the row, `j` the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GridPoint {
    pub i: i32,
    pub j: i32,
}

impl GridPoint {
    pub fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    pub fn step(self, side: Side) -> Self {
        let (di, dj) = side.step();
        Self {
            i: self.i + di,
            j: self.j + dj,
        }
    }

    /// Diagram cells sit on odd/odd points; everything else is routing lane.
    pub fn is_cell(self) -> bool {
        self.i % 2 == 1 && self.j % 2 == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn of(side: Side) -> Self {
        if side.is_horizontal() {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// A grid row (horizontal) or column (vertical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Axis {
    pub orientation: Orientation,
    pub coord: i32,
}

impl Axis {
    pub fn horizontal(row: i32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            coord: row,
        }
    }

    pub fn vertical(col: i32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            coord: col,
        }
    }

    /// Axis of the given orientation through `p`.
    pub fn through(orientation: Orientation, p: GridPoint) -> Self {
        match orientation {
            Orientation::Horizontal => Self::horizontal(p.i),
            Orientation::Vertical => Self::vertical(p.j),
        }
    }

    /// Coordinate of `p` along this axis.
    pub fn along(&self, p: GridPoint) -> i32 {
        match self.orientation {
            Orientation::Horizontal => p.j,
            Orientation::Vertical => p.i,
        }
    }

    pub fn point(&self, along: i32) -> GridPoint {
        match self.orientation {
            Orientation::Horizontal => GridPoint::new(self.coord, along),
            Orientation::Vertical => GridPoint::new(along, self.coord),
        }
    }

    pub fn contains(&self, p: GridPoint) -> bool {
        match self.orientation {
            Orientation::Horizontal => p.i == self.coord,
            Orientation::Vertical => p.j == self.coord,
        }
    }
}

/// Directed extent along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OrientedVector {
    pub axis: Axis,
    pub start: i32,
    pub end: i32,
}

impl OrientedVector {
    /// Straight vector from `a` to `b`; `None` when the points are equal or not collinear.
    pub fn between(a: GridPoint, b: GridPoint) -> Option<Self> {
        if a == b {
            return None;
        }
        let orientation = if a.i == b.i {
            Orientation::Horizontal
        } else if a.j == b.j {
            Orientation::Vertical
        } else {
            return None;
        };
        let axis = Axis::through(orientation, a);
        Some(Self {
            axis,
            start: axis.along(a),
            end: axis.along(b),
        })
    }

    pub fn orientation(&self) -> Orientation {
        self.axis.orientation
    }

    /// Side the vector heads towards.
    pub fn direction(&self) -> Side {
        let forward = self.end >= self.start;
        match (self.axis.orientation, forward) {
            (Orientation::Horizontal, true) => Side::Right,
            (Orientation::Horizontal, false) => Side::Left,
            (Orientation::Vertical, true) => Side::Bottom,
            (Orientation::Vertical, false) => Side::Top,
        }
    }

    pub fn min(&self) -> i32 {
        self.start.min(self.end)
    }

    pub fn max(&self) -> i32 {
        self.start.max(self.end)
    }

    pub fn len(&self) -> i32 {
        (self.end - self.start).abs()
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn start_point(&self) -> GridPoint {
        self.axis.point(self.start)
    }

    pub fn end_point(&self) -> GridPoint {
        self.axis.point(self.end)
    }

    /// Every grid point from start to end, inclusive, in travel order.
    pub fn points(&self) -> impl Iterator<Item = GridPoint> + '_ {
        let step = if self.end >= self.start { 1 } else { -1 };
        (0..=self.len()).map(move |k| self.axis.point(self.start + k * step))
    }

    pub fn contains(&self, p: GridPoint) -> bool {
        self.axis.contains(p) && (self.min()..=self.max()).contains(&self.axis.along(p))
    }

    /// Same axis and at least one shared grid point.
    pub fn touches(&self, other: &OrientedVector) -> bool {
        self.axis == other.axis && self.min() <= other.max() && other.min() <= self.max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_picks_axis_and_direction() {
        let v = OrientedVector::between(GridPoint::new(3, 5), GridPoint::new(3, 1)).unwrap();
        assert_eq!(v.axis, Axis::horizontal(3));
        assert_eq!(v.direction(), Side::Left);
        assert_eq!((v.min(), v.max(), v.len()), (1, 5, 4));
        let pts: Vec<_> = v.points().collect();
        assert_eq!(pts.first(), Some(&GridPoint::new(3, 5)));
        assert_eq!(pts.last(), Some(&GridPoint::new(3, 1)));
        assert_eq!(pts.len(), 5);

        let v = OrientedVector::between(GridPoint::new(0, 2), GridPoint::new(4, 2)).unwrap();
        assert_eq!(v.axis, Axis::vertical(2));
        assert_eq!(v.direction(), Side::Bottom);

        assert!(OrientedVector::between(GridPoint::new(0, 0), GridPoint::new(1, 1)).is_none());
        assert!(OrientedVector::between(GridPoint::new(1, 1), GridPoint::new(1, 1)).is_none());
    }

    #[test]
    fn touching_is_inclusive_and_axis_scoped() {
        let a = OrientedVector::between(GridPoint::new(1, 1), GridPoint::new(1, 3)).unwrap();
        let b = OrientedVector::between(GridPoint::new(1, 5), GridPoint::new(1, 3)).unwrap();
        let c = OrientedVector::between(GridPoint::new(1, 4), GridPoint::new(1, 6)).unwrap();
        let d = OrientedVector::between(GridPoint::new(2, 1), GridPoint::new(2, 3)).unwrap();
        assert!(a.touches(&b));
        assert!(!a.touches(&c));
        assert!(!a.touches(&d));
        assert!(a.contains(GridPoint::new(1, 2)));
        assert!(!a.contains(GridPoint::new(2, 2)));
    }
}
