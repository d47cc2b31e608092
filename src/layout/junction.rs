use serde::Serialize;

use crate::ir::Side;

use super::geometry::GridPoint;
use super::network::{BundleId, NetworkId};
use super::routing::RouteId;

// ── Slot masks ──────────────────────────────────────────────────────
pub const BOTTOM: u8 = 1;
pub const LEFT: u8 = 2;
pub const RIGHT: u8 = 4;
pub const TOP: u8 = 8;

const ACROSS: u8 = LEFT | RIGHT;
const ALONG: u8 = BOTTOM | TOP;

/// What one route does at one grid point: the bundle behind each directional slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passthrough {
    pub route: RouteId,
    pub network: NetworkId,
    pub point: GridPoint,
    /// Indexed by `Side::slot()`.
    pub slots: [Option<BundleId>; 4],
}

impl Passthrough {
    pub fn new(route: RouteId, network: NetworkId, point: GridPoint) -> Self {
        Self {
            route,
            network,
            point,
            slots: [None; 4],
        }
    }

    pub fn set(&mut self, side: Side, bundle: BundleId) {
        self.slots[side.slot()] = Some(bundle);
    }

    pub fn slot(&self, side: Side) -> Option<BundleId> {
        self.slots[side.slot()]
    }

    pub fn mask(&self) -> u8 {
        Side::ALL
            .into_iter()
            .filter(|side| self.slots[side.slot()].is_some())
            .fold(0, |mask, side| mask | side.bit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JunctionKind {
    T,
    V,
    S,
}

/// `second.offset >= first.offset + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BundleRule {
    pub first: BundleId,
    pub second: BundleId,
    pub kind: JunctionKind,
}

/// Rules produced by one interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Junction {
    T(BundleRule),
    /// Two alternatives, horizontal separation first.
    V([BundleRule; 2]),
    /// Two alternative pairs, "a outer" first; each pair is all-or-nothing.
    S([[BundleRule; 2]; 2]),
}

impl Junction {
    pub fn kind(&self) -> JunctionKind {
        match self {
            Junction::T(_) => JunctionKind::T,
            Junction::V(_) => JunctionKind::V,
            Junction::S(_) => JunctionKind::S,
        }
    }

    /// Rules handed to the constraint system. Only the first alternative of a V or S
    /// junction is ever attempted; the second is kept for inspection.
    pub fn attempted(&self) -> &[BundleRule] {
        match self {
            Junction::T(rule) => std::slice::from_ref(rule),
            Junction::V(alternatives) => &alternatives[..1],
            Junction::S(pairs) => &pairs[0],
        }
    }

    /// Whether the attempted rules must be admitted together.
    pub fn is_atomic(&self) -> bool {
        matches!(self, Junction::S(_))
    }
}

// ── T table ─────────────────────────────────────────────────────────

/// Which bundle of a T interaction a rule refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pick {
    /// The straight route's bundle.
    Straight,
    /// The turning route's bundle behind the given slot.
    Other(Side),
}

#[derive(Debug, Clone, Copy)]
struct TCase {
    /// Side the turning route leaves the straight line towards.
    stem: Side,
    straight: u8,
    other: u8,
    /// `(first, second)`; stubs carry no order since their only bundle is perpendicular.
    order: Option<(Pick, Pick)>,
}

/// Stem bottom and right put the straight bundle first, stem top and left put it second.
#[rustfmt::skip]
const T_CASES: [TCase; 12] = [
    // stem bottom
    TCase { stem: Side::Bottom, straight: ACROSS, other: LEFT | BOTTOM, order: Some((Pick::Straight, Pick::Other(Side::Left))) },
    TCase { stem: Side::Bottom, straight: ACROSS, other: RIGHT | BOTTOM, order: Some((Pick::Straight, Pick::Other(Side::Right))) },
    TCase { stem: Side::Bottom, straight: ACROSS, other: BOTTOM, order: None },
    // stem top
    TCase { stem: Side::Top, straight: ACROSS, other: LEFT | TOP, order: Some((Pick::Other(Side::Left), Pick::Straight)) },
    TCase { stem: Side::Top, straight: ACROSS, other: RIGHT | TOP, order: Some((Pick::Other(Side::Right), Pick::Straight)) },
    TCase { stem: Side::Top, straight: ACROSS, other: TOP, order: None },
    // stem right
    TCase { stem: Side::Right, straight: ALONG, other: BOTTOM | RIGHT, order: Some((Pick::Straight, Pick::Other(Side::Bottom))) },
    TCase { stem: Side::Right, straight: ALONG, other: TOP | RIGHT, order: Some((Pick::Straight, Pick::Other(Side::Top))) },
    TCase { stem: Side::Right, straight: ALONG, other: RIGHT, order: None },
    // stem left
    TCase { stem: Side::Left, straight: ALONG, other: BOTTOM | LEFT, order: Some((Pick::Other(Side::Bottom), Pick::Straight)) },
    TCase { stem: Side::Left, straight: ALONG, other: TOP | LEFT, order: Some((Pick::Other(Side::Top), Pick::Straight)) },
    TCase { stem: Side::Left, straight: ALONG, other: LEFT, order: None },
];

/// Matches the interaction `(a, b)` against the T, V and S patterns.
///
/// A route stopping on a straight line matches a T case but yields no rule.
pub fn classify(a: &Passthrough, b: &Passthrough) -> Option<Junction> {
    let (ma, mb) = (a.mask(), b.mask());

    if let Some(case) = T_CASES
        .iter()
        .find(|case| case.straight == ma && case.other == mb)
    {
        let Some((first, second)) = case.order else {
            tracing::trace!(stem = ?case.stem, point = ?a.point, "stub on a straight line");
            return None;
        };
        let straight = a.slot(straight_side(ma))?;
        let pick = |p: Pick| match p {
            Pick::Straight => Some(straight),
            Pick::Other(side) => b.slot(side),
        };
        tracing::trace!(stem = ?case.stem, point = ?a.point, "T junction");
        return Some(Junction::T(BundleRule {
            first: pick(first)?,
            second: pick(second)?,
            kind: JunctionKind::T,
        }));
    }

    let (ca, cb) = (corner(ma)?, corner(mb)?);
    if ma & mb == 0 && ma | mb == 0b1111 {
        let [horizontal, vertical] = separation(a, b, ca, JunctionKind::V)?;
        return Some(Junction::V([horizontal, vertical]));
    }
    if ma == mb {
        let a_outer = separation(a, b, ca, JunctionKind::S)?;
        let b_outer = separation(b, a, cb, JunctionKind::S)?;
        return Some(Junction::S([a_outer, b_outer]));
    }
    None
}

fn straight_side(mask: u8) -> Side {
    if mask == ACROSS { Side::Left } else { Side::Bottom }
}

/// Horizontal and vertical side of a corner mask.
fn corner(mask: u8) -> Option<(Side, Side)> {
    match mask {
        m if m == LEFT | BOTTOM => Some((Side::Left, Side::Bottom)),
        m if m == RIGHT | BOTTOM => Some((Side::Right, Side::Bottom)),
        m if m == LEFT | TOP => Some((Side::Left, Side::Top)),
        m if m == RIGHT | TOP => Some((Side::Right, Side::Top)),
        _ => None,
    }
}

/// Horizontal and vertical rules keeping `inner`'s elbow inside `outer`'s,
/// for `outer` turning through corner `(h, v)`.
fn separation(
    outer: &Passthrough,
    inner: &Passthrough,
    (h, v): (Side, Side),
    kind: JunctionKind,
) -> Option<[BundleRule; 2]> {
    let (ih, iv) = corner(inner.mask())?;
    let (outer_h, inner_h) = (outer.slot(h)?, inner.slot(ih)?);
    let (outer_v, inner_v) = (outer.slot(v)?, inner.slot(iv)?);

    let horizontal = if v == Side::Bottom {
        BundleRule { first: inner_h, second: outer_h, kind }
    } else {
        BundleRule { first: outer_h, second: inner_h, kind }
    };
    let vertical = if h == Side::Left {
        BundleRule { first: outer_v, second: inner_v, kind }
    } else {
        BundleRule { first: inner_v, second: outer_v, kind }
    };
    Some([horizontal, vertical])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(route: usize, slots: &[(Side, usize)]) -> Passthrough {
        let mut p = Passthrough::new(RouteId(route), NetworkId(route), GridPoint::new(3, 3));
        for &(side, bundle) in slots {
            p.set(side, BundleId(bundle));
        }
        p
    }

    #[test]
    fn masks_follow_slot_bits() {
        let p = pass(0, &[(Side::Left, 1), (Side::Top, 2)]);
        assert_eq!(p.mask(), LEFT | TOP);
        assert_eq!(p.mask(), 10);
        assert_eq!(pass(0, &[]).mask(), 0);
    }

    #[test]
    fn t_table_covers_every_stem_once_per_shape() {
        for stem in Side::ALL {
            let cases: Vec<_> = T_CASES.iter().filter(|c| c.stem == stem).collect();
            assert_eq!(cases.len(), 3);
            for case in &cases {
                assert_ne!(case.other & stem.bit(), 0);
                assert_eq!(case.straight & stem.bit(), 0);
                assert_eq!(case.other & !(case.straight | stem.bit()), 0);
            }
        }
        for (idx, case) in T_CASES.iter().enumerate() {
            assert!(
                T_CASES[idx + 1..]
                    .iter()
                    .all(|other| (other.straight, other.other) != (case.straight, case.other))
            );
        }
    }

    #[test]
    fn t_junction_orders_by_stem() {
        // straight left-right on bundle 0, the other route arrives from the left and turns down
        let a = pass(0, &[(Side::Left, 0), (Side::Right, 0)]);
        let b = pass(1, &[(Side::Left, 1), (Side::Bottom, 2)]);
        let junction = classify(&a, &b).unwrap();
        assert_eq!(
            junction,
            Junction::T(BundleRule {
                first: BundleId(0),
                second: BundleId(1),
                kind: JunctionKind::T
            })
        );
        assert_eq!(junction.attempted().len(), 1);

        // stem top flips the order
        let b = pass(1, &[(Side::Right, 1), (Side::Top, 2)]);
        let Some(Junction::T(rule)) = classify(&a, &b) else {
            panic!("expected a T junction");
        };
        assert_eq!((rule.first, rule.second), (BundleId(1), BundleId(0)));

        // stem right on a vertical straight
        let a = pass(0, &[(Side::Bottom, 5), (Side::Top, 5)]);
        let b = pass(1, &[(Side::Top, 6), (Side::Right, 7)]);
        let Some(Junction::T(rule)) = classify(&a, &b) else {
            panic!("expected a T junction");
        };
        assert_eq!((rule.first, rule.second), (BundleId(5), BundleId(6)));
    }

    #[test]
    fn stubs_on_a_straight_line_order_nothing() {
        let a = pass(0, &[(Side::Bottom, 5), (Side::Top, 5)]);
        let b = pass(1, &[(Side::Left, 7)]);
        assert_eq!(classify(&a, &b), None);
        let a = pass(0, &[(Side::Left, 0), (Side::Right, 0)]);
        let b = pass(1, &[(Side::Top, 3)]);
        assert_eq!(classify(&a, &b), None);
    }

    #[test]
    fn t_rules_stay_on_the_straight_axis() {
        for case in &T_CASES {
            let Some((first, second)) = case.order else {
                assert_eq!(case.other, case.stem.bit());
                continue;
            };
            for pick in [first, second] {
                if let Pick::Other(side) = pick {
                    assert_ne!(side.bit() & case.straight, 0, "{case:?}");
                }
            }
            assert_ne!(first, second);
        }
    }

    #[test]
    fn turning_route_first_is_not_a_t() {
        let a = pass(0, &[(Side::Left, 1), (Side::Bottom, 2)]);
        let b = pass(1, &[(Side::Left, 0), (Side::Right, 0)]);
        assert_eq!(classify(&a, &b), None);
    }

    #[test]
    fn v_junction_tries_horizontal_separation_only() {
        // a: left+bottom, b: right+top
        let a = pass(0, &[(Side::Left, 1), (Side::Bottom, 2)]);
        let b = pass(1, &[(Side::Right, 3), (Side::Top, 4)]);
        let junction = classify(&a, &b).unwrap();
        assert_eq!(junction.kind(), JunctionKind::V);
        let Junction::V([horizontal, vertical]) = junction.clone() else {
            unreachable!();
        };
        assert_eq!((horizontal.first, horizontal.second), (BundleId(3), BundleId(1)));
        assert_eq!((vertical.first, vertical.second), (BundleId(2), BundleId(4)));
        assert_eq!(junction.attempted(), &[horizontal]);
        assert!(!junction.is_atomic());
    }

    #[test]
    fn s_junction_pairs_are_atomic() {
        let a = pass(0, &[(Side::Right, 1), (Side::Top, 2)]);
        let b = pass(1, &[(Side::Right, 3), (Side::Top, 4)]);
        let junction = classify(&a, &b).unwrap();
        assert!(junction.is_atomic());
        let Junction::S([a_outer, b_outer]) = &junction else {
            panic!("expected an S junction");
        };
        assert_eq!((a_outer[0].first, a_outer[0].second), (BundleId(1), BundleId(3)));
        assert_eq!((a_outer[1].first, a_outer[1].second), (BundleId(4), BundleId(2)));
        assert_eq!((b_outer[0].first, b_outer[0].second), (BundleId(3), BundleId(1)));
        assert_eq!(junction.attempted(), &a_outer[..]);
    }

    #[test]
    fn unrelated_shapes_do_not_match() {
        let a = pass(0, &[(Side::Left, 1), (Side::Bottom, 2)]);
        let b = pass(1, &[(Side::Right, 3), (Side::Bottom, 4)]);
        assert_eq!(classify(&a, &b), None);
        let a = pass(0, &[(Side::Left, 1), (Side::Right, 1)]);
        let b = pass(1, &[(Side::Bottom, 3), (Side::Top, 3)]);
        assert_eq!(classify(&a, &b), None);
    }
}
