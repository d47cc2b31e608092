// Wire label placement: the longest straight stretch of a wire that no other wire crosses.

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::ir::{ConnectionId, Diagram, LabelOrientation};

use super::constraints::Offsets;
use super::geometry::Orientation;
use super::network::{Wire, WireSegment, Wiring};
use super::routing::RouteId;

const SPAN_EPS: f32 = 1e-4;

/// Label placed on a straight span of its wire, in grid units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireLabel {
    pub connection: ConnectionId,
    pub text: String,
    pub orientation: LabelOrientation,
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub length: f32,
}

impl WireLabel {
    pub fn anchor(&self) -> (f32, f32) {
        (
            (self.start.0 + self.end.0) / 2.0,
            (self.start.1 + self.end.1) / 2.0,
        )
    }
}

/// A wire segment as drawn: fixed coordinate plus travel-ordered extent.
#[derive(Debug, Clone, Copy)]
struct DrawnSegment {
    route: RouteId,
    orientation: Orientation,
    coord: f32,
    start: f32,
    end: f32,
}

impl DrawnSegment {
    fn new(
        wiring: &Wiring,
        route: RouteId,
        seg: &WireSegment,
        offsets: &Offsets,
        lane: f32,
    ) -> Self {
        let (sx, sy) = wiring.joint(seg.start).position(offsets, lane);
        let (ex, ey) = wiring.joint(seg.end).position(offsets, lane);
        match seg.vector.orientation() {
            Orientation::Horizontal => Self {
                route,
                orientation: Orientation::Horizontal,
                coord: sy,
                start: sx,
                end: ex,
            },
            Orientation::Vertical => Self {
                route,
                orientation: Orientation::Vertical,
                coord: sx,
                start: sy,
                end: ey,
            },
        }
    }

    fn point(&self, along: f32) -> (f32, f32) {
        match self.orientation {
            Orientation::Horizontal => (along, self.coord),
            Orientation::Vertical => (self.coord, along),
        }
    }

    /// Whether perpendicular `other` cuts this segment, half-open in travel direction.
    fn cut_by(&self, other: &DrawnSegment) -> Option<f32> {
        if other.orientation == self.orientation || other.route == self.route {
            return None;
        }
        let (lo, hi) = (other.start.min(other.end), other.start.max(other.end));
        if self.coord < lo || self.coord > hi {
            return None;
        }
        let c = other.coord;
        let inside = if self.end >= self.start {
            self.start <= c && c < self.end
        } else {
            self.end < c && c <= self.start
        };
        inside.then_some(c)
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    orientation: Orientation,
    start: (f32, f32),
    end: (f32, f32),
    length: f32,
}

/// Places one label per labeled wire.
#[derive(Debug, Clone, Default)]
pub struct Labeler {
    labels: Vec<WireLabel>,
}

impl Labeler {
    pub fn new(
        diagram: &Diagram,
        wiring: &Wiring,
        offsets: &Offsets,
        config: &LayoutConfig,
    ) -> Self {
        let lane = config.lane_spacing;
        let drawn: Vec<DrawnSegment> = wiring
            .wires()
            .flat_map(|wire| {
                wire.segments
                    .iter()
                    .map(move |seg| DrawnSegment::new(wiring, wire.route, seg, offsets, lane))
            })
            .collect();

        let mut labels = Vec::new();
        for wire in wiring.wires() {
            let Some(label) = diagram.connection(wire.connection).label.as_ref() else {
                continue;
            };
            if label.text.trim().is_empty() {
                continue;
            }
            let spans = wire_spans(wiring, wire, &drawn, offsets, lane);
            match best_span(&spans, label.orientation, config.min_label_span) {
                Some(span) => labels.push(WireLabel {
                    connection: wire.connection,
                    text: label.text.clone(),
                    orientation: match span.orientation {
                        Orientation::Horizontal => LabelOrientation::Horizontal,
                        Orientation::Vertical => LabelOrientation::Vertical,
                    },
                    start: span.start,
                    end: span.end,
                    length: span.length,
                }),
                None => tracing::debug!(
                    connection = %diagram.connection(wire.connection).id,
                    "no uncrossed span long enough for label"
                ),
            }
        }
        Self { labels }
    }

    pub fn labels(&self) -> &[WireLabel] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<WireLabel> {
        self.labels
    }
}

fn wire_spans(
    wiring: &Wiring,
    wire: &Wire,
    drawn: &[DrawnSegment],
    offsets: &Offsets,
    lane: f32,
) -> Vec<Span> {
    let mut spans = Vec::new();
    for seg in &wire.segments {
        let own = DrawnSegment::new(wiring, wire.route, seg, offsets, lane);
        let forward = own.end >= own.start;
        let mut cuts: Vec<f32> = drawn.iter().filter_map(|other| own.cut_by(other)).collect();
        cuts.push(own.end);
        cuts.sort_by(|a, b| if forward { a.total_cmp(b) } else { b.total_cmp(a) });

        let mut from = own.start;
        for cut in cuts {
            let length = (cut - from).abs();
            if length > SPAN_EPS {
                spans.push(Span {
                    orientation: own.orientation,
                    start: own.point(from),
                    end: own.point(cut),
                    length,
                });
            }
            from = cut;
        }
    }
    spans
}

fn best_span(spans: &[Span], wanted: LabelOrientation, min_span: f32) -> Option<Span> {
    let wanted = match wanted {
        LabelOrientation::Horizontal => Orientation::Horizontal,
        LabelOrientation::Vertical => Orientation::Vertical,
    };
    let longest = |matching: bool| {
        spans
            .iter()
            .filter(|s| !matching || s.orientation == wanted)
            .filter(|s| s.length + SPAN_EPS >= min_span)
            .fold(None::<&Span>, |best, s| match best {
                Some(b) if b.length >= s.length => Some(b),
                _ => Some(s),
            })
            .copied()
    };
    longest(true).or_else(|| longest(false))
}
