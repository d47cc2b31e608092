use crate::ir::{Diagram, Side};
use crate::layout::{Axis, Layout, LayoutStats, NetworkKey, Orientation};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub grid_rows: i32,
    pub grid_cols: i32,
    pub lane_spacing: f32,
    pub routes: Vec<RouteDump>,
    pub networks: Vec<NetworkDump>,
    pub structures: Vec<StructureDump>,
    pub labels: Vec<LabelDump>,
    pub failures: Vec<FailureDump>,
    pub stats: LayoutStats,
}

#[derive(Debug, Serialize)]
pub struct RouteDump {
    pub connection: String,
    /// Grid corners as `[i, j]`.
    pub corners: Vec<[i32; 2]>,
    pub length: i32,
}

#[derive(Debug, Serialize)]
pub struct NetworkDump {
    pub key: String,
    pub grouped: bool,
    pub bundles: Vec<BundleDump>,
    pub wires: Vec<WireDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDump {
    pub id: usize,
    pub axis: String,
    pub min: i32,
    pub max: i32,
    pub segments: usize,
    pub initial_offset: i32,
    pub offset: i32,
}

#[derive(Debug, Serialize)]
pub struct WireDump {
    pub connection: String,
    pub exit: Side,
    pub entry: Side,
    /// Drawn points as `[x, y]` in grid units.
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct StructureDump {
    pub axis: String,
    /// Bundle ids per layer, lowest offset first.
    pub layers: Vec<LayerDump>,
}

#[derive(Debug, Serialize)]
pub struct LayerDump {
    pub offset: i32,
    pub bundles: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub connection: String,
    pub text: String,
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub anchor: [f32; 2],
}

#[derive(Debug, Serialize)]
pub struct FailureDump {
    pub connection: String,
    pub reason: String,
}

fn axis_name(axis: &Axis) -> String {
    match axis.orientation {
        Orientation::Horizontal => format!("row {}", axis.coord),
        Orientation::Vertical => format!("col {}", axis.coord),
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, diagram: &Diagram) -> Self {
        let routes = layout
            .routes()
            .iter()
            .map(|route| RouteDump {
                connection: route.name.clone(),
                corners: route.corners().iter().map(|p| [p.i, p.j]).collect(),
                length: route.length(),
            })
            .collect();

        let networks = layout
            .networks()
            .iter()
            .map(|network| {
                let (key, grouped) = match &network.key {
                    NetworkKey::Group(name) => (name.clone(), true),
                    NetworkKey::Route(name) => (name.clone(), false),
                };
                let bundles = network
                    .bundles
                    .iter()
                    .map(|&id| {
                        let bundle = layout.bundle(id);
                        let (min, max) = bundle.extent();
                        BundleDump {
                            id: id.0,
                            axis: axis_name(&bundle.axis),
                            min,
                            max,
                            segments: bundle.segments.len(),
                            initial_offset: layout.initial_offsets().get(id),
                            offset: layout.offset(id),
                        }
                    })
                    .collect();
                let wires = network
                    .wires
                    .iter()
                    .map(|wire| WireDump {
                        connection: diagram.connection(wire.connection).id.clone(),
                        exit: wire.exit_side(),
                        entry: wire.entry_side(),
                        points: layout.polyline(wire).iter().map(|(x, y)| [*x, *y]).collect(),
                    })
                    .collect();
                NetworkDump {
                    key,
                    grouped,
                    bundles,
                    wires,
                }
            })
            .collect();

        let structures = layout
            .bundle_structures()
            .iter()
            .map(|structure| StructureDump {
                axis: axis_name(&structure.axis),
                layers: structure
                    .layers
                    .iter()
                    .map(|layer| LayerDump {
                        offset: layer.offset,
                        bundles: layer.bundles.iter().map(|b| b.0).collect(),
                    })
                    .collect(),
            })
            .collect();

        let labels = layout
            .wire_labels()
            .iter()
            .map(|label| {
                let (ax, ay) = label.anchor();
                LabelDump {
                    connection: diagram.connection(label.connection).id.clone(),
                    text: label.text.clone(),
                    start: [label.start.0, label.start.1],
                    end: [label.end.0, label.end.1],
                    anchor: [ax, ay],
                }
            })
            .collect();

        let failures = layout
            .failures()
            .iter()
            .map(|failure| FailureDump {
                connection: failure.name.clone(),
                reason: format!("{:?}", failure.reason),
            })
            .collect();

        LayoutDump {
            grid_rows: layout.grid().rows(),
            grid_cols: layout.grid().cols(),
            lane_spacing: layout.lane_spacing(),
            routes,
            networks,
            structures,
            labels,
            failures,
            stats: layout.stats(),
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout, diagram: &Diagram) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, diagram);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

/// Pretty JSON dump to stdout.
pub fn print_layout_dump(layout: &Layout, diagram: &Diagram) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, diagram);
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &dump)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{Block, Connection, LabelOrientation};
    use crate::layout::compute_layout;

    #[test]
    fn dump_carries_offsets_and_labels() {
        let diagram = Diagram::new()
            .with_block(Block::new("A", 0, 0))
            .with_block(Block::new("B", 0, 1))
            .with_connection(
                Connection::new("a-b", "A", "B").label("go", LabelOrientation::Horizontal),
            );
        let layout = compute_layout(&diagram, &LayoutConfig::default()).unwrap();
        let dump = LayoutDump::from_layout(&layout, &diagram);
        assert_eq!((dump.grid_rows, dump.grid_cols), (3, 5));
        assert_eq!(dump.networks.len(), 1);
        assert_eq!(dump.networks[0].bundles[0].axis, "row 1");
        assert_eq!(dump.networks[0].wires[0].exit, Side::Right);
        assert_eq!(dump.networks[0].wires[0].entry, Side::Left);
        assert_eq!(dump.labels[0].anchor, [2.0, 1.0]);

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["networks"][0]["bundles"][0]["initialOffset"], 0);
        assert_eq!(json["stats"]["routes"], 1);
    }
}
