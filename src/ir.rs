use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Side of a block, and the four directional slots of a grid point.
///
/// Rows grow downwards, so `Bottom` steps to `i + 1` and `Right` steps to `j + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "b", alias = "s", alias = "south")]
    Bottom,
    #[serde(alias = "l", alias = "w", alias = "west")]
    Left,
    #[serde(alias = "r", alias = "e", alias = "east")]
    Right,
    #[serde(alias = "t", alias = "n", alias = "north")]
    Top,
}

impl Side {
    /// Slot order used by passthrough bitmasks.
    pub const ALL: [Side; 4] = [Side::Bottom, Side::Left, Side::Right, Side::Top];

    pub fn opposite(self) -> Self {
        match self {
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Top => Side::Bottom,
        }
    }

    /// Grid step `(di, dj)` taken when moving out through this side.
    pub fn step(self) -> (i32, i32) {
        match self {
            Side::Bottom => (1, 0),
            Side::Left => (0, -1),
            Side::Right => (0, 1),
            Side::Top => (-1, 0),
        }
    }

    pub fn slot(self) -> usize {
        match self {
            Side::Bottom => 0,
            Side::Left => 1,
            Side::Right => 2,
            Side::Top => 3,
        }
    }

    pub fn bit(self) -> u8 {
        1 << self.slot()
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

/// Rectangle of diagram cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub row: usize,
    pub col: usize,
    #[serde(default = "one")]
    pub height: usize,
    #[serde(default = "one")]
    pub width: usize,
}

fn one() -> usize {
    1
}

impl CellRect {
    pub fn new(row: usize, col: usize, height: usize, width: usize) -> Self {
        Self {
            row,
            col,
            height,
            width,
        }
    }

    pub fn bottom(&self) -> usize {
        self.row.saturating_add(self.height)
    }

    pub fn right(&self) -> usize {
        self.col.saturating_add(self.width)
    }

    pub fn area(&self) -> usize {
        self.height.saturating_mul(self.width)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub row: usize,
    pub col: usize,
    #[serde(default = "one")]
    pub height: usize,
    #[serde(default = "one")]
    pub width: usize,
    /// Wires of other blocks may cross this block (containers, lanes).
    #[serde(default)]
    pub pass_through: bool,
}

impl Block {
    pub fn new(id: &str, row: usize, col: usize) -> Self {
        Self {
            id: id.to_string(),
            row,
            col,
            height: 1,
            width: 1,
            pass_through: false,
        }
    }

    pub fn sized(mut self, height: usize, width: usize) -> Self {
        self.height = height;
        self.width = width;
        self
    }

    pub fn pass_through(mut self) -> Self {
        self.pass_through = true;
        self
    }

    pub fn cells(&self) -> CellRect {
        CellRect::new(self.row, self.col, self.height, self.width)
    }
}

/// One end of a connection: a block, optionally narrowed to a sub-block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EndpointFile")]
pub struct Endpoint {
    pub block: String,
    /// Sub-block cells, relative to the block's top-left cell.
    pub cells: Option<CellRect>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EndpointFile {
    Block(String),
    Detailed {
        block: String,
        #[serde(default)]
        cells: Option<CellRect>,
    },
}

impl From<EndpointFile> for Endpoint {
    fn from(file: EndpointFile) -> Self {
        match file {
            EndpointFile::Block(block) => Endpoint { block, cells: None },
            EndpointFile::Detailed { block, cells } => Endpoint { block, cells },
        }
    }
}

impl Endpoint {
    pub fn block(id: &str) -> Self {
        Self {
            block: id.to_string(),
            cells: None,
        }
    }

    pub fn sub_block(id: &str, cells: CellRect) -> Self {
        Self {
            block: id.to_string(),
            cells: Some(cells),
        }
    }

    /// Absolute cells covered by this endpoint.
    pub fn resolve(&self, block: &Block) -> CellRect {
        match self.cells {
            Some(sub) => CellRect::new(
                block.row.saturating_add(sub.row),
                block.col.saturating_add(sub.col),
                sub.height,
                sub.width,
            ),
            None => block.cells(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOrientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    #[serde(default)]
    pub orientation: LabelOrientation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub exits: Vec<Side>,
    #[serde(default)]
    pub entrances: Vec<Side>,
    #[serde(default)]
    pub label: Option<Label>,
}

impl Connection {
    pub fn new(id: &str, from: &str, to: &str) -> Self {
        Self {
            id: id.to_string(),
            from: Endpoint::block(from),
            to: Endpoint::block(to),
            group: None,
            exits: Vec::new(),
            entrances: Vec::new(),
            label: None,
        }
    }

    pub fn exits(mut self, sides: &[Side]) -> Self {
        self.exits = sides.to_vec();
        self
    }

    pub fn entrances(mut self, sides: &[Side]) -> Self {
        self.entrances = sides.to_vec();
        self
    }

    pub fn group(mut self, name: &str) -> Self {
        self.group = Some(name.to_string());
        self
    }

    pub fn label(mut self, text: &str, orientation: LabelOrientation) -> Self {
        self.label = Some(Label {
            text: text.to_string(),
            orientation,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConnectionId(pub usize);

/// Immutable diagram snapshot consumed by the layout engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    /// Cell rows; derived from the blocks when omitted.
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub cols: Option<usize>,
    /// Same-group connections share one network (and its drawing lanes).
    #[serde(default)]
    pub collapse_connections: bool,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    #[error("block {0} is declared more than once")]
    DuplicateBlock(String),
    #[error("connection {0} is declared more than once")]
    DuplicateConnection(String),
    #[error("block {0} has an empty cell rectangle")]
    EmptyBlock(String),
    #[error("block {id} does not fit the {rows}x{cols} diagram")]
    BlockOutOfBounds { id: String, rows: usize, cols: usize },
    #[error("connection {connection} references unknown block {block}")]
    UnknownBlock { connection: String, block: String },
    #[error("connection {connection} uses a sub-block outside block {block}")]
    SubBlockOutOfBounds { connection: String, block: String },
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn block_index(&self, id: &str) -> Option<BlockId> {
        self.blocks.iter().position(|block| block.id == id).map(BlockId)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn connection(&self, id: ConnectionId) -> &Connection {
        &self.connections[id.0]
    }

    /// Diagram size in cells as `(rows, cols)`.
    pub fn size(&self) -> (usize, usize) {
        let rows = self
            .rows
            .unwrap_or_else(|| self.blocks.iter().map(|b| b.cells().bottom()).max().unwrap_or(0));
        let cols = self
            .cols
            .unwrap_or_else(|| self.blocks.iter().map(|b| b.cells().right()).max().unwrap_or(0));
        (rows, cols)
    }

    pub fn validate(&self) -> Result<(), DiagramError> {
        let (rows, cols) = self.size();
        let mut seen = HashSet::new();
        for block in &self.blocks {
            if !seen.insert(block.id.as_str()) {
                return Err(DiagramError::DuplicateBlock(block.id.clone()));
            }
            if block.height == 0 || block.width == 0 {
                return Err(DiagramError::EmptyBlock(block.id.clone()));
            }
            let cells = block.cells();
            if cells.bottom() > rows || cells.right() > cols {
                return Err(DiagramError::BlockOutOfBounds {
                    id: block.id.clone(),
                    rows,
                    cols,
                });
            }
        }

        let mut seen = HashSet::new();
        for conn in &self.connections {
            if !seen.insert(conn.id.as_str()) {
                return Err(DiagramError::DuplicateConnection(conn.id.clone()));
            }
            for endpoint in [&conn.from, &conn.to] {
                let Some(id) = self.block_index(&endpoint.block) else {
                    return Err(DiagramError::UnknownBlock {
                        connection: conn.id.clone(),
                        block: endpoint.block.clone(),
                    });
                };
                let block = self.block(id);
                // sub-block cells are relative to the block
                let fits = endpoint.cells.is_none_or(|sub| {
                    sub.area() > 0 && sub.bottom() <= block.height && sub.right() <= block.width
                });
                if !fits {
                    return Err(DiagramError::SubBlockOutOfBounds {
                        connection: conn.id.clone(),
                        block: endpoint.block.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Reads a diagram snapshot from JSON, falling back to JSON5 for hand-written files.
pub fn load_diagram(path: &Path) -> anyhow::Result<Diagram> {
    let contents = std::fs::read_to_string(path)?;
    parse_diagram(&contents)
}

pub fn parse_diagram(contents: &str) -> anyhow::Result<Diagram> {
    match serde_json::from_str::<Diagram>(contents) {
        Ok(diagram) => Ok(diagram),
        Err(json_err) => json5::from_str::<Diagram>(contents).map_err(|json5_err| {
            anyhow::anyhow!("invalid diagram: {json_err} (json5: {json5_err})")
        }),
    }
}
