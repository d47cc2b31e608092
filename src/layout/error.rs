use thiserror::Error;

use crate::ir::DiagramError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Diagram(#[from] DiagramError),
    #[error("a {rows}x{cols} routing grid exceeds the limit of {limit} points")]
    GridTooLarge { rows: usize, cols: usize, limit: usize },
}
