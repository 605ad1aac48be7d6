//! Error taxonomy shared by every stage of the pipeline.
//!
//! All failures are local and synchronous: parsing and numeric
//! reconstruction are deterministic, so nothing here is retried. The
//! caller (CLI or Python layer) decides how to present them.

use thiserror::Error;

/// Everything that can go wrong between a Newick string and a support table.
#[derive(Debug, Error)]
pub enum GstarError {
    /// Malformed Newick syntax, unterminated input or wrong top-level arity.
    #[error("Invalid newick string at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// The same leaf label appears twice in one tree.
    #[error("Leaf label '{0}' appears more than once in the same tree.")]
    DuplicateLabel(String),

    /// An outgroup or lookup label is absent from a tree's leaf set.
    #[error("There is no leaf labelled '{0}'.")]
    LabelNotFound(String),

    /// Distance matrix not square, or its size disagrees with the labels.
    #[error("Distance matrix is {rows}x{cols} but {labels} labels were given.")]
    Dimension {
        rows: usize,
        cols: usize,
        labels: usize,
    },

    /// Input violates an algorithm precondition (e.g. fewer than 2 taxa).
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// No gene trees were handed to STAR/GSTAR.
    #[error("No gene trees were given.")]
    NoTrees,

    /// An unrooted input tree was given without an outgroup to root the result.
    #[error("Tree {tree} is unrooted and no outgroup was given.")]
    MissingOutgroup { tree: usize },

    /// The per-trial log sink failed.
    #[error("Could not write trial record: {0}")]
    Sink(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GstarError>;

impl GstarError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        GstarError::Parse {
            position,
            message: message.into(),
        }
    }
}
