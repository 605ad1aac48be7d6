//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `newick`: Newick parser producing a node arena and the top-level forest.
//! - `tree`: binary tree arena with an unrooted top (distances, weights, re-rooting, sorting).
//! - `labels`, `matrix`: leaf indexing and square distance matrices.
//! - `nj`: Neighbor-Joining reconstruction.
//! - `star`: STAR consensus over gene trees.
//! - `schedule`: depth-indexed branch-weight schedules, exhaustive sweep and Dirichlet sampler.
//! - `gstar`: topology support over many re-weighted STAR runs.
//! - `io`: reading gene tree files, writing schedule logs and support tables.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod error;
pub mod newick;
pub mod tree;
pub mod labels;
pub mod matrix;
pub mod nj;
pub mod star;
pub mod schedule;
pub mod gstar;
pub mod io;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use error::{GstarError, Result};
pub use gstar::{Gstar, Support, gstar};
pub use labels::LabelMap;
pub use matrix::DistanceMatrix;
pub use nj::neighbor_join;
pub use schedule::{Dirichlet, Schedule, Sweep};
pub use star::{Star, star_tree};
pub use tree::{Node, NodeId, Tree};
pub use io::{read_newick_lines, write_support_tsv};
