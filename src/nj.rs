//! Neighbor-Joining (Saitou & Nei 1987).
//!
//! The working state is a list of active clusters and a distance matrix
//! over exactly those clusters. Every join rebuilds the matrix one row
//! smaller: the two joined rows are dropped, the survivors keep their
//! relative order and the new cluster is appended last.
//!
//! Joining stops at three clusters (or two, for two taxa), which become
//! the top-level subtrees of the unrooted result.

use std::collections::HashSet;

use log::debug;

use crate::error::{GstarError, Result};
use crate::matrix::DistanceMatrix;
use crate::tree::{Node, NodeId, Tree};

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Reconstruct an unrooted tree from pairwise distances.
///
/// `labels[i]` names row `i` of `dists`.
///
/// Among pairs with the same minimal `Q`, the last one in a row-major scan
/// of the lower triangle (`j < i`) is joined.
///
/// # Errors
/// - [`GstarError::Precondition`] for fewer than two labels, an asymmetric
///   matrix or a non-zero diagonal.
/// - [`GstarError::Dimension`] if the matrix size differs from the label count.
/// - [`GstarError::DuplicateLabel`] if a label repeats.
///
/// # Example
/// ```
/// # use rust_python_gstar::matrix::DistanceMatrix;
/// # use rust_python_gstar::nj::neighbor_join;
/// let dists = DistanceMatrix::from_rows(vec![
///     vec![0.0, 1.0, 1.0],
///     vec![1.0, 0.0, 1.0],
///     vec![1.0, 1.0, 0.0],
/// ]).unwrap();
/// let labels = ["a", "b", "c"].map(String::from);
/// let tree = neighbor_join(&dists, &labels).unwrap();
/// assert_eq!(tree.to_string(), "(a:0.5,b:0.5,c:0.5);");
/// ```
pub fn neighbor_join(dists: &DistanceMatrix, labels: &[String]) -> Result<Tree> {
    validate(dists, labels)?;

    let mut nodes: Vec<Node> = labels.iter().map(|label| Node::leaf(label.as_str(), 0.0)).collect();
    let mut active: Vec<NodeId> = (0..labels.len()).collect();
    let mut d = dists.clone();

    while active.len() > 3 {
        let n = active.len();
        let r: Vec<f64> = (0..n).map(|i| d.row_sum(i)).collect();

        let mut best: Option<(f64, usize, usize)> = None;
        for i in 0..n {
            for j in 0..i {
                let q = (n - 2) as f64 * d.get(i, j) - r[i] - r[j];
                if best.is_none_or(|(min, _, _)| q <= min) {
                    best = Some((q, i, j));
                }
            }
        }
        let Some((_, i, j)) = best else {
            break;
        };

        let dij = d.get(i, j);
        let wi = 0.5 * dij + (r[i] - r[j]) / (2.0 * (n - 2) as f64);
        let wj = dij - wi;
        let (ci, cj) = (active[i], active[j]);
        nodes[ci].weight = wi;
        nodes[cj].weight = wj;

        let joined = nodes.len();
        nodes.push(Node::internal(ci, cj, 0.0));
        nodes[ci].parent = Some(joined);
        nodes[cj].parent = Some(joined);

        let keep: Vec<usize> = (0..n).filter(|&k| k != i && k != j).collect();
        let mut next = DistanceMatrix::zeros(n - 1);
        for (x, &kx) in keep.iter().enumerate() {
            for (y, &ky) in keep.iter().enumerate() {
                next.set(x, y, d.get(kx, ky));
            }
            next.set_symmetric(x, n - 2, 0.5 * (d.get(kx, i) + d.get(kx, j) - dij));
        }

        active = keep.iter().map(|&k| active[k]).chain([joined]).collect();
        d = next;
    }

    if let &[x, y, z] = active.as_slice() {
        nodes[x].weight = 0.5 * (d.get(0, 1) + d.get(0, 2) - d.get(1, 2));
        nodes[y].weight = 0.5 * (d.get(1, 0) + d.get(1, 2) - d.get(0, 2));
        nodes[z].weight = 0.5 * (d.get(2, 0) + d.get(2, 1) - d.get(0, 1));
    } else if let &[x, y] = active.as_slice() {
        nodes[x].weight = d.get(0, 1) / 2.0;
        nodes[y].weight = d.get(0, 1) / 2.0;
    }

    debug!("joined {} taxa with {} internal nodes", labels.len(), nodes.len() - labels.len());
    Ok(Tree::flatten(&nodes, &active))
}

fn validate(dists: &DistanceMatrix, labels: &[String]) -> Result<()> {
    if labels.len() < 2 {
        return Err(GstarError::Precondition(format!(
            "neighbor joining needs at least 2 taxa, got {}",
            labels.len()
        )));
    }
    if dists.size() != labels.len() {
        return Err(GstarError::Dimension {
            rows: dists.size(),
            cols: dists.size(),
            labels: labels.len(),
        });
    }
    if let Some((i, j)) = dists.asymmetry(SYMMETRY_TOLERANCE) {
        return Err(GstarError::Precondition(format!(
            "distance matrix is not symmetric at ({i}, {j})"
        )));
    }
    if let Some(i) = dists.nonzero_diagonal(SYMMETRY_TOLERANCE) {
        return Err(GstarError::Precondition(format!(
            "distance matrix has a non-zero diagonal at {i}"
        )));
    }
    let mut seen = HashSet::with_capacity(labels.len());
    if let Some(dup) = labels.iter().find(|label| !seen.insert(label.as_str())) {
        return Err(GstarError::DuplicateLabel(dup.clone()));
    }
    Ok(())
}
