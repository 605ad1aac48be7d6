//! Python binding layer for STAR / GSTAR.
//!
//! Exposes species-tree estimation and topology support to Python. All
//! library errors surface as `ValueError`.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::error::GstarError;
use crate::gstar::Gstar;
use crate::matrix::DistanceMatrix;
use crate::nj::neighbor_join as nj;
use crate::star::Star;

fn to_py_err(e: GstarError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Topology support of the STAR tree under re-weighted gene trees.
///
/// Args:
///     newick: List of Newick gene trees sharing one leaf set
///     outgroup: Leaf used to root results; required if any tree is unrooted
///         (default: deepest leaf of the first tree)
///     trials: Number of random Dirichlet schedules; 0 runs the exhaustive
///         0/1 sweep (default: 0)
///     seed: Seed for random schedules (default: random)
///
/// Returns:
///     A tuple of (support, perplexity) where:
///     - support is a list of (topology, ratio) pairs, highest ratio first
///     - perplexity is 2 to the entropy of the support distribution
///
/// Raises:
///     ValueError: On malformed Newick, mismatched leaf sets or a missing outgroup
#[pyfunction]
#[pyo3(signature = (newick, outgroup=None, trials=0, seed=None))]
fn gstar(
    newick: Vec<String>,
    outgroup: Option<String>,
    trials: usize,
    seed: Option<u64>,
) -> PyResult<(Vec<(String, f64)>, f64)> {
    let mut run = Gstar::from_newick(&newick, outgroup.as_deref()).map_err(to_py_err)?;
    if let Some(seed) = seed {
        run = run.with_seed(seed);
    }
    let support = run.run(trials, &mut std::io::sink()).map_err(to_py_err)?;
    let perplexity = support.perplexity();
    Ok((support.into_entries(), perplexity))
}

/// STAR species tree of a list of Newick gene trees, in sorted Newick form.
///
/// Raises:
///     ValueError: On malformed Newick or mismatched leaf sets
#[pyfunction]
fn star_tree(newick: Vec<String>) -> PyResult<String> {
    let mut tree = Star::from_newick(&newick)
        .and_then(|star| star.species_tree())
        .map_err(to_py_err)?;
    Ok(tree.sort().to_string())
}

/// Neighbor-Joining tree from a square distance matrix.
///
/// Args:
///     dists: Symmetric matrix with zero diagonal, as a list of rows
///     labels: Taxon name of every row
///
/// Raises:
///     ValueError: If the matrix is malformed or has fewer than 2 taxa
#[pyfunction]
fn neighbor_join(dists: Vec<Vec<f64>>, labels: Vec<String>) -> PyResult<String> {
    let matrix = DistanceMatrix::from_rows(dists).map_err(to_py_err)?;
    let tree = nj(&matrix, &labels).map_err(to_py_err)?;
    Ok(tree.to_string())
}

/// Python module definition
#[pymodule]
fn rust_python_gstar(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(gstar, m)?)?;
    m.add_function(wrap_pyfunction!(star_tree, m)?)?;
    m.add_function(wrap_pyfunction!(neighbor_join, m)?)?;
    Ok(())
}
