//! STAR consensus: average leaf-pair distances over gene trees, then NJ.

use log::debug;

use crate::error::{GstarError, Result};
use crate::labels::LabelMap;
use crate::matrix::DistanceMatrix;
use crate::nj::neighbor_join;
use crate::schedule::Schedule;
use crate::tree::Tree;

/// A set of gene trees over one shared leaf set.
///
/// The label map comes from the first tree and is reused for every
/// distance matrix, so that row `i` names the same taxon in all of them.
#[derive(Debug, Clone)]
pub struct Star {
    trees: Vec<Tree>,
    label_map: LabelMap,
}

impl Star {
    /// # Errors
    /// - [`GstarError::NoTrees`] if `trees` is empty.
    /// - [`GstarError::LabelNotFound`] if a tree's leaf set differs from the
    ///   first tree's.
    pub fn new(trees: Vec<Tree>) -> Result<Self> {
        let first = trees.first().ok_or(GstarError::NoTrees)?;
        let label_map = first.make_label_map();

        for tree in &trees[1..] {
            if let Some(extra) = tree.labels().find(|label| !label_map.contains(label)) {
                return Err(GstarError::LabelNotFound(extra.to_string()));
            }
            if tree.leaf_count() != label_map.len() {
                let missing = label_map
                    .labels()
                    .iter()
                    .find(|label| tree.find_leaf(label).is_none())
                    .cloned()
                    .unwrap_or_default();
                return Err(GstarError::LabelNotFound(missing));
            }
        }

        debug!("STAR over {} trees, {} taxa", trees.len(), label_map.len());
        Ok(Self { trees, label_map })
    }

    /// Parse every string and build the consensus input.
    pub fn from_newick<S: AsRef<str>>(newicks: &[S]) -> Result<Self> {
        let trees = newicks
            .iter()
            .map(|s| Tree::from_newick(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(trees)
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    /// Greatest number of levels over the gene trees.
    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(Tree::max_depth).max().unwrap_or(0)
    }

    /// Entrywise mean of the gene trees' distance matrices.
    pub fn average_distances(&self) -> Result<DistanceMatrix> {
        average_distances(&self.trees, &self.label_map)
    }

    /// NJ tree on the averaged distances, as the trees are currently weighted.
    pub fn species_tree(&self) -> Result<Tree> {
        neighbor_join(&self.average_distances()?, self.label_map.labels())
    }

    /// Copies of the gene trees with branch lengths taken from `schedule`,
    /// sharing this label map.
    pub fn reweighted(&self, schedule: &Schedule) -> Star {
        let trees = self
            .trees
            .iter()
            .map(|tree| {
                let mut tree = tree.clone();
                tree.set_weights(schedule);
                tree
            })
            .collect();
        Star {
            trees,
            label_map: self.label_map.clone(),
        }
    }
}

/// STAR species tree for `trees`, with the label map of the first tree.
///
/// # Example
/// ```
/// # use rust_python_gstar::star::star_tree;
/// # use rust_python_gstar::tree::Tree;
/// let tree = Tree::from_newick("(a:1.0,b:1.0);").unwrap();
/// let mut species = star_tree(&[tree]).unwrap();
/// assert_eq!(species.sort().to_string(), "(a:1.0,b:1.0);");
/// ```
pub fn star_tree(trees: &[Tree]) -> Result<Tree> {
    Star::new(trees.to_vec())?.species_tree()
}

fn average_distances(trees: &[Tree], labels: &LabelMap) -> Result<DistanceMatrix> {
    if trees.is_empty() {
        return Err(GstarError::NoTrees);
    }
    let mut sum = DistanceMatrix::zeros(labels.len());
    for tree in trees {
        sum.add_assign(&tree.distance_matrix(labels)?)?;
    }
    sum.divide(trees.len() as f64);
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tree_identity() {
        for newick in [
            "(a:1.0,b:1.0);",
            "((a:1.0,b:1.0):1.0,(c:1.0,d:1.0):1.0);",
            "((a:1.0,b:1.0):1.0,(c:1.0,(d:1.0,e:1.0):1.0):1.0);",
        ] {
            let tree = Tree::from_newick(newick).unwrap();
            let species = star_tree(&[tree.clone()]).unwrap();
            let labels = tree.make_label_map();
            let expected = tree.distance_matrix(&labels).unwrap();
            let got = species.distance_matrix(&labels).unwrap();
            for (row_e, row_g) in expected.rows().zip(got.rows()) {
                for (e, g) in row_e.iter().zip(row_g) {
                    assert!((e - g).abs() < 1e-9, "{newick}: {e} vs {g}");
                }
            }
        }

        let mut species = star_tree(&[Tree::from_newick("(a:1.0,b:1.0);").unwrap()]).unwrap();
        assert_eq!(species.sort().to_string(), "(a:1.0,b:1.0);");
    }

    #[test]
    fn test_identical_trees_keep_topology() {
        let star = Star::from_newick(&["((a,b),(c,(d,e)));", "((e,d),(c,(b,a)));"]).unwrap();
        let mut species = star.species_tree().unwrap();
        assert_eq!(species.canonical("a").unwrap(), "(a,(b,(c,(d,e))));");
    }

    #[test]
    fn test_average_distances() {
        let star = Star::from_newick(&["((a,b),(c,d));", "((a,c),(b,d));"]).unwrap();
        let avg = star.average_distances().unwrap();
        let (a, b, c, d) = (
            star.label_map().get("a").unwrap(),
            star.label_map().get("b").unwrap(),
            star.label_map().get("c").unwrap(),
            star.label_map().get("d").unwrap(),
        );
        assert_eq!(avg.get(a, b), 3.0);
        assert_eq!(avg.get(a, c), 3.0);
        assert_eq!(avg.get(a, d), 4.0);
        assert_eq!(avg.get(c, b), 4.0);
    }

    #[test]
    fn test_reweighted_leaves_inputs_untouched() {
        let star = Star::from_newick(&["((a,((b,c),k)),e);", "((b,((a,c),k)),e);"]).unwrap();
        assert_eq!(star.max_depth(), 4);
        let top_only = star.reweighted(&Schedule::Vector(vec![1.0, 0.0, 0.0, 0.0]));
        assert_eq!(top_only.trees()[0].to_string(), "((a,((b,c),k)):1.0,e:1.0);");
        assert_eq!(star.trees()[0].to_string(), "((a:1.0,((b:1.0,c:1.0):1.0,k:1.0):1.0):1.0,e:1.0);");
        assert_eq!(top_only.label_map(), star.label_map());
    }

    #[test]
    fn test_rejects_mismatched_leaf_sets() {
        assert!(matches!(
            Star::new(Vec::new()),
            Err(GstarError::NoTrees)
        ));
        assert!(matches!(
            Star::from_newick(&["((a,b),(c,d));", "((a,b),(c,x));"]),
            Err(GstarError::LabelNotFound(l)) if l == "x"
        ));
        assert!(matches!(
            Star::from_newick(&["((a,b),(c,d));", "((a,b),c);"]),
            Err(GstarError::LabelNotFound(l)) if l == "d"
        ));
    }
}
