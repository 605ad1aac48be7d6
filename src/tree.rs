//! Binary tree arena with an unrooted top.
//!
//! # Representation
//! A [`Tree`] owns a flat `Vec<Node>` and an `unroot` list of one to three
//! top-level subtrees. Two or three entries describe an unrooted tree whose
//! centre is implicit (there is no node for it); a single entry is a
//! conventional rooted binary tree.
//!
//! The arena is always laid out breadth-first over `unroot`, left child
//! before right, so a parent's id is smaller than its children's ids. Every
//! operation that rewires edges ends by calling [`Tree::flatten`] to
//! restore that layout.
//!
//! ```text
//! ((a,((b,c),k)),e);
//!
//! arena: 0:(a,Y)  1:e  2:a  3:Y=(Z,k)  4:Z=(b,c)  5:k  6:b  7:c
//! unroot: [0, 1]
//! leaf order (label map): e, a, k, b, c
//! ```
//!
//! # Paths across the centre
//! Two leaves under different top-level subtrees are connected through the
//! implicit centre, so their distance includes the branch lengths of both
//! top-level nodes.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::error::{GstarError, Result};
use crate::labels::LabelMap;
use crate::matrix::DistanceMatrix;
use crate::newick;
use crate::schedule::Schedule;

/// Index of a node inside its tree's arena.
pub type NodeId = usize;

/// One vertex: a labelled leaf or an internal node with exactly two children.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Leaf label; empty for internal nodes.
    pub label: String,
    /// Length of the branch to the parent (or to the centre for top-level nodes).
    pub weight: f64,
    pub children: Option<(NodeId, NodeId)>,
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn leaf(label: impl Into<String>, weight: f64) -> Self {
        Self {
            label: label.into(),
            weight,
            children: None,
            parent: None,
        }
    }

    pub fn internal(left: NodeId, right: NodeId, weight: f64) -> Self {
        Self {
            label: String::new(),
            weight,
            children: Some((left, right)),
            parent: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_internal(&self) -> bool {
        self.children.is_some()
    }
}

/// Node arena plus the top-level subtrees joined at an implicit centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    unroot: Vec<NodeId>,
}

impl Tree {
    /// Parse a Newick string.
    ///
    /// # Example
    /// ```
    /// # use rust_python_gstar::tree::Tree;
    /// let tree = Tree::from_newick("((a,b),(c,d));").unwrap();
    /// assert_eq!(tree.leaf_count(), 4);
    /// assert_eq!(tree.to_string(), "((a:1.0,b:1.0):1.0,(c:1.0,d:1.0):1.0);");
    /// ```
    pub fn from_newick(newick: &str) -> Result<Self> {
        let parsed = newick::parse(newick)?;
        Ok(Self::flatten(&parsed.nodes, &parsed.forest))
    }

    /// Copy every node reachable from `roots` into a fresh breadth-first arena.
    ///
    /// Parent and child references are rewritten to the new ids; nodes not
    /// reachable from `roots` are dropped. The roots' parents are cleared.
    pub fn flatten(nodes: &[Node], roots: &[NodeId]) -> Self {
        let mut arena: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut queue: VecDeque<(NodeId, Option<NodeId>)> =
            roots.iter().map(|&root| (root, None)).collect();

        while let Some((old, parent)) = queue.pop_front() {
            let new = arena.len();
            let node = &nodes[old];
            // a queued node's new id is its position in the queue order
            let children = node.children.map(|(left, right)| {
                let first = new + 1 + queue.len();
                queue.push_back((left, Some(new)));
                queue.push_back((right, Some(new)));
                (first, first + 1)
            });
            arena.push(Node {
                label: node.label.clone(),
                weight: node.weight,
                children,
                parent,
            });
        }

        Self {
            unroot: (0..roots.len()).collect(),
            nodes: arena,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Top-level subtrees.
    pub fn unroot(&self) -> &[NodeId] {
        &self.unroot
    }

    /// A single top-level subtree, i.e. a conventional rooted tree.
    pub fn is_rooted(&self) -> bool {
        self.unroot.len() == 1
    }

    /// Three top-level subtrees: unrooted, with no edge marking a root.
    pub fn is_trifurcating(&self) -> bool {
        self.unroot.len() == 3
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(|&id| self.nodes[id].is_leaf())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Leaf labels in arena order.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.leaves().map(|id| self.nodes[id].label.as_str())
    }

    pub fn find_leaf(&self, label: &str) -> Option<NodeId> {
        self.leaves().find(|&id| self.nodes[id].label == label)
    }

    /// Depth of every node; top-level subtrees are at depth 0.
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                depths[id] = depths[parent] + 1;
            }
        }
        depths
    }

    /// Number of levels: the greatest leaf depth plus one.
    pub fn max_depth(&self) -> usize {
        let depths = self.depths();
        self.leaves().map(|id| depths[id] + 1).max().unwrap_or(0)
    }

    /// First leaf, in arena order, among those at the greatest depth.
    pub fn deepest_leaf(&self) -> Option<&str> {
        let depths = self.depths();
        let mut best: Option<NodeId> = None;
        for id in self.leaves() {
            if best.is_none_or(|b| depths[id] > depths[b]) {
                best = Some(id);
            }
        }
        best.map(|id| self.nodes[id].label.as_str())
    }

    /// Assign dense indices to the leaves in arena order.
    ///
    /// Build this once from a reference tree and pass it to
    /// [`distance_matrix`](Self::distance_matrix) for every tree that has to
    /// be compared entry by entry.
    pub fn make_label_map(&self) -> LabelMap {
        self.labels().collect()
    }

    /// Path-length distances between all leaf pairs, indexed by `labels`.
    ///
    /// # Errors
    /// [`GstarError::LabelNotFound`] if a leaf of this tree is missing from
    /// `labels`, or a label of `labels` is not a leaf of this tree.
    pub fn distance_matrix(&self, labels: &LabelMap) -> Result<DistanceMatrix> {
        let mut indexed = Vec::with_capacity(labels.len());
        for leaf in self.leaves() {
            let label = &self.nodes[leaf].label;
            let idx = labels
                .get(label)
                .ok_or_else(|| GstarError::LabelNotFound(label.clone()))?;
            indexed.push((leaf, idx));
        }
        if indexed.len() != labels.len() {
            let missing = labels
                .labels()
                .iter()
                .find(|label| self.find_leaf(label).is_none())
                .cloned()
                .unwrap_or_default();
            return Err(GstarError::LabelNotFound(missing));
        }

        let depths = self.depths();
        let mut matrix = DistanceMatrix::zeros(labels.len());
        for (&(a, i), &(b, j)) in indexed.iter().tuple_combinations() {
            matrix.set_symmetric(i, j, self.path_length(&depths, a, b));
        }
        Ok(matrix)
    }

    /// Sum of branch lengths between `a` and `b`, climbing both parent
    /// chains until they meet or reach two different top-level nodes.
    fn path_length(&self, depths: &[usize], a: NodeId, b: NodeId) -> f64 {
        let (mut x, mut y) = (a, b);
        let (mut up_x, mut up_y) = (0.0, 0.0);
        while depths[x] > depths[y] {
            up_x += self.nodes[x].weight;
            x = self.nodes[x].parent.unwrap_or(x);
        }
        while depths[y] > depths[x] {
            up_y += self.nodes[y].weight;
            y = self.nodes[y].parent.unwrap_or(y);
        }
        while x != y {
            up_x += self.nodes[x].weight;
            up_y += self.nodes[y].weight;
            match (self.nodes[x].parent, self.nodes[y].parent) {
                (Some(px), Some(py)) => {
                    x = px;
                    y = py;
                }
                // distinct top-level subtrees, joined through the centre
                _ => break,
            }
        }
        up_x + up_y
    }

    /// Overwrite every branch length from a depth-indexed schedule.
    ///
    /// An internal node at depth `d` gets `s(d)`. A leaf at depth `d` gets
    /// `max - (s(0) + .. + s(d-1))`, where `max` sums the schedule down to
    /// the deepest leaf, so every leaf ends up at distance `max` from the
    /// centre.
    pub fn set_weights(&mut self, schedule: &Schedule) -> &mut Self {
        let depths = self.depths();
        let deepest = self
            .leaves()
            .map(|id| depths[id])
            .max()
            .unwrap_or(0);

        // prefix[d] = s(0) + .. + s(d-1)
        let mut prefix = Vec::with_capacity(deepest + 2);
        prefix.push(0.0);
        for d in 0..=deepest {
            prefix.push(prefix[d] + schedule.weight_at(d));
        }
        let max = prefix[deepest + 1];

        for (node, &depth) in self.nodes.iter_mut().zip(&depths) {
            node.weight = if node.is_internal() {
                schedule.weight_at(depth)
            } else {
                max - prefix[depth]
            };
        }
        self
    }

    /// Re-root so that the leaf `label` is one arm of a two-way top.
    ///
    /// The edges on the path from the leaf to its top-level ancestor are
    /// reversed. The leaf keeps its branch length, the complementary subtree
    /// gets length 0, and a leaf that already is one arm of a two-way top is
    /// left untouched.
    ///
    /// ```text
    /// ((a,b),(c,d));  outgroup c  →  (c,((a,b),d));
    /// ```
    ///
    /// # Errors
    /// [`GstarError::LabelNotFound`] if no leaf carries `label`.
    pub fn set_outgroup(&mut self, label: &str) -> Result<&mut Self> {
        let leaf = self
            .find_leaf(label)
            .ok_or_else(|| GstarError::LabelNotFound(label.to_string()))?;

        if let &[root] = self.unroot.as_slice() {
            self.contract_root(root);
        }

        let mut path = vec![leaf];
        while let Some(parent) = self.nodes[path[path.len() - 1]].parent {
            path.push(parent);
        }
        let top = path[path.len() - 1];
        let others: Vec<NodeId> = self.unroot.iter().copied().filter(|&t| t != top).collect();

        if others.len() > 2 {
            return Err(GstarError::Precondition(format!(
                "cannot re-root a top of {} subtrees",
                self.unroot.len()
            )));
        }

        if path.len() == 1 {
            if let &[first, second] = others.as_slice() {
                let joint = self.push_internal(first, second, 0.0);
                self.unroot = vec![leaf, joint];
                *self = Self::flatten(&self.nodes, &self.unroot);
            }
            return Ok(self);
        }

        // everything hanging off the centre except `top`, as one subtree
        let top_weight = self.nodes[top].weight;
        let outside = match *others.as_slice() {
            [first, second] => self.push_internal(first, second, top_weight),
            [other] => {
                self.nodes[other].weight += top_weight;
                other
            }
            _ => {
                return Err(GstarError::Precondition(
                    "cannot re-root a tree without a binary root".to_string(),
                ));
            }
        };

        let old_weights: Vec<f64> = path.iter().map(|&id| self.nodes[id].weight).collect();
        let k = path.len() - 1;
        for i in (1..=k).rev() {
            let node = path[i];
            let below = path[i - 1];
            let replacement = if i == k { outside } else { path[i + 1] };
            if let Some((left, right)) = self.nodes[node].children.as_mut() {
                if *left == below {
                    *left = replacement;
                } else {
                    *right = replacement;
                }
            }
            self.nodes[replacement].parent = Some(node);
            if i >= 2 {
                self.nodes[node].parent = Some(below);
                self.nodes[node].weight = old_weights[i - 1];
            }
        }

        let pivot = path[1];
        self.nodes[pivot].parent = None;
        self.nodes[pivot].weight = 0.0;
        self.nodes[leaf].parent = None;
        self.unroot = vec![leaf, pivot];
        *self = Self::flatten(&self.nodes, &self.unroot);
        Ok(self)
    }

    /// Replace a single root by its two children.
    fn contract_root(&mut self, root: NodeId) {
        if let Some((left, right)) = self.nodes[root].children {
            self.nodes[left].parent = None;
            self.nodes[right].parent = None;
            self.unroot = vec![left, right];
        }
    }

    fn push_internal(&mut self, left: NodeId, right: NodeId, weight: f64) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::internal(left, right, weight));
        self.nodes[left].parent = Some(id);
        self.nodes[right].parent = Some(id);
        id
    }

    /// Canonical sibling order: at every internal node the child whose
    /// subtree holds the smaller leaf label comes first, and the top-level
    /// subtrees are ordered the same way.
    pub fn sort(&mut self) -> &mut Self {
        // children have larger ids than parents, so a reverse scan is post-order
        let mut min_leaf: Vec<NodeId> = (0..self.nodes.len()).collect();
        for id in (0..self.nodes.len()).rev() {
            let Some((left, right)) = self.nodes[id].children else {
                continue;
            };
            let (min_left, min_right) = (min_leaf[left], min_leaf[right]);
            if self.nodes[min_right].label < self.nodes[min_left].label {
                self.nodes[id].children = Some((right, left));
                min_leaf[id] = min_right;
            } else {
                min_leaf[id] = min_left;
            }
        }

        let nodes = &self.nodes;
        self.unroot
            .sort_by(|&a, &b| nodes[min_leaf[a]].label.cmp(&nodes[min_leaf[b]].label));
        *self = Self::flatten(&self.nodes, &self.unroot);
        self
    }

    /// Set every branch length to 0 so only the topology is printed.
    pub fn clear_weights(&mut self) -> &mut Self {
        for node in &mut self.nodes {
            node.weight = 0.0;
        }
        self
    }

    /// Topology string used to tally GSTAR trials.
    pub fn canonical(&mut self, outgroup: &str) -> Result<String> {
        Ok(self.set_outgroup(outgroup)?.sort().clear_weights().to_string())
    }

    fn write_subtree(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let node = &self.nodes[id];
        match node.children {
            Some((left, right)) => {
                write!(f, "(")?;
                self.write_subtree(f, left)?;
                write!(f, ",")?;
                self.write_subtree(f, right)?;
                write!(f, ")")?;
            }
            None => write!(f, "{}", node.label)?,
        }
        if node.weight != 0.0 {
            write!(f, ":{:?}", node.weight)?;
        }
        Ok(())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let &[root] = self.unroot.as_slice() {
            self.write_subtree(f, root)?;
            return write!(f, ";");
        }
        write!(f, "(")?;
        for (i, &top) in self.unroot.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            self.write_subtree(f, top)?;
        }
        write!(f, ");")
    }
}

impl FromStr for Tree {
    type Err = GstarError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_newick(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn canonical(newick: &str, outgroup: &str) -> String {
        Tree::from_newick(newick).unwrap().canonical(outgroup).unwrap()
    }

    #[test]
    fn test_breadth_first_layout() {
        let tree = Tree::from_newick("((a,((b,c),k)),e);").unwrap();
        assert_eq!(tree.unroot(), &[0, 1]);
        assert_eq!(tree.labels().collect::<Vec<_>>(), vec!["e", "a", "k", "b", "c"]);
        for (id, node) in tree.nodes().iter().enumerate() {
            if let Some(parent) = node.parent {
                assert!(parent < id);
                let (l, r) = tree.node(parent).children.unwrap();
                assert!(l == id || r == id);
            }
        }
        assert_eq!(tree.max_depth(), 4);
        assert_eq!(tree.deepest_leaf(), Some("b"));
    }

    #[test]
    fn test_flatten_drops_unreachable_nodes() {
        let mut nodes = vec![
            Node::leaf("a", 1.0),
            Node::leaf("b", 2.0),
            Node::leaf("orphan", 3.0),
            Node::internal(0, 1, 0.5),
            Node::leaf("c", 4.0),
        ];
        nodes[0].parent = Some(3);
        nodes[1].parent = Some(3);
        let tree = Tree::flatten(&nodes, &[4, 3]);
        assert_eq!(tree.nodes().len(), 4);
        assert_eq!(tree.to_string(), "(c:4.0,(a:1.0,b:2.0):0.5);");
        assert!(tree.find_leaf("orphan").is_none());
    }

    #[test]
    fn test_display_round_trip() {
        for newick in [
            "(a:1.0,b:1.0);",
            "(a:0.5,b:0.5,(c:0.5,d:0.5):1.5);",
            "((a:1.0,b:2.5):0.25,(c:1.0,(d:1.0,e:1.0):1.0):1.0);",
        ] {
            let tree = Tree::from_newick(newick).unwrap();
            assert_eq!(tree.to_string(), newick);
            let again: Tree = tree.to_string().parse().unwrap();
            assert_eq!(again, tree);
        }
    }

    #[test]
    fn test_output_parses_with_phylotree() {
        let tree = Tree::from_newick("((a:1.0,b:2.5):0.25,(c:1.0,(d:1.0,e:1.0):1.0):1.0);").unwrap();
        let other = phylotree::tree::Tree::from_newick(&tree.to_string()).unwrap();
        assert_eq!(other.n_leaves(), tree.leaf_count());
    }

    #[test]
    fn test_sort() {
        let mut tree = Tree::from_newick("(((e,d),c),(b,a));").unwrap();
        assert_eq!(
            tree.sort().to_string(),
            "((a:1.0,b:1.0):1.0,(c:1.0,(d:1.0,e:1.0):1.0):1.0);"
        );
        assert_eq!(tree.labels().collect::<Vec<_>>(), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_clear_weights() {
        let mut tree = Tree::from_newick("(a:2.0,(b:1.0,c:3.0):1.0);").unwrap();
        assert_eq!(tree.clear_weights().to_string(), "(a,(b,c));");
    }

    #[test]
    fn test_distance_matrix_small() {
        let tree = Tree::from_newick("((a,b),(c,(d,e)));").unwrap();
        let labels: LabelMap = ["a", "b", "c", "d", "e"].into_iter().collect();
        let matrix = tree.distance_matrix(&labels).unwrap();
        assert_eq!(
            matrix.to_rows(),
            vec![
                vec![0.0, 2.0, 4.0, 5.0, 5.0],
                vec![2.0, 0.0, 4.0, 5.0, 5.0],
                vec![4.0, 4.0, 0.0, 3.0, 3.0],
                vec![5.0, 5.0, 3.0, 0.0, 2.0],
                vec![5.0, 5.0, 3.0, 2.0, 0.0],
            ]
        );

        let pair = Tree::from_newick("(a,b);").unwrap();
        let matrix = pair.distance_matrix(&pair.make_label_map()).unwrap();
        assert_eq!(matrix.to_rows(), vec![vec![0.0, 2.0], vec![2.0, 0.0]]);
    }

    #[test]
    fn test_distances_agree_with_phylotree() {
        let newick = "((a:0.5,(b:1.25,c:2.0):0.75):1.5,(d:3.0,(e:0.25,f:1.0):2.5):0.5);";
        let tree = Tree::from_newick(newick).unwrap();
        let oracle = phylotree::tree::Tree::from_newick(newick).unwrap();
        let labels = tree.make_label_map();
        let matrix = tree.distance_matrix(&labels).unwrap();

        for (x, y) in labels.labels().iter().tuple_combinations() {
            let nx = oracle.get_by_name(x).unwrap().id;
            let ny = oracle.get_by_name(y).unwrap().id;
            let (expected, _) = oracle.get_distance(&nx, &ny).unwrap();
            let got = matrix.get(labels.get(x).unwrap(), labels.get(y).unwrap());
            assert!((got - expected.unwrap()).abs() < 1e-9, "{x}-{y}: {got}");
        }
    }

    #[test]
    fn test_distance_matrix_is_symmetric_with_zero_diagonal() {
        for newick in [
            "((a,((b,c),k)),e);",
            "(a:0.5,b:0.5,(c:0.5,d:0.5):1.5);",
            "(((a:0.1,b:0.2):0.3,(c:0.4,d:0.5):0.6):0.7,e:0.8);",
        ] {
            let tree = Tree::from_newick(newick).unwrap();
            let matrix = tree.distance_matrix(&tree.make_label_map()).unwrap();
            assert_eq!(matrix.asymmetry(0.0), None);
            assert_eq!(matrix.nonzero_diagonal(0.0), None);
        }
    }

    #[test]
    fn test_shared_label_map_aligns_rows() {
        let first = Tree::from_newick("((a,b),(c,d));").unwrap();
        let second = Tree::from_newick("((d,c),(b,a));").unwrap();
        let labels = first.make_label_map();
        assert_eq!(
            first.distance_matrix(&labels).unwrap(),
            second.distance_matrix(&labels).unwrap()
        );
    }

    #[test]
    fn test_distance_matrix_label_mismatch() {
        let tree = Tree::from_newick("((a,b),(c,d));").unwrap();
        let fewer: LabelMap = ["a", "b", "c"].into_iter().collect();
        assert!(matches!(
            tree.distance_matrix(&fewer),
            Err(GstarError::LabelNotFound(l)) if l == "d"
        ));
        let more: LabelMap = ["a", "b", "c", "d", "x"].into_iter().collect();
        assert!(matches!(
            tree.distance_matrix(&more),
            Err(GstarError::LabelNotFound(l)) if l == "x"
        ));
    }

    #[test]
    fn test_set_weights_is_ultrametric() {
        let mut tree = Tree::from_newick("((a,((b,c),k)),e);").unwrap();
        let schedule = Schedule::Vector(vec![0.5, 0.25, 2.0, 1.0]);
        tree.set_weights(&schedule);
        // deepest leaf at depth 3: max = 0.5 + 0.25 + 2.0 + 1.0
        let max = 3.75;
        let depths = tree.depths();
        for leaf in tree.leaves().collect::<Vec<_>>() {
            let mut total = 0.0;
            let mut id = leaf;
            loop {
                total += tree.node(id).weight;
                match tree.node(id).parent {
                    Some(parent) => id = parent,
                    None => break,
                }
            }
            assert!((total - max).abs() < 1e-12, "leaf at depth {}", depths[leaf]);
        }
        let e = tree.find_leaf("e").unwrap();
        assert_eq!(tree.node(e).weight, max);
        assert_eq!(tree.node(tree.unroot()[0]).weight, 0.5);
    }

    #[test]
    fn test_set_weights_reads_zero_past_vector_end() {
        let mut tree = Tree::from_newick("((a,(b,c)),d);").unwrap();
        tree.set_weights(&Schedule::Vector(vec![1.0]));
        assert_eq!(tree.to_string(), "((a,(b,c)):1.0,d:1.0);");
        tree.set_weights(&Schedule::Constant(1.0));
        assert_eq!(tree.to_string(), "((a:2.0,(b:1.0,c:1.0):1.0):1.0,d:3.0);");
    }

    #[test]
    fn test_outgroup_each_leaf() {
        let newick = "((a,b),(c,d));";
        assert_eq!(canonical(newick, "a"), "(a,(b,(c,d)));");
        assert_eq!(canonical(newick, "b"), "((a,(c,d)),b);");
        assert_eq!(canonical(newick, "c"), "(((a,b),d),c);");
        assert_eq!(canonical(newick, "d"), "(((a,b),c),d);");
    }

    #[test]
    fn test_outgroup_deep_leaf() {
        assert_eq!(canonical("((a,((b,c),k)),e);", "b"), "((((a,e),k),c),b);");
        assert_eq!(canonical("((a,((b,c),k)),e);", "e"), "((a,((b,c),k)),e);");
    }

    #[test]
    fn test_outgroup_on_trifurcation() {
        assert_eq!(canonical("(a,b,(c,d));", "a"), "(a,(b,(c,d)));");
        assert_eq!(canonical("(a,b,(c,d));", "c"), "(((a,b),d),c);");
        assert_eq!(canonical("((a,b),c,d);", "c"), "(((a,b),d),c);");
    }

    #[test]
    fn test_outgroup_keeps_path_lengths() {
        let mut tree = Tree::from_newick("((a:1.0,b:2.0):3.0,(c:4.0,d:5.0):6.0);").unwrap();
        let labels = tree.make_label_map();
        let before = tree.distance_matrix(&labels).unwrap();
        tree.set_outgroup("b").unwrap();
        assert!(!tree.is_rooted());
        assert_eq!(tree.unroot().len(), 2);
        assert_eq!(tree.node(tree.unroot()[0]).label, "b");
        assert_eq!(tree.distance_matrix(&labels).unwrap(), before);
    }

    #[test]
    fn test_outgroup_on_rooted_tree() {
        let nodes = vec![
            Node::internal(1, 2, 0.0),
            Node { parent: Some(0), ..Node::leaf("a", 1.0) },
            Node { parent: Some(0), ..Node::internal(3, 4, 1.0) },
            Node { parent: Some(2), ..Node::leaf("b", 1.0) },
            Node { parent: Some(2), ..Node::leaf("c", 1.0) },
        ];
        let mut tree = Tree::flatten(&nodes, &[0]);
        assert!(tree.is_rooted());
        assert_eq!(tree.to_string(), "(a:1.0,(b:1.0,c:1.0):1.0);");
        tree.set_outgroup("c").unwrap();
        assert_eq!(tree.sort().clear_weights().to_string(), "((a,b),c);");
    }

    #[test]
    fn test_outgroup_unknown_label() {
        let mut tree = Tree::from_newick("((a,b),(c,d));").unwrap();
        assert!(matches!(
            tree.set_outgroup("z"),
            Err(GstarError::LabelNotFound(l)) if l == "z"
        ));
    }
}
