//! Leaf label ↔ matrix index mapping.
//!
//! # Why one shared map
//! Distance matrices computed from different gene trees are only
//! comparable entry by entry if the same taxon lands on the same row in
//! every matrix. A [`LabelMap`] is therefore built once, from a reference
//! tree, and handed to every subsequent
//! [`Tree::distance_matrix`](crate::tree::Tree::distance_matrix) call.
//!
//! ```text
//! reference tree leaves (arena order): e, a, k, b, c
//! LabelMap:  e→0  a→1  k→2  b→3  c→4
//! ```

use std::collections::HashMap;

/// Bijection between leaf labels and dense indices `0..len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelMap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            labels: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the index of `label`, assigning the next free one if new.
    pub fn get_or_insert(&mut self, label: &str) -> usize {
        if let Some(&idx) = self.index.get(label) {
            return idx;
        }
        let idx = self.labels.len();
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), idx);
        idx
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Labels ordered by index (the inverted map).
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for LabelMap {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut map = LabelMap::default();
        for label in iter {
            map.get_or_insert(label.as_ref());
        }
        map
    }
}
