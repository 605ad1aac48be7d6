//! Newick parsing into a parse-order node arena.
//!
//! # Overview
//! The parser walks the string once with an explicit stack of open
//! subtrees and emits every node into a `Vec<Node>` in creation order.
//! It does not try to produce a traversal-friendly layout; that is the
//! job of [`Tree::flatten`](crate::tree::Tree::flatten), which copies the
//! reachable nodes breadth-first into the arena the rest of the crate uses.
//!
//! # Unrooted top
//! The rest of the system works on an unrooted representation: two or
//! three top-level subtrees joined at an implicit centre. The outermost
//! parenthesised group is therefore never materialised as a node; its
//! members become the forest directly.
//!
//! ```text
//! ((a,b),(c,d));   →  forest [ (a,b), (c,d) ]
//! (a,b,(c,d));     →  forest [ a, b, (c,d) ]
//! ```

use std::collections::HashSet;

use log::debug;

use crate::error::{GstarError, Result};
use crate::tree::{Node, NodeId};

/// Branch length given to a node written without `:weight`.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Raw parser output: nodes in creation order plus the top-level subtrees.
#[derive(Debug, Clone)]
pub struct ParsedForest {
    pub nodes: Vec<Node>,
    pub forest: Vec<NodeId>,
}

impl ParsedForest {
    /// Number of nodes in the arena (leaves + internal, no synthetic root).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Parse one Newick string (one tree, terminated by `;`).
///
/// # Errors
/// - [`GstarError::Parse`] on unexpected characters, unbalanced or
///   unterminated subtrees, non-binary inner subtrees, a missing `;`, or a
///   top level of other than 2 or 3 subtrees.
/// - [`GstarError::DuplicateLabel`] if a leaf label repeats.
pub fn parse(newick: &str) -> Result<ParsedForest> {
    NewickParser::new(newick).run()
}

/// Upper bound on the number of nodes in `newick`, used to size the arena.
///
/// Every `,` introduces a leaf beyond the first and every `)` closes a
/// subtree; the outermost `)` is the contracted root.
pub fn scan_nodes(newick: &str) -> usize {
    let separators = newick
        .bytes()
        .filter(|b| matches!(b, b',' | b')'))
        .count();
    separators.max(1)
}

/// What a following `:weight` or label binds to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Nothing,
    Node(NodeId),
    /// The outermost group just closed; its weight/label are dropped.
    Root,
}

struct NewickParser<'a> {
    bytes: &'a [u8],
    pos: usize,
    nodes: Vec<Node>,
    labels: HashSet<String>,
}

impl<'a> NewickParser<'a> {
    fn new(newick: &'a str) -> Self {
        Self {
            bytes: newick.as_bytes(),
            pos: 0,
            nodes: Vec::with_capacity(scan_nodes(newick)),
            labels: HashSet::new(),
        }
    }

    fn run(mut self) -> Result<ParsedForest> {
        // members collected so far for every open '(' (innermost last)
        let mut open: Vec<Vec<NodeId>> = Vec::new();
        let mut top_level: Vec<NodeId> = Vec::new();
        let mut outer: Option<Vec<NodeId>> = None;
        let mut pending = Pending::Nothing;

        loop {
            self.skip_whitespace();
            let Some(byte) = self.peek() else {
                return Err(self.error("missing terminating ';'"));
            };

            match byte {
                b'(' => {
                    if pending != Pending::Nothing || outer.is_some() {
                        return Err(self.error("unexpected '('"));
                    }
                    open.push(Vec::new());
                    self.pos += 1;
                }
                b',' => {
                    let Pending::Node(node) = pending else {
                        return Err(self.error("unexpected ','"));
                    };
                    match open.last_mut() {
                        Some(members) => members.push(node),
                        None => top_level.push(node),
                    }
                    pending = Pending::Nothing;
                    self.pos += 1;
                }
                b')' => {
                    let Pending::Node(node) = pending else {
                        return Err(self.error("empty subtree before ')'"));
                    };
                    let Some(mut members) = open.pop() else {
                        return Err(self.error("unbalanced ')'"));
                    };
                    members.push(node);

                    if open.is_empty() && top_level.is_empty() {
                        if !(2..=3).contains(&members.len()) {
                            return Err(self.error(format!(
                                "expected 2 or 3 top-level subtrees, found {}",
                                members.len()
                            )));
                        }
                        outer = Some(members);
                        pending = Pending::Root;
                    } else {
                        pending = Pending::Node(self.join(&members)?);
                    }
                    self.pos += 1;
                }
                b':' => {
                    self.pos += 1;
                    let weight = self.parse_weight()?;
                    match pending {
                        Pending::Node(node) => self.nodes[node].weight = weight,
                        Pending::Root => {}
                        Pending::Nothing => {
                            return Err(self.error("branch length without a subtree"));
                        }
                    }
                }
                b';' => {
                    self.pos += 1;
                    break;
                }
                b if is_label_byte(b) => {
                    let start = self.pos;
                    let label = self.parse_label();
                    match pending {
                        Pending::Nothing => {
                            pending = Pending::Node(self.push_leaf(label, start)?);
                        }
                        // internal node labels (support values etc.) carry no meaning here
                        Pending::Node(node) if self.nodes[node].is_internal() => {}
                        Pending::Root => {}
                        Pending::Node(_) => {
                            return Err(GstarError::parse(start, "unexpected label"));
                        }
                    }
                }
                other => {
                    return Err(self.error(format!("unexpected character '{}'", other as char)));
                }
            }
        }

        if !open.is_empty() {
            return Err(self.error("unterminated subtree"));
        }
        self.skip_whitespace();
        if self.pos < self.bytes.len() {
            return Err(self.error("trailing characters after ';'"));
        }

        let forest = match (outer, pending) {
            (Some(members), _) => members,
            (None, Pending::Node(node)) => {
                top_level.push(node);
                top_level
            }
            (None, _) => top_level,
        };
        if !(2..=3).contains(&forest.len()) {
            return Err(self.error(format!(
                "expected 2 or 3 top-level subtrees, found {}",
                forest.len()
            )));
        }

        debug!(
            "parsed {} nodes into {} top-level subtrees",
            self.nodes.len(),
            forest.len()
        );
        Ok(ParsedForest {
            nodes: self.nodes,
            forest,
        })
    }

    fn push_leaf(&mut self, label: String, start: usize) -> Result<NodeId> {
        if !self.labels.insert(label.clone()) {
            debug!("duplicate label '{label}' at position {start}");
            return Err(GstarError::DuplicateLabel(label));
        }
        let id = self.nodes.len();
        self.nodes.push(Node::leaf(label, DEFAULT_WEIGHT));
        Ok(id)
    }

    /// Create the common parent of a closed inner subtree.
    fn join(&mut self, members: &[NodeId]) -> Result<NodeId> {
        let &[left, right] = members else {
            return Err(self.error(format!(
                "expected 2 members in subtree, found {}",
                members.len()
            )));
        };
        let id = self.nodes.len();
        self.nodes.push(Node::internal(left, right, DEFAULT_WEIGHT));
        self.nodes[left].parent = Some(id);
        self.nodes[right].parent = Some(id);
        Ok(id)
    }

    fn parse_label(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_label_byte) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }

    fn parse_weight(&mut self) -> Result<f64> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(is_weight_byte) {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]);
        text.parse::<f64>()
            .map_err(|_| GstarError::parse(start, format!("invalid branch length '{text}'")))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> GstarError {
        GstarError::parse(self.pos, message)
    }
}

fn is_label_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_weight_byte(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')
}
