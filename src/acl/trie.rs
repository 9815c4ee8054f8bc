//! Binary prefix tree of IPv4 rules.
//!
//! One level per address bit, most-significant bit first: bit 0 goes
//! `left`, bit 1 goes `right`. A rule `a.b.c.d/N` is a terminal node at
//! depth N. Depth never exceeds 32.
//!
//! # Matching priority
//!
//! [`Trie::lookup`] stops at the *first* terminal node on the path. A broader
//! rule therefore shadows every more specific rule nested beneath it: with
//! `10.0.0.0/8` and `10.1.0.0/16` stored, `10.1.2.3` always resolves to the
//! `/8`. This is not "most specific wins".

use std::sync::atomic::{AtomicU64, Ordering};

use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::codec::{self, Ipv4Prefix, MAX_PREFIX_LEN};

#[derive(Debug, Default)]
struct Node {
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
    terminal: bool,
    hits: AtomicU64,
}

impl Node {
    fn child(&self, right: bool) -> Option<&Node> {
        if right {
            self.right.as_deref()
        } else {
            self.left.as_deref()
        }
    }

    fn slot(&mut self, right: bool) -> &mut Option<Box<Node>> {
        if right {
            &mut self.right
        } else {
            &mut self.left
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn hit(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn count(&self) -> usize {
        1 + self.left.as_ref().map_or(0, |n| n.count()) + self.right.as_ref().map_or(0, |n| n.count())
    }
}

/// Bit of `addr` consumed at `depth` (0 = most significant).
fn bit(addr: u32, depth: u8) -> bool {
    (addr >> (MAX_PREFIX_LEN - 1 - depth)) & 1 == 1
}

/// Result of a successful [`Trie::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// The rule that resolved the lookup.
    pub rule: Ipv4Prefix,
    /// Hit count of that rule, including this lookup.
    pub hits: u64,
}

/// One rule as produced by [`Trie::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleEntry {
    pub rule: Ipv4Prefix,
    pub hits: u64,
}

impl Serialize for RuleEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RuleEntry", 3)?;
        s.serialize_field("addr", &codec::format(self.rule.addr()))?;
        s.serialize_field("mask", &self.rule.len())?;
        s.serialize_field("count", &self.hits)?;
        s.end()
    }
}

#[derive(Debug, Default)]
pub struct Trie {
    root: Node,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rule. Returns `true` if it was not already present.
    ///
    /// Re-inserting an existing rule keeps its hit counter.
    pub fn insert(&mut self, prefix: Ipv4Prefix) -> bool {
        let addr = prefix.addr();
        let mut node = &mut self.root;
        for depth in 0..prefix.len() {
            node = &mut **node.slot(bit(addr, depth)).get_or_insert_with(Box::default);
        }
        let added = !node.terminal;
        node.terminal = true;
        added
    }

    /// Remove a rule. Returns `true` if a rule was removed.
    ///
    /// A childless rule node is pruned together with every non-branching,
    /// non-terminal ancestor above it: the cut happens below the deepest
    /// ancestor that is itself a rule or has a sibling branch. A rule node
    /// that still has more specific rules beneath it only loses its
    /// terminal mark.
    pub fn delete(&mut self, prefix: Ipv4Prefix) -> bool {
        let addr = prefix.addr();
        let mut cut: Option<(u8, bool)> = None;
        let mut node = &self.root;
        for depth in 0..prefix.len() {
            let right = bit(addr, depth);
            let Some(next) = node.child(right) else {
                return false;
            };
            if node.terminal || node.child(!right).is_some() {
                cut = Some((depth, right));
            }
            node = next;
        }
        if !node.terminal {
            return false;
        }

        if !node.is_leaf() {
            if let Some(target) = self.node_at_mut(addr, prefix.len()) {
                target.terminal = false;
                target.hits.store(0, Ordering::Relaxed);
            }
            return true;
        }

        match cut {
            Some((depth, right)) => {
                if let Some(parent) = self.node_at_mut(addr, depth) {
                    *parent.slot(right) = None;
                }
            }
            None => self.root = Node::default(),
        }
        true
    }

    fn node_at_mut(&mut self, addr: u32, depth: u8) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for d in 0..depth {
            node = node.slot(bit(addr, d)).as_deref_mut()?;
        }
        Some(node)
    }

    /// Find the rule covering `addr` and bump its hit counter.
    ///
    /// The walk stops at the first terminal node, so an ancestor rule always
    /// wins over rules nested beneath it (see the module docs). Returns
    /// `None` when the path leaves the tree before reaching a rule; no
    /// counter changes in that case.
    pub fn lookup(&self, addr: u32) -> Option<Match> {
        let mut node = &self.root;
        for depth in 0..MAX_PREFIX_LEN {
            if node.terminal {
                return Some(Match {
                    rule: Ipv4Prefix::new(addr, depth).ok()?,
                    hits: node.hit(),
                });
            }
            node = node.child(bit(addr, depth))?;
        }

        // All 32 bits consumed: the node reached is the target.
        let hits = node.hit();
        node.terminal.then(|| Match {
            rule: Ipv4Prefix::host(addr),
            hits,
        })
    }

    /// All rules in pre-order: a node's own rule, then its left subtree,
    /// then its right subtree.
    pub fn list(&self) -> Vec<RuleEntry> {
        let mut out = Vec::new();
        collect(&self.root, 0, 0, &mut out);
        out
    }

    /// Number of stored rules.
    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_leaf() && !self.root.terminal
    }

    /// Allocated nodes, root included.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }
}

fn collect(node: &Node, bits: u32, depth: u8, out: &mut Vec<RuleEntry>) {
    if node.terminal {
        let addr = bits.checked_shl(u32::from(MAX_PREFIX_LEN - depth)).unwrap_or(0);
        if let Ok(rule) = Ipv4Prefix::new(addr, depth) {
            out.push(RuleEntry {
                rule,
                hits: node.hits.load(Ordering::Relaxed),
            });
        }
    }
    if let Some(left) = node.left.as_deref() {
        collect(left, bits << 1, depth + 1, out);
    }
    if let Some(right) = node.right.as_deref() {
        collect(right, bits << 1 | 1, depth + 1, out);
    }
}
