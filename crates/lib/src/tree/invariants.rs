//! The Invariant Auditor.
//!
//! Checks the nested-set invariants over the full row set of one scope:
//!
//! 1. `lft < rgt` for every node
//! 2. a child's range lies strictly inside its parent's
//! 3. ranges of unrelated nodes never overlap
//! 4. leaves have no children
//! 5. `rgt - lft == 2 * descendants + 1`
//! 6. roots are packed contiguously from `lft = 1`
//!
//! It also reports dangling parent pointers, boundary values used twice and
//! rows that were never numbered. The mutator audits the state it is about to
//! write; [`Forest::check`](crate::Forest::check) audits what is stored.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use super::TreeError;
use crate::Result;
use crate::node::{NodeId, TreeNode};
use crate::scope::ScopeId;

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The row carries no numbering.
    Unnumbered { node: NodeId },
    /// `lft >= rgt`.
    EmptyRange { node: NodeId, lft: i64, rgt: i64 },
    /// The parent's range does not strictly contain the child's.
    ParentDoesNotContain { node: NodeId, parent: NodeId },
    /// Two ranges partially overlap.
    Overlap { first: NodeId, second: NodeId },
    /// A leaf is referenced as a parent.
    LeafWithChildren { node: NodeId },
    /// The range width disagrees with the number of descendants.
    WidthMismatch {
        node: NodeId,
        descendants: i64,
        width: i64,
    },
    /// A root does not start where the previous root ended.
    RootNotPacked {
        node: NodeId,
        expected_lft: i64,
        lft: i64,
    },
    /// The parent pointer names a row missing from the scope.
    DanglingParent { node: NodeId, parent: NodeId },
    /// A boundary value is used more than once.
    DuplicateBoundary { value: i64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Unnumbered { node } => {
                write!(f, "node {node} has no numbering; rebuild the scope")
            }
            Violation::EmptyRange { node, lft, rgt } => {
                write!(f, "node {node} has lft {lft} >= rgt {rgt}")
            }
            Violation::ParentDoesNotContain { node, parent } => {
                write!(f, "parent {parent} does not contain child {node}")
            }
            Violation::Overlap { first, second } => {
                write!(f, "ranges of {first} and {second} overlap")
            }
            Violation::LeafWithChildren { node } => write!(f, "leaf {node} has children"),
            Violation::WidthMismatch {
                node,
                descendants,
                width,
            } => write!(
                f,
                "node {node} spans {width} slots but has {descendants} descendant(s)"
            ),
            Violation::RootNotPacked {
                node,
                expected_lft,
                lft,
            } => write!(f, "root {node} starts at {lft}, expected {expected_lft}"),
            Violation::DanglingParent { node, parent } => {
                write!(f, "node {node} references missing parent {parent}")
            }
            Violation::DuplicateBoundary { value } => {
                write!(f, "boundary {value} is used more than once")
            }
        }
    }
}

/// Result of auditing one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub scope: ScopeId,
    /// Number of rows audited.
    pub nodes: usize,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    /// Converts a failed audit into `TreeError::InvariantViolation`.
    pub fn into_result(self) -> Result<()> {
        let Some(first) = self.violations.first() else {
            return Ok(());
        };
        let reason = match self.violations.len() {
            1 => first.to_string(),
            n => format!("{first} (and {} more)", n - 1),
        };
        Err(TreeError::violation(&self.scope, reason).into())
    }
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consistent() {
            return write!(f, "{}: {} node(s), consistent", self.scope, self.nodes);
        }
        writeln!(
            f,
            "{}: {} node(s), {} violation(s)",
            self.scope,
            self.nodes,
            self.violations.len()
        )?;
        for violation in &self.violations {
            writeln!(f, "  - {violation}")?;
        }
        Ok(())
    }
}

/// Audits every row of a scope.
pub fn audit(scope: &ScopeId, rows: &[TreeNode]) -> IntegrityReport {
    let mut violations = Vec::new();
    let by_id: HashMap<&NodeId, &TreeNode> = rows.iter().map(|node| (&node.id, node)).collect();

    let mut numbered: Vec<&TreeNode> = Vec::with_capacity(rows.len());
    for node in rows {
        if node.is_numbered() {
            numbered.push(node);
        } else {
            violations.push(Violation::Unnumbered {
                node: node.id.clone(),
            });
        }
    }
    numbered.sort_by_key(|node| (node.lft, node.rgt));

    // Ranges must be non-empty
    for node in &numbered {
        if node.lft >= node.rgt {
            violations.push(Violation::EmptyRange {
                node: node.id.clone(),
                lft: node.lft,
                rgt: node.rgt,
            });
        }
    }

    let mut uses: BTreeMap<i64, usize> = BTreeMap::new();
    for node in &numbered {
        *uses.entry(node.lft).or_default() += 1;
        *uses.entry(node.rgt).or_default() += 1;
    }
    violations.extend(
        uses.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(value, _)| Violation::DuplicateBoundary { value }),
    );

    // Each parent must exist and contain its children; leaves have none
    let mut leaf_parents = BTreeSet::new();
    let mut children: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    for node in rows {
        let Some(parent_id) = &node.parent_id else {
            continue;
        };
        let Some(parent) = by_id.get(parent_id) else {
            violations.push(Violation::DanglingParent {
                node: node.id.clone(),
                parent: parent_id.clone(),
            });
            continue;
        };
        children.entry(parent_id).or_default().push(&node.id);
        if !parent.is_group {
            leaf_parents.insert(parent_id.clone());
        }
        if node.is_numbered() && parent.is_numbered() && !parent.contains(node) {
            violations.push(Violation::ParentDoesNotContain {
                node: node.id.clone(),
                parent: parent_id.clone(),
            });
        }
    }
    violations.extend(
        leaf_parents
            .into_iter()
            .map(|node| Violation::LeafWithChildren { node }),
    );

    // Non-nested ranges must not overlap
    let mut open: Vec<&TreeNode> = Vec::new();
    for &node in numbered.iter().filter(|node| node.lft < node.rgt) {
        while open.last().is_some_and(|top| top.rgt < node.lft) {
            open.pop();
        }
        if let Some(top) = open.last() {
            if top.rgt < node.rgt {
                violations.push(Violation::Overlap {
                    first: top.id.clone(),
                    second: node.id.clone(),
                });
                continue;
            }
        }
        open.push(node);
    }

    // Width must match the descendant count from parent pointers
    let descendants = descendant_counts(rows, &children);
    for node in &numbered {
        if let Some(&count) = descendants.get(&node.id) {
            let width = node.rgt.saturating_sub(node.lft);
            if width != count.saturating_mul(2).saturating_add(1) {
                violations.push(Violation::WidthMismatch {
                    node: node.id.clone(),
                    descendants: count,
                    width,
                });
            }
        }
    }

    // Roots are packed from lft = 1
    let mut expected_lft = 1;
    for root in numbered.iter().filter(|node| node.is_root()) {
        if root.lft != expected_lft {
            violations.push(Violation::RootNotPacked {
                node: root.id.clone(),
                expected_lft,
                lft: root.lft,
            });
        }
        expected_lft = root.rgt.saturating_add(1);
    }

    IntegrityReport {
        scope: scope.clone(),
        nodes: rows.len(),
        violations,
    }
}

/// Descendant counts for every row reachable from a root.
fn descendant_counts<'a>(
    rows: &'a [TreeNode],
    children: &HashMap<&'a NodeId, Vec<&'a NodeId>>,
) -> HashMap<&'a NodeId, i64> {
    let mut counts: HashMap<&NodeId, i64> = HashMap::with_capacity(rows.len());
    let mut stack: Vec<(&NodeId, bool)> = rows
        .iter()
        .filter(|node| node.is_root())
        .map(|node| (&node.id, false))
        .collect();

    while let Some((id, expanded)) = stack.pop() {
        let kids = children.get(id).map(Vec::as_slice).unwrap_or_default();
        if expanded {
            let total = kids
                .iter()
                .map(|kid| counts.get(kid).copied().unwrap_or(0) + 1)
                .sum();
            counts.insert(id, total);
        } else {
            stack.push((id, true));
            stack.extend(kids.iter().map(|kid| (*kid, false)));
        }
    }
    counts
}
