//! The Range Allocator.
//!
//! Pure numbering arithmetic over a [`Snapshot`] of one scope. Nothing here
//! touches the Node Store: every function takes the rows the mutator just
//! read and returns the rows whose `lft`/`rgt` must change.
//!
//! All values are `i64` and every addition or subtraction is checked.
//! Overflow is reported as [`TreeError::InvariantViolation`].

use std::collections::{HashMap, HashSet};

use super::TreeError;
use crate::Result;
use crate::node::{NodeId, TreeNode};
use crate::scope::ScopeId;

/// Rows of one scope, ordered and indexed for the allocator.
///
/// Numbered rows come first in `lft` order; unnumbered rows follow by id.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    rows: Vec<TreeNode>,
    index: HashMap<NodeId, usize>,
}

impl Snapshot {
    pub fn new(mut rows: Vec<TreeNode>) -> Self {
        rows.sort_by(|a, b| {
            (!a.is_numbered(), a.lft, &a.id).cmp(&(!b.is_numbered(), b.lft, &b.id))
        });
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), i))
            .collect();
        Self { rows, index }
    }

    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn rows(&self) -> &[TreeNode] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<TreeNode> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Roots in `lft` order.
    pub fn roots(&self) -> impl Iterator<Item = &TreeNode> {
        self.rows.iter().filter(|node| node.is_root())
    }

    /// Direct children of `parent` in `lft` order.
    pub fn children_of<'a>(&'a self, parent: &'a NodeId) -> impl Iterator<Item = &'a TreeNode> {
        self.rows
            .iter()
            .filter(move |node| node.parent_id.as_ref() == Some(parent))
    }

    /// Rows strictly inside `[lft, rgt]`.
    pub fn within(&self, lft: i64, rgt: i64) -> impl Iterator<Item = &TreeNode> {
        self.rows
            .iter()
            .filter(move |node| node.is_numbered() && lft < node.lft && node.rgt < rgt)
    }

    /// Largest boundary in use, or 0 for an empty scope.
    pub fn max_rgt(&self) -> i64 {
        self.rows.iter().map(|node| node.rgt).max().unwrap_or(0)
    }

    /// The first row that has never been numbered, if any.
    pub fn first_unnumbered(&self) -> Option<&TreeNode> {
        self.rows.iter().find(|node| !node.is_numbered())
    }

    /// The rows as they would read after applying the given changes.
    pub fn with_changes(&self, upserts: &[TreeNode], removals: &[NodeId]) -> Vec<TreeNode> {
        let removed: HashSet<&NodeId> = removals.iter().collect();
        let replaced: HashMap<&NodeId, &TreeNode> =
            upserts.iter().map(|node| (&node.id, node)).collect();

        let mut rows: Vec<TreeNode> = self
            .rows
            .iter()
            .filter(|node| !removed.contains(&node.id))
            .map(|node| (*replaced.get(&node.id).unwrap_or(&node)).clone())
            .collect();
        rows.extend(
            upserts
                .iter()
                .filter(|node| !self.contains(&node.id))
                .cloned(),
        );
        rows
    }
}

/// A gap opened for a new subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    /// Left boundary of the reserved slot.
    pub lft: i64,
    /// Right boundary of the reserved slot.
    pub rgt: i64,
    /// Existing rows shifted to make room, with their new numbering.
    pub shifted: Vec<TreeNode>,
}

/// Computes where a new child of `parent` goes, in current numbering.
///
/// Without an order key the new node goes after the parent's last child
/// (the parent's `rgt`, or one past the last root). With an order key it goes
/// before the first sibling, in `lft` order, that is unkeyed or whose own key
/// sorts after it. Keyed siblings thus stay ahead of unkeyed ones in key
/// order, which is the order [`renumber`] produces.
pub fn insertion_point(
    scope: &ScopeId,
    snapshot: &Snapshot,
    parent: Option<&NodeId>,
    order_key: Option<&str>,
) -> Result<i64> {
    if let Some(key) = order_key {
        let later = match parent {
            Some(parent) => snapshot
                .children_of(parent)
                .find(|sibling| sorts_after(sibling, key)),
            None => snapshot.roots().find(|sibling| sorts_after(sibling, key)),
        };
        if let Some(sibling) = later {
            return Ok(sibling.lft);
        }
    }

    match parent {
        Some(parent) => snapshot.get(parent).map(|node| node.rgt).ok_or_else(|| {
            TreeError::violation(scope, format!("parent {parent} vanished from the snapshot"))
                .into()
        }),
        None => checked_add(scope, snapshot.max_rgt(), 1),
    }
}

fn sorts_after(sibling: &TreeNode, key: &str) -> bool {
    sibling.order_key.as_deref().is_none_or(|other| other > key)
}

/// Opens a gap of `2 * subtree_size` at the insertion point.
///
/// Every boundary at or after the insertion point moves right by the gap
/// width, which includes the parent's `rgt` and every ancestor's.
pub fn reserve_range(
    scope: &ScopeId,
    snapshot: &Snapshot,
    parent: Option<&NodeId>,
    order_key: Option<&str>,
    subtree_size: i64,
) -> Result<Reservation> {
    if subtree_size < 1 {
        return Err(TreeError::violation(
            scope,
            format!("cannot reserve a range for {subtree_size} node(s)"),
        )
        .into());
    }
    let point = insertion_point(scope, snapshot, parent, order_key)?;
    let gap = checked_mul(scope, subtree_size, 2)?;

    let mut shifted = Vec::new();
    for node in snapshot.rows().iter().filter(|node| node.is_numbered()) {
        let lft = shift_from(scope, node.lft, point, gap)?;
        let rgt = shift_from(scope, node.rgt, point, gap)?;
        if let Some(node) = renumbered(node, lft, rgt) {
            shifted.push(node);
        }
    }

    let rgt = checked_add(scope, point, gap - 1)?;
    Ok(Reservation {
        lft: point,
        rgt,
        shifted,
    })
}

/// Closes the gap left by removing the subtree `[lft, rgt]`.
///
/// Returns the rows outside the subtree whose numbering changed. Rows inside
/// the subtree are the caller's to remove.
pub fn shrink_range(
    scope: &ScopeId,
    snapshot: &Snapshot,
    lft: i64,
    rgt: i64,
) -> Result<Vec<TreeNode>> {
    let width = subtree_width(scope, lft, rgt)?;

    let mut changed = Vec::new();
    for node in snapshot.rows().iter().filter(|node| node.is_numbered()) {
        if lft <= node.lft && node.rgt <= rgt {
            continue;
        }
        let new_lft = close_gap(scope, node.lft, rgt, width)?;
        let new_rgt = close_gap(scope, node.rgt, rgt, width)?;
        if let Some(node) = renumbered(node, new_lft, new_rgt) {
            changed.push(node);
        }
    }
    Ok(changed)
}

/// Moves the subtree `[lft, rgt]` to the trailing edge of `new_parent`'s
/// children (or of the roots), honoring `order_key`.
///
/// Computed as one unit: the gap is closed at the old position, reopened at
/// the new one, and every moved row is offset by the net shift. Returns all
/// rows whose numbering changed, moved rows included. Parent pointers are
/// left to the caller.
pub fn relocate_range(
    scope: &ScopeId,
    snapshot: &Snapshot,
    lft: i64,
    rgt: i64,
    new_parent: Option<&NodeId>,
    order_key: Option<&str>,
) -> Result<Vec<TreeNode>> {
    let width = subtree_width(scope, lft, rgt)?;
    let point = insertion_point(scope, snapshot, new_parent, order_key)?;
    if lft < point && point <= rgt {
        return Err(TreeError::violation(
            scope,
            format!("target position {point} lies inside the moving range [{lft}, {rgt}]"),
        )
        .into());
    }
    if point == lft || point == checked_add(scope, rgt, 1)? {
        return Ok(Vec::new());
    }

    // Target position once the subtree has been cut out
    let target = if point > rgt {
        checked_sub(scope, point, width)?
    } else {
        point
    };

    let mut changed = Vec::new();
    for node in snapshot.rows().iter().filter(|node| node.is_numbered()) {
        let (new_lft, new_rgt) = if lft <= node.lft && node.rgt <= rgt {
            (
                checked_add(scope, node.lft - lft, target)?,
                checked_add(scope, node.rgt - lft, target)?,
            )
        } else {
            let l = close_gap(scope, node.lft, rgt, width)?;
            let r = close_gap(scope, node.rgt, rgt, width)?;
            (
                shift_from(scope, l, target, width)?,
                shift_from(scope, r, target, width)?,
            )
        };
        if let Some(node) = renumbered(node, new_lft, new_rgt) {
            changed.push(node);
        }
    }
    Ok(changed)
}

/// Assigns fresh contiguous numbering from parent pointers.
///
/// Siblings are ordered by `order_key` (keyed nodes before unkeyed ones),
/// then by current `lft` (unnumbered rows last), then by id. Returns every
/// row with its new numbering, in the new `lft` order.
///
/// Fails with `InvariantViolation` if a parent pointer names a missing row
/// or if parent pointers form a cycle.
pub fn renumber(scope: &ScopeId, rows: Vec<TreeNode>) -> Result<Vec<TreeNode>> {
    let positions: HashMap<NodeId, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.clone(), i))
        .collect();

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (i, node) in rows.iter().enumerate() {
        match &node.parent_id {
            None => roots.push(i),
            Some(parent) => {
                let &p = positions.get(parent).ok_or_else(|| {
                    TreeError::violation(
                        scope,
                        format!("node {} references missing parent {parent}", node.id),
                    )
                })?;
                children.entry(p).or_default().push(i);
            }
        }
    }

    let order = |i: &usize| {
        let node = &rows[*i];
        let current = if node.is_numbered() { node.lft } else { i64::MAX };
        (
            node.order_key.is_none(),
            node.order_key.clone(),
            current,
            node.id.clone(),
        )
    };
    roots.sort_by_key(order);
    for siblings in children.values_mut() {
        siblings.sort_by_key(order);
    }

    enum Visit {
        Enter(usize),
        Exit(usize),
    }

    let mut numbering = vec![(0i64, 0i64); rows.len()];
    let mut sequence = Vec::with_capacity(rows.len());
    let mut counter: i64 = 1;
    let mut stack: Vec<Visit> = roots.iter().rev().map(|&i| Visit::Enter(i)).collect();
    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(i) => {
                numbering[i].0 = counter;
                counter = checked_add(scope, counter, 1)?;
                sequence.push(i);
                stack.push(Visit::Exit(i));
                if let Some(kids) = children.get(&i) {
                    stack.extend(kids.iter().rev().map(|&k| Visit::Enter(k)));
                }
            }
            Visit::Exit(i) => {
                numbering[i].1 = counter;
                counter = checked_add(scope, counter, 1)?;
            }
        }
    }

    if sequence.len() != rows.len() {
        let visited: HashSet<usize> = sequence.iter().copied().collect();
        let stranded = rows
            .iter()
            .enumerate()
            .find(|(i, _)| !visited.contains(i))
            .map(|(_, node)| node.id.to_string())
            .unwrap_or_default();
        return Err(TreeError::violation(
            scope,
            format!("parent pointers form a cycle through node {stranded}"),
        )
        .into());
    }

    let mut slots: Vec<Option<TreeNode>> = rows.into_iter().map(Some).collect();
    Ok(sequence
        .into_iter()
        .filter_map(|i| {
            slots[i].take().map(|mut node| {
                (node.lft, node.rgt) = numbering[i];
                node
            })
        })
        .collect())
}

fn renumbered(node: &TreeNode, lft: i64, rgt: i64) -> Option<TreeNode> {
    if node.lft == lft && node.rgt == rgt {
        return None;
    }
    let mut node = node.clone();
    node.lft = lft;
    node.rgt = rgt;
    Some(node)
}

fn subtree_width(scope: &ScopeId, lft: i64, rgt: i64) -> Result<i64> {
    if lft < 1 || rgt <= lft {
        return Err(TreeError::violation(scope, format!("invalid range [{lft}, {rgt}]")).into());
    }
    let width = checked_add(scope, checked_sub(scope, rgt, lft)?, 1)?;
    if width % 2 != 0 {
        return Err(TreeError::violation(
            scope,
            format!("range [{lft}, {rgt}] has odd width {width}"),
        )
        .into());
    }
    Ok(width)
}

/// `value + gap` if `value >= point`, else `value`.
fn shift_from(scope: &ScopeId, value: i64, point: i64, gap: i64) -> Result<i64> {
    if value >= point {
        checked_add(scope, value, gap)
    } else {
        Ok(value)
    }
}

/// `value - width` if `value > rgt`, else `value`.
fn close_gap(scope: &ScopeId, value: i64, rgt: i64, width: i64) -> Result<i64> {
    if value > rgt {
        checked_sub(scope, value, width)
    } else {
        Ok(value)
    }
}

fn checked_add(scope: &ScopeId, a: i64, b: i64) -> Result<i64> {
    a.checked_add(b)
        .ok_or_else(|| overflow(scope, format!("{a} + {b}")))
}

fn checked_sub(scope: &ScopeId, a: i64, b: i64) -> Result<i64> {
    a.checked_sub(b)
        .ok_or_else(|| overflow(scope, format!("{a} - {b}")))
}

fn checked_mul(scope: &ScopeId, a: i64, b: i64) -> Result<i64> {
    a.checked_mul(b)
        .ok_or_else(|| overflow(scope, format!("{a} * {b}")))
}

fn overflow(scope: &ScopeId, expr: String) -> crate::Error {
    TreeError::violation(scope, format!("numbering overflow computing {expr}")).into()
}
