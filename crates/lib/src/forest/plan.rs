//! Validation and reservation for each kind of mutation.
//!
//! Both steps are pure functions of one scope snapshot. Validation only
//! rejects; reservation asks the Range Allocator for the new numbering and
//! assembles the batch to write.

use crate::Result;
use crate::backend::{BackendError, WriteBatch};
use crate::node::{NewNode, NodeId, TreeNode};
use crate::scope::{ScopeId, ScopePolicy};
use crate::tree::allocator::{self, Snapshot};
use crate::tree::{Mutation, MutationOutcome, TreeError};

pub(super) struct Context<'a> {
    pub scope: &'a ScopeId,
    pub policy: ScopePolicy,
    pub snapshot: &'a Snapshot,
}

impl Context<'_> {
    fn node(&self, id: &NodeId) -> Result<&TreeNode> {
        self.snapshot.get(id).ok_or_else(|| {
            BackendError::NodeNotFound {
                scope: self.scope.clone(),
                id: id.clone(),
            }
            .into()
        })
    }
}

/// A mutation that passed validation.
pub(super) enum Validated {
    Insert {
        parent: Option<NodeId>,
        node: NewNode,
    },
    Move {
        node: TreeNode,
        new_parent: Option<NodeId>,
    },
    Delete {
        node: TreeNode,
        cascade: bool,
    },
    Convert {
        node: TreeNode,
        is_group: bool,
    },
    /// Nothing to write; the outcome is already known.
    Unchanged(MutationOutcome),
}

/// Rows to write and the outcome to report once they are committed.
pub(super) struct Plan {
    pub batch: WriteBatch,
    pub outcome: MutationOutcome,
}

pub(super) fn validate(ctx: &Context<'_>, mutation: Mutation) -> Result<Validated> {
    if let Some(row) = ctx.snapshot.first_unnumbered() {
        return Err(TreeError::violation(
            ctx.scope,
            format!(
                "node {} has no numbering; rebuild the scope before mutating it",
                row.id
            ),
        )
        .into());
    }

    match mutation {
        Mutation::Insert { parent, node } => validate_insert(ctx, parent, node),
        Mutation::Move { node, new_parent } => validate_move(ctx, &node, new_parent),
        Mutation::Delete { node, cascade } => {
            let node = ctx.node(&node)?;
            if !cascade && node.has_children() {
                return Err(TreeError::NodeHasChildren {
                    scope: ctx.scope.clone(),
                    node: node.id.clone(),
                    descendants: node.descendant_count(),
                }
                .into());
            }
            Ok(Validated::Delete {
                node: node.clone(),
                cascade,
            })
        }
        Mutation::Convert { node, is_group } => {
            let node = ctx.node(&node)?;
            if node.is_group == is_group {
                return Ok(Validated::Unchanged(MutationOutcome::Converted {
                    node: node.clone(),
                }));
            }
            if !is_group && node.has_children() {
                return Err(TreeError::NodeHasChildren {
                    scope: ctx.scope.clone(),
                    node: node.id.clone(),
                    descendants: node.descendant_count(),
                }
                .into());
            }
            Ok(Validated::Convert {
                node: node.clone(),
                is_group,
            })
        }
    }
}

fn validate_insert(ctx: &Context<'_>, parent: Option<NodeId>, node: NewNode) -> Result<Validated> {
    if let Some(id) = node.id() {
        if ctx.snapshot.contains(id) {
            return Err(TreeError::DuplicateNode {
                scope: ctx.scope.clone(),
                node: id.clone(),
            }
            .into());
        }
    }
    if ctx.policy.require_order_key && node.order_key().is_none() {
        return Err(TreeError::MissingOrderKey {
            scope: ctx.scope.clone(),
        }
        .into());
    }

    match &parent {
        Some(parent_id) => {
            let parent = ctx.node(parent_id)?;
            if !parent.is_group {
                return Err(TreeError::ParentNotGroup {
                    scope: ctx.scope.clone(),
                    parent: parent_id.clone(),
                }
                .into());
            }
        }
        None => check_root_slot(ctx, None)?,
    }
    Ok(Validated::Insert { parent, node })
}

fn validate_move(ctx: &Context<'_>, id: &NodeId, new_parent: Option<NodeId>) -> Result<Validated> {
    let node = ctx.node(id)?;
    if node.parent_id == new_parent {
        return Ok(Validated::Unchanged(MutationOutcome::Moved { node: node.clone() }));
    }

    match &new_parent {
        Some(parent_id) => {
            let parent = ctx.node(parent_id)?;
            if parent.id == node.id || node.covers(parent.lft) {
                return Err(TreeError::CycleDetected {
                    scope: ctx.scope.clone(),
                    node: node.id.clone(),
                    new_parent: parent_id.clone(),
                }
                .into());
            }
            if !parent.is_group {
                return Err(TreeError::ParentNotGroup {
                    scope: ctx.scope.clone(),
                    parent: parent_id.clone(),
                }
                .into());
            }
        }
        None => check_root_slot(ctx, Some(&node.id))?,
    }
    Ok(Validated::Move {
        node: node.clone(),
        new_parent,
    })
}

/// Fails with `RootConflict` if a single-root scope already has a root other
/// than `moving`.
fn check_root_slot(ctx: &Context<'_>, moving: Option<&NodeId>) -> Result<()> {
    if ctx.policy.allow_multiple_roots {
        return Ok(());
    }
    match ctx
        .snapshot
        .roots()
        .find(|root| Some(&root.id) != moving)
    {
        Some(existing) => Err(TreeError::RootConflict {
            scope: ctx.scope.clone(),
            existing: existing.id.clone(),
        }
        .into()),
        None => Ok(()),
    }
}

pub(super) fn reserve(ctx: &Context<'_>, validated: Validated) -> Result<Plan> {
    let mut batch = WriteBatch::new();
    let outcome = match validated {
        Validated::Unchanged(outcome) => outcome,
        Validated::Insert { parent, node } => {
            let reservation = allocator::reserve_range(
                ctx.scope,
                ctx.snapshot,
                parent.as_ref(),
                node.order_key(),
                1,
            )?;
            for shifted in reservation.shifted {
                batch.put(shifted);
            }
            let node = node.into_node(parent, reservation.lft, reservation.rgt);
            batch.put(node.clone());
            MutationOutcome::Inserted { node }
        }
        Validated::Move { node, new_parent } => {
            let changed = allocator::relocate_range(
                ctx.scope,
                ctx.snapshot,
                node.lft,
                node.rgt,
                new_parent.as_ref(),
                node.order_key.as_deref(),
            )?;
            let mut moved = changed
                .iter()
                .find(|row| row.id == node.id)
                .cloned()
                .unwrap_or_else(|| node.clone());
            moved.old_parent = node.parent_id.clone();
            moved.parent_id = new_parent;

            for row in changed.into_iter().filter(|row| row.id != node.id) {
                batch.put(row);
            }
            batch.put(moved.clone());
            MutationOutcome::Moved { node: moved }
        }
        Validated::Delete { node, cascade } => {
            let mut removed = vec![node.id.clone()];
            if cascade {
                removed.extend(
                    ctx.snapshot
                        .within(node.lft, node.rgt)
                        .map(|row| row.id.clone()),
                );
            }
            for row in allocator::shrink_range(ctx.scope, ctx.snapshot, node.lft, node.rgt)? {
                batch.put(row);
            }
            for id in &removed {
                batch.remove(id.clone());
            }
            MutationOutcome::Deleted { removed }
        }
        Validated::Convert { mut node, is_group } => {
            node.is_group = is_group;
            batch.put(node.clone());
            MutationOutcome::Converted { node }
        }
    };
    Ok(Plan { batch, outcome })
}
