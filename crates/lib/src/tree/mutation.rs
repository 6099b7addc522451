//! Mutation requests and the per-operation state machine.
//!
//! Every mutation walks `Validating -> Reserving -> Writing -> Committed`.
//! A mutation may abort from `Validating` or `Reserving` without effect. A
//! caller's [`Deadline`] is checked on entering each of those phases and
//! once more before `Writing`; after that the write is allowed to finish.

use std::fmt;

use serde::Serialize;

use super::TreeError;
use crate::Result;
use crate::clock::{Clock, Deadline};
use crate::node::{NewNode, NodeId, TreeNode};
use crate::scope::ScopeId;

/// A mutation request against one scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Adds a node under `parent`, or as a root when `parent` is `None`.
    Insert {
        parent: Option<NodeId>,
        node: NewNode,
    },
    /// Reparents `node` with its whole subtree.
    Move {
        node: NodeId,
        new_parent: Option<NodeId>,
    },
    /// Removes `node`, and its subtree when `cascade` is set.
    Delete { node: NodeId, cascade: bool },
    /// Sets the group flag of `node`.
    Convert { node: NodeId, is_group: bool },
}

impl Mutation {
    /// Short operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Insert { .. } => "insert",
            Mutation::Move { .. } => "move",
            Mutation::Delete { .. } => "delete",
            Mutation::Convert { .. } => "convert",
        }
    }
}

/// What a committed mutation did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The new node with its final numbering.
    Inserted { node: TreeNode },
    /// The moved node with its new numbering and `old_parent`.
    Moved { node: TreeNode },
    /// Ids of every removed row, the target first.
    Deleted { removed: Vec<NodeId> },
    /// The converted node.
    Converted { node: TreeNode },
}

impl MutationOutcome {
    /// The surviving node, for outcomes that have one.
    pub fn node(&self) -> Option<&TreeNode> {
        match self {
            MutationOutcome::Inserted { node }
            | MutationOutcome::Moved { node }
            | MutationOutcome::Converted { node } => Some(node),
            MutationOutcome::Deleted { .. } => None,
        }
    }

    pub fn into_node(self) -> Option<TreeNode> {
        match self {
            MutationOutcome::Inserted { node }
            | MutationOutcome::Moved { node }
            | MutationOutcome::Converted { node } => Some(node),
            MutationOutcome::Deleted { .. } => None,
        }
    }
}

/// Phase of a running mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPhase {
    Validating,
    Reserving,
    Writing,
    Committed,
    Aborted,
}

impl MutationPhase {
    /// True while a deadline may still abort the mutation.
    pub fn is_cancellable(self) -> bool {
        matches!(self, MutationPhase::Validating | MutationPhase::Reserving)
    }

    fn can_enter(self, next: MutationPhase) -> bool {
        use MutationPhase::*;
        matches!(
            (self, next),
            (Validating, Reserving)
                | (Reserving, Writing)
                | (Writing, Committed)
                | (Validating, Aborted)
                | (Reserving, Aborted)
        )
    }
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationPhase::Validating => "validating",
            MutationPhase::Reserving => "reserving",
            MutationPhase::Writing => "writing",
            MutationPhase::Committed => "committed",
            MutationPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Drives one mutation through its phases.
pub(crate) struct PhaseTracker<'a> {
    scope: &'a ScopeId,
    operation: &'static str,
    phase: MutationPhase,
    deadline: Option<Deadline>,
    clock: &'a dyn Clock,
}

impl<'a> PhaseTracker<'a> {
    /// Starts in `Validating`. Fails at once if the deadline already passed.
    pub(crate) fn start(
        scope: &'a ScopeId,
        operation: &'static str,
        deadline: Option<Deadline>,
        clock: &'a dyn Clock,
    ) -> Result<Self> {
        let tracker = Self {
            scope,
            operation,
            phase: MutationPhase::Validating,
            deadline,
            clock,
        };
        tracing::debug!(scope = %scope, operation, phase = %tracker.phase, "mutation started");
        tracker.check_deadline()?;
        Ok(tracker)
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> MutationPhase {
        self.phase
    }

    /// Moves to the next phase.
    ///
    /// Entering `Reserving` or `Writing` checks the deadline first, so the
    /// last point of cancellation is just before the write starts.
    pub(crate) fn enter(&mut self, next: MutationPhase) -> Result<()> {
        if matches!(next, MutationPhase::Reserving | MutationPhase::Writing) {
            self.check_deadline()?;
        }
        if !self.phase.can_enter(next) {
            return Err(TreeError::violation(
                self.scope,
                format!("{} cannot go from {} to {next}", self.operation, self.phase),
            )
            .into());
        }
        tracing::debug!(
            scope = %self.scope,
            operation = self.operation,
            from = %self.phase,
            to = %next,
            "mutation phase"
        );
        self.phase = next;
        Ok(())
    }

    /// Records that the mutation gave up because of `err`.
    pub(crate) fn abort(&mut self, err: &crate::Error) {
        if self.phase.can_enter(MutationPhase::Aborted) {
            tracing::debug!(
                scope = %self.scope,
                operation = self.operation,
                from = %self.phase,
                error = %err,
                "mutation aborted"
            );
            self.phase = MutationPhase::Aborted;
        } else {
            tracing::debug!(
                scope = %self.scope,
                operation = self.operation,
                phase = %self.phase,
                error = %err,
                "mutation failed"
            );
        }
    }

    fn check_deadline(&self) -> Result<()> {
        let Some(deadline) = self.deadline else {
            return Ok(());
        };
        if self.phase.is_cancellable() && deadline.has_passed(self.clock) {
            return Err(TreeError::DeadlineExceeded {
                scope: self.scope.clone(),
                phase: self.phase,
            }
            .into());
        }
        Ok(())
    }
}
