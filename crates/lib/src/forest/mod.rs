//! Provides [`Forest`], the Tree Mutator: the entry point that resolves
//! scopes, serializes mutations per scope and commits them through a
//! [`NodeStore`].
//!
//! Every mutation follows the same path. The scope lock is taken, the whole
//! scope is re-read, the request is validated, the Range Allocator computes
//! the new numbering, the resulting state is audited, and the changed rows
//! are written in one atomic batch. Nothing is cached between calls.

mod plan;

use std::collections::HashMap;
use std::sync::Arc;

use crate::Result;
use crate::backend::{NodeStore, WriteBatch};
use crate::clock::{Clock, Deadline, SystemClock};
use crate::config::ForestConfig;
use crate::node::{NewNode, NodeId, TreeNode};
use crate::scope::{ScopeId, ScopePolicy, ScopeRegistry};
use crate::tree::allocator::{self, Snapshot};
use crate::tree::invariants::{self, IntegrityReport};
use crate::tree::locks::ScopeLocks;
use crate::tree::mutation::PhaseTracker;
use crate::tree::{Mutation, MutationOutcome, MutationPhase, TreeError, TreeQuery};

/// The nested-set engine.
///
/// A `Forest` is a cheap-to-clone handle: clones share the Node Store, the
/// scope lock table and the halted-scope set, so they can be handed to
/// worker threads freely. Mutations on one scope are serialized; mutations
/// on different scopes run in parallel.
///
/// ## Example
///
/// ```
/// use canopy::{Forest, NewNode};
/// use canopy::backend::database::InMemory;
///
/// let forest = Forest::new(InMemory::new());
/// let scope = forest.resolve("Account", "Acme").unwrap();
///
/// let assets = forest.insert(&scope, None, NewNode::group().with_id("Assets")).unwrap();
/// assert_eq!((assets.lft, assets.rgt), (1, 2));
///
/// let cash = forest
///     .insert(&scope, Some(&assets.id), NewNode::leaf().with_id("Cash"))
///     .unwrap();
/// assert_eq!((cash.lft, cash.rgt), (2, 3));
/// assert!(forest.check(&scope).unwrap().is_consistent());
/// ```
#[derive(Clone)]
pub struct Forest {
    store: Arc<dyn NodeStore>,
    registry: ScopeRegistry,
    locks: Arc<ScopeLocks>,
    clock: Arc<dyn Clock>,
    verify_writes: bool,
}

impl std::fmt::Debug for Forest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forest")
            .field("store", &"<NodeStore>")
            .field("registry", &self.registry)
            .field("halted", &self.locks.halted())
            .field("clock", &self.clock)
            .field("verify_writes", &self.verify_writes)
            .finish()
    }
}

impl Forest {
    /// Creates a forest over `store` with the standard hierarchies.
    pub fn new(store: impl NodeStore) -> Self {
        Self::from_store(Arc::new(store))
    }

    /// Creates a forest over an already shared store.
    pub fn from_store(store: Arc<dyn NodeStore>) -> Self {
        Self {
            store,
            registry: ScopeRegistry::standard(),
            locks: Arc::new(ScopeLocks::new()),
            clock: Arc::new(SystemClock),
            verify_writes: true,
        }
    }

    /// Applies a loaded configuration.
    pub fn configure(mut self, config: &ForestConfig) -> Result<Self> {
        self.registry = config.registry()?;
        self.verify_writes = config.verify_writes;
        Ok(self)
    }

    /// Replaces the scope registry.
    pub fn with_registry(mut self, registry: ScopeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the clock used to evaluate deadlines.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Turns the pre-write audit on or off.
    pub fn with_verify_writes(mut self, verify_writes: bool) -> Self {
        self.verify_writes = verify_writes;
        self
    }

    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Resolves an entity type and owning context to a scope.
    pub fn resolve(&self, entity_type: &str, context: &str) -> Result<ScopeId> {
        self.registry.resolve(entity_type, context)
    }

    /// Scopes that currently hold rows.
    pub fn scopes(&self) -> Result<Vec<ScopeId>> {
        self.store.scopes()
    }

    /// Scopes refusing mutations until rebuilt.
    pub fn halted_scopes(&self) -> Vec<ScopeId> {
        self.locks.halted()
    }

    /// Inserts a node under `parent`, or as a root.
    ///
    /// Returns the stored node with its final numbering.
    pub fn insert(
        &self,
        scope: &ScopeId,
        parent: Option<&NodeId>,
        node: NewNode,
    ) -> Result<TreeNode> {
        let mutation = Mutation::Insert {
            parent: parent.cloned(),
            node,
        };
        match self.apply(scope, mutation, None)? {
            MutationOutcome::Inserted { node } => Ok(node),
            other => Err(unexpected_outcome(scope, "insert", &other)),
        }
    }

    /// Moves a node and its subtree under `new_parent`, or to the roots.
    ///
    /// Moving a node to its current parent succeeds without writing.
    pub fn move_node(
        &self,
        scope: &ScopeId,
        node: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> Result<TreeNode> {
        let mutation = Mutation::Move {
            node: node.clone(),
            new_parent: new_parent.cloned(),
        };
        match self.apply(scope, mutation, None)? {
            MutationOutcome::Moved { node } => Ok(node),
            other => Err(unexpected_outcome(scope, "move", &other)),
        }
    }

    /// Deletes a node, and its whole subtree when `cascade` is set.
    ///
    /// Returns the ids of every removed row.
    pub fn delete(&self, scope: &ScopeId, node: &NodeId, cascade: bool) -> Result<Vec<NodeId>> {
        let mutation = Mutation::Delete {
            node: node.clone(),
            cascade,
        };
        match self.apply(scope, mutation, None)? {
            MutationOutcome::Deleted { removed } => Ok(removed),
            other => Err(unexpected_outcome(scope, "delete", &other)),
        }
    }

    /// Deletes a node, cascading as the scope's policy says.
    pub fn delete_with_policy(&self, scope: &ScopeId, node: &NodeId) -> Result<Vec<NodeId>> {
        let cascade = self.registry.policy(scope)?.cascade_delete_default;
        self.delete(scope, node, cascade)
    }

    /// Sets the group flag of a node.
    pub fn convert(&self, scope: &ScopeId, node: &NodeId, is_group: bool) -> Result<TreeNode> {
        let mutation = Mutation::Convert {
            node: node.clone(),
            is_group,
        };
        match self.apply(scope, mutation, None)? {
            MutationOutcome::Converted { node } => Ok(node),
            other => Err(unexpected_outcome(scope, "convert", &other)),
        }
    }

    /// Applies a mutation under the scope's exclusive lock.
    ///
    /// A `deadline` aborts the mutation with `DeadlineExceeded` if it passes
    /// before the write begins. An `InvariantViolation` halts the scope.
    pub fn apply(
        &self,
        scope: &ScopeId,
        mutation: Mutation,
        deadline: Option<Deadline>,
    ) -> Result<MutationOutcome> {
        let policy = self.registry.policy(scope)?;
        let result = self
            .locks
            .with_exclusive(scope, || self.run(scope, policy, mutation, deadline));

        if let Err(crate::Error::Tree(TreeError::InvariantViolation { reason, .. })) = &result {
            tracing::error!(scope = %scope, reason = %reason, "invariant violation, halting scope");
            self.locks.halt(scope, reason.clone());
        }
        result
    }

    fn run(
        &self,
        scope: &ScopeId,
        policy: ScopePolicy,
        mutation: Mutation,
        deadline: Option<Deadline>,
    ) -> Result<MutationOutcome> {
        let mut tracker = PhaseTracker::start(scope, mutation.name(), deadline, self.clock())?;
        self.execute(&mut tracker, scope, policy, mutation)
            .inspect_err(|err| tracker.abort(err))
    }

    fn execute(
        &self,
        tracker: &mut PhaseTracker<'_>,
        scope: &ScopeId,
        policy: ScopePolicy,
        mutation: Mutation,
    ) -> Result<MutationOutcome> {
        if let Some(reason) = self.locks.halted_reason(scope) {
            return Err(TreeError::ScopeHalted {
                scope: scope.clone(),
                reason,
            }
            .into());
        }

        let snapshot = Snapshot::new(self.store.scan_scope(scope)?);
        let ctx = plan::Context {
            scope,
            policy,
            snapshot: &snapshot,
        };
        let validated = plan::validate(&ctx, mutation)?;

        tracker.enter(MutationPhase::Reserving)?;
        let plan = plan::reserve(&ctx, validated)?;
        if self.verify_writes && !plan.batch.is_empty() {
            let after = snapshot.with_changes(plan.batch.upserts(), plan.batch.removals());
            invariants::audit(scope, &after).into_result()?;
        }

        tracker.enter(MutationPhase::Writing)?;
        let rows = plan.batch.len();
        if rows > 0 {
            self.store.write_batch(scope, plan.batch)?;
        }
        tracker.enter(MutationPhase::Committed)?;
        tracing::debug!(scope = %scope, rows, "mutation committed");
        Ok(plan.outcome)
    }

    /// Recomputes the numbering of a whole scope from parent pointers.
    ///
    /// Siblings are ordered by `order_key`, then current `lft`, then id.
    /// This is the only operation accepted on a halted scope or one holding
    /// unnumbered rows; on success the halt is lifted. Returns the number of
    /// rows whose numbering changed.
    pub fn rebuild(&self, scope: &ScopeId) -> Result<usize> {
        self.registry.policy(scope)?;
        self.locks.with_exclusive(scope, || {
            let rows = self.store.scan_scope(scope)?;
            let before: HashMap<NodeId, (i64, i64)> = rows
                .iter()
                .map(|node| (node.id.clone(), (node.lft, node.rgt)))
                .collect();

            let renumbered = allocator::renumber(scope, rows)?;
            invariants::audit(scope, &renumbered).into_result()?;

            let mut batch = WriteBatch::new();
            for node in renumbered {
                if before.get(&node.id) != Some(&(node.lft, node.rgt)) {
                    batch.put(node);
                }
            }
            let changed = batch.len();
            if changed > 0 {
                self.store.write_batch(scope, batch)?;
            }

            if self.locks.clear(scope) {
                tracing::info!(scope = %scope, "halt lifted by rebuild");
            }
            tracing::info!(scope = %scope, changed, "scope rebuilt");
            Ok(changed)
        })
    }

    /// Audits the stored state of a scope.
    pub fn check(&self, scope: &ScopeId) -> Result<IntegrityReport> {
        self.registry.policy(scope)?;
        let rows = if self.store.consistent_reads() {
            self.store.scan_scope(scope)?
        } else {
            self.locks
                .with_shared(scope, || self.store.scan_scope(scope))?
        };
        let report = invariants::audit(scope, &rows);
        if !report.is_consistent() {
            tracing::warn!(
                scope = %scope,
                violations = report.violations.len(),
                "integrity check failed"
            );
        }
        Ok(report)
    }

    /// Read-only queries against a scope.
    pub fn query(&self, scope: &ScopeId) -> Result<TreeQuery<'_>> {
        self.registry.policy(scope)?;
        Ok(TreeQuery::new(
            self.store.as_ref(),
            self.locks.as_ref(),
            scope.clone(),
        ))
    }
}

fn unexpected_outcome(scope: &ScopeId, operation: &str, outcome: &MutationOutcome) -> crate::Error {
    TreeError::violation(
        scope,
        format!("{operation} produced an unexpected outcome: {outcome:?}"),
    )
    .into()
}
