//! The nested-set engine internals.
//!
//! - [`allocator`]: numbering arithmetic over a scope snapshot
//! - [`invariants`]: the auditor behind `check` and write verification
//! - [`locks`]: per-scope locks and halted scopes
//! - [`mutation`]: mutation requests, outcomes and phases
//! - [`TreeQuery`]: read-only range queries
//!
//! The orchestrating type, [`Forest`](crate::Forest), lives at the crate root.

pub mod allocator;
mod errors;
pub mod invariants;
pub mod locks;
pub mod mutation;
mod query;

pub use errors::TreeError;
pub use invariants::{IntegrityReport, Violation};
pub use mutation::{Mutation, MutationOutcome, MutationPhase};
pub use query::TreeQuery;
