//! Subcommand implementations.
//!
//! Every command opens its own session. Commands that mutate save the
//! in-memory store when they succeed.

pub mod inspect;
pub mod integrity;
pub mod mutate;
pub mod scopes;
