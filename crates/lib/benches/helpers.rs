//! Shared helpers for benchmark tests

#![allow(dead_code)]

use std::sync::Arc;

use canopy::{
    Forest, NewNode, NodeId, ScopeId,
    backend::{NodeStore, database::InMemory},
};

/// Creates a store based on the TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory store (default)
/// - "sqlite": SQLite in-memory store (requires `sqlite` feature)
///
/// This mirrors the pattern used in integration tests for consistency.
pub fn bench_store() -> Arc<dyn NodeStore> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use canopy::backend::database::Sqlite;
                Arc::new(Sqlite::in_memory().expect("Failed to create SQLite store"))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("inmemory") | Ok("") | Err(_) => Arc::new(InMemory::new()),
        Ok(other) => {
            panic!("Unknown TEST_BACKEND value: {other}. Supported: inmemory, sqlite")
        }
    }
}

/// Builds a balanced tree of `size` nodes under one root in the Territory
/// scope. Every node has up to `fanout` children.
///
/// Returns the forest, the scope and the ids in insertion order.
pub fn balanced_tree(size: usize, fanout: usize) -> (Forest, ScopeId, Vec<NodeId>) {
    let forest = Forest::from_store(bench_store());
    let scope = forest.resolve("Territory", "").expect("Failed to resolve scope");

    let mut ids = Vec::with_capacity(size);
    let root = forest
        .insert(&scope, None, NewNode::group().with_id("n0"))
        .expect("Failed to insert root");
    ids.push(root.id);

    for i in 1..size {
        let parent = ids[(i - 1) / fanout].clone();
        let node = forest
            .insert(&scope, Some(&parent), NewNode::group().with_id(format!("n{i}")))
            .expect("Failed to insert node");
        ids.push(node.id);
    }
    (forest, scope, ids)
}
