use std::sync::Arc;

use canopy::{
    Error, NodeId, ScopeId, TreeNode,
    backend::{BackendError, NodeStore, WriteBatch},
};

use crate::helpers::*;

fn numbered(id: &str, parent: Option<&str>, lft: i64, rgt: i64) -> TreeNode {
    let mut node = TreeNode::unnumbered(id, parent.map(NodeId::from), true);
    node.lft = lft;
    node.rgt = rgt;
    node
}

fn seed(scope: &ScopeId) -> Arc<dyn NodeStore> {
    let store = test_store();
    let mut batch = WriteBatch::new();
    batch
        .put(numbered("root", None, 1, 8))
        .put(numbered("b", Some("root"), 4, 7))
        .put(numbered("a", Some("root"), 2, 3))
        .put(numbered("c", Some("b"), 5, 6))
        .put(TreeNode::unnumbered("z", Some("root".into()), false))
        .put(TreeNode::unnumbered("y", Some("root".into()), false));
    store.write_batch(scope, batch).unwrap();
    store
}

#[test]
fn test_read_node_and_not_found() {
    let scope = ScopeId::global("Territory");
    let store = seed(&scope);

    let node = store.read_node(&scope, &id("b")).unwrap();
    assert_eq!((node.lft, node.rgt), (4, 7));
    assert_eq!(node.parent_id, Some(id("root")));

    let err = store.read_node(&scope, &id("missing")).unwrap_err();
    assert!(err.is_not_found());

    // Same id in another scope is a different row
    let other = ScopeId::new("Account", "Acme");
    assert!(store.read_node(&other, &id("b")).unwrap_err().is_not_found());
}

#[test]
fn test_range_scan_orders_by_lft_and_skips_unnumbered() {
    let scope = ScopeId::global("Territory");
    let store = seed(&scope);

    let all = store.read_numbered(&scope).unwrap();
    assert_eq!(ids(&all), vec!["root", "a", "b", "c"]);

    let inside_b = store.read_range(&scope, 5, 6).unwrap();
    assert_eq!(ids(&inside_b), vec!["c"]);

    let subtree = store.read_range(&scope, 4, 7).unwrap();
    assert_eq!(ids(&subtree), vec!["b", "c"]);
}

#[test]
fn test_enclosing_scan_and_roots() {
    let scope = ScopeId::global("Territory");
    let store = seed(&scope);

    // c sits at (5,6) inside b (4,7) inside root (1,8)
    let enclosing = store.read_enclosing(&scope, 5, 6).unwrap();
    assert_eq!(ids(&enclosing), vec!["root", "b"]);
    assert!(store.read_enclosing(&scope, 1, 8).unwrap().is_empty());

    let roots = store.read_roots(&scope).unwrap();
    assert_eq!(ids(&roots), vec!["root"]);
}

#[test]
fn test_scan_scope_puts_unnumbered_last() {
    let scope = ScopeId::global("Territory");
    let store = seed(&scope);

    let rows = store.scan_scope(&scope).unwrap();
    assert_eq!(ids(&rows), vec!["root", "a", "b", "c", "y", "z"]);
    assert!(!rows[4].is_numbered());
}

#[test]
fn test_batch_applies_upserts_and_removals() {
    let scope = ScopeId::global("Territory");
    let store = seed(&scope);

    let mut batch = WriteBatch::new();
    batch
        .remove(id("c"))
        .remove(id("y"))
        .remove(id("z"))
        .put(numbered("b", Some("root"), 4, 5))
        .put(numbered("root", None, 1, 6));
    store.write_batch(&scope, batch).unwrap();

    let rows = store.scan_scope(&scope).unwrap();
    assert_eq!(ids(&rows), vec!["root", "a", "b"]);
    assert_eq!(store.read_node(&scope, &id("root")).unwrap().rgt, 6);
}

#[test]
fn test_rejected_batch_changes_nothing() {
    let scope = ScopeId::global("Territory");
    let store = seed(&scope);
    let before = store.scan_scope(&scope).unwrap();

    let mut batch = WriteBatch::new();
    batch
        .put(numbered("root", None, 1, 100))
        .put(numbered("a", Some("root"), 2, 99))
        .remove(id("a"));
    let err = store.write_batch(&scope, batch).unwrap_err();
    assert!(matches!(
        err,
        Error::Backend(BackendError::BatchRejected { .. })
    ));
    assert!(!err.is_retryable());

    assert_eq!(store.scan_scope(&scope).unwrap(), before);
}

#[test]
fn test_scopes_are_isolated() {
    let territory = ScopeId::global("Territory");
    let store = seed(&territory);
    let acme = ScopeId::new("Account", "Acme");
    let globex = ScopeId::new("Account", "Globex");

    for scope in [&acme, &globex] {
        let mut batch = WriteBatch::new();
        batch.put(numbered("root", None, 1, 2));
        store.write_batch(scope, batch).unwrap();
    }

    assert_eq!(store.read_numbered(&acme).unwrap().len(), 1);
    assert_eq!(store.read_numbered(&territory).unwrap().len(), 4);

    let mut scopes = store.scopes().unwrap();
    scopes.sort();
    assert_eq!(scopes, vec![acme.clone(), globex, territory]);

    // Removing the last row of a scope drops it from the listing
    let mut batch = WriteBatch::new();
    batch.remove(id("root"));
    store.write_batch(&acme, batch).unwrap();
    assert!(!store.scopes().unwrap().contains(&acme));
}

#[test]
fn test_empty_batch_is_accepted() {
    let scope = ScopeId::global("Territory");
    let store = test_store();
    store.write_batch(&scope, WriteBatch::new()).unwrap();
    assert!(store.scan_scope(&scope).unwrap().is_empty());
}

#[test]
fn test_payload_and_order_key_survive_storage() {
    let scope = ScopeId::new("Account", "Acme");
    let store = test_store();
    let mut node = numbered("cash", None, 1, 2);
    node.order_key = Some("1100".to_string());
    node.payload = serde_json::json!({"currency": "EUR"});
    node.old_parent = Some(id("assets"));

    let mut batch = WriteBatch::new();
    batch.put(node.clone());
    store.write_batch(&scope, batch).unwrap();

    assert_eq!(store.read_node(&scope, &id("cash")).unwrap(), node);
}
