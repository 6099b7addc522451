use std::sync::Arc;

use tempfile::TempDir;

use canopy::{Forest, NewNode, backend::NodeStore, backend::database::InMemory};

use crate::helpers::*;

#[test]
fn test_in_memory_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forest.json");

    let store = Arc::new(InMemory::new());
    let forest = Forest::from_store(store.clone());
    let scope = setup_world(&forest);
    let before = numbering(&forest, &scope);
    store.save_to_file(&path).unwrap();
    assert!(path.exists());

    let loaded = InMemory::load_from_file(&path).unwrap();
    assert_eq!(loaded.len(), 6);
    let forest = Forest::new(loaded);
    assert_eq!(numbering(&forest, &scope), before);
    assert!(forest.check(&scope).unwrap().is_consistent());

    // The reloaded tree keeps accepting mutations
    forest
        .insert(&scope, Some(&id("Asia")), NewNode::leaf().with_id("Korea"))
        .unwrap();
}

#[test]
fn test_load_non_existent_file() {
    let dir = TempDir::new().unwrap();
    let store = InMemory::load_from_file(dir.path().join("absent.json")).unwrap();
    assert!(store.is_empty());
    assert!(store.scopes().unwrap().is_empty());
}

#[test]
fn test_load_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("invalid.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let err = InMemory::load_from_file(&path).unwrap_err();
    assert!(err.is_io_error());
    assert_eq!(err.module(), "backend");
}

#[test]
fn test_saved_file_keeps_unnumbered_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("import.json");

    let store = InMemory::new();
    let scope = canopy::ScopeId::new("Department", "Acme");
    let mut batch = canopy::backend::WriteBatch::new();
    batch.put(canopy::TreeNode::unnumbered("All", None, true));
    store.write_batch(&scope, batch).unwrap();
    store.save_to_file(&path).unwrap();

    let forest = Forest::new(InMemory::load_from_file(&path).unwrap());
    assert!(forest.store().read_numbered(&scope).unwrap().is_empty());
    assert_eq!(forest.rebuild(&scope).unwrap(), 1);
    assert_eq!(numbering(&forest, &scope), vec![("All".to_string(), 1, 2)]);
}
