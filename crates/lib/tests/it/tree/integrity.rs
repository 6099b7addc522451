use canopy::{
    NewNode, ScopeId, TreeNode,
    backend::WriteBatch,
    tree::{TreeError, Violation},
};

use crate::helpers::*;

/// Writes `rows` straight to the store, bypassing the mutator.
fn overwrite(forest: &canopy::Forest, scope: &ScopeId, rows: Vec<TreeNode>) {
    let mut batch = WriteBatch::new();
    for row in rows {
        batch.put(row);
    }
    forest.store().write_batch(scope, batch).unwrap();
}

#[test]
fn test_check_reports_specific_violations() {
    let forest = test_forest();
    let scope = setup_world(&forest);

    // Japan escapes Asia and collides with Germany
    let mut japan = forest.store().read_node(&scope, &id("Japan")).unwrap();
    (japan.lft, japan.rgt) = (6, 9);
    overwrite(&forest, &scope, vec![japan]);

    let report = forest.check(&scope).unwrap();
    assert!(!report.is_consistent());
    assert_eq!(report.nodes, 6);
    assert!(report.violations.contains(&Violation::ParentDoesNotContain {
        node: id("Japan"),
        parent: id("Asia"),
    }));
    assert!(report.violations.contains(&Violation::DuplicateBoundary { value: 6 }));
    assert!(
        report
            .violations
            .iter()
            .any(|violation| matches!(violation, Violation::Overlap { .. }))
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["violations"][0]["kind"], "duplicate_boundary");
}

#[test]
fn test_halt_is_per_scope() {
    let forest = test_forest();
    let world = setup_world(&forest);
    let accounts = forest.resolve("Account", "Acme").unwrap();
    forest
        .insert(&accounts, None, NewNode::group().with_id("Assets"))
        .unwrap();

    let mut asia = forest.store().read_node(&world, &id("Asia")).unwrap();
    asia.rgt = 20;
    overwrite(&forest, &world, vec![asia]);

    let err = forest
        .insert(&world, Some(&id("Asia")), NewNode::leaf())
        .unwrap_err();
    assert!(err.is_invariant_violation());
    assert_eq!(forest.halted_scopes(), vec![world.clone()]);

    // Other scopes keep working, and reads of the halted scope still answer
    forest
        .insert(&accounts, Some(&id("Assets")), NewNode::leaf())
        .unwrap();
    let query = forest.query(&world).unwrap();
    assert_eq!(query.children_of(&id("Europe")).unwrap().len(), 2);

    let err = forest
        .move_node(&world, &id("Japan"), Some(&id("Europe")))
        .unwrap_err();
    match err {
        canopy::Error::Tree(TreeError::ScopeHalted { scope, reason }) => {
            assert_eq!(scope, world);
            assert!(!reason.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }

    // Clones share the halted set
    let clone = forest.clone();
    assert!(clone.delete(&world, &id("Japan"), false).unwrap_err().is_halted());

    clone.rebuild(&world).unwrap();
    assert!(forest.halted_scopes().is_empty());
    forest
        .move_node(&world, &id("Japan"), Some(&id("Europe")))
        .unwrap();
    assert!(forest.check(&world).unwrap().is_consistent());
}

#[test]
fn test_bulk_import_then_rebuild() {
    let forest = test_forest();
    let scope = forest.resolve("Account", "Acme").unwrap();

    let mut rows = Vec::new();
    for (name, parent, group, key) in [
        ("Expenses", None, true, Some("5")),
        ("Assets", None, true, Some("1")),
        ("Bank", Some("Assets"), true, None),
        ("Cash", Some("Assets"), false, Some("1100")),
        ("Checking", Some("Bank"), false, None),
        ("Rent", Some("Expenses"), false, None),
    ] {
        let mut row = TreeNode::unnumbered(name, parent.map(canopy::NodeId::from), group);
        row.order_key = key.map(str::to_string);
        rows.push(row);
    }
    overwrite(&forest, &scope, rows);

    let report = forest.check(&scope).unwrap();
    assert_eq!(report.violations.len(), 6);
    assert!(
        report
            .violations
            .iter()
            .all(|violation| matches!(violation, Violation::Unnumbered { .. }))
    );

    assert_eq!(forest.rebuild(&scope).unwrap(), 6);
    // Keyed siblings come first in key order, unkeyed ones follow by id
    assert_eq!(
        numbering(&forest, &scope),
        vec![
            ("Assets".to_string(), 1, 8),
            ("Cash".to_string(), 2, 3),
            ("Bank".to_string(), 4, 7),
            ("Checking".to_string(), 5, 6),
            ("Expenses".to_string(), 9, 12),
            ("Rent".to_string(), 10, 11),
        ]
    );
    assert!(forest.check(&scope).unwrap().is_consistent());
}

#[test]
fn test_rebuild_rejects_dangling_parent() {
    let forest = test_forest();
    let scope = forest.resolve("Location", "").unwrap();
    overwrite(
        &forest,
        &scope,
        vec![
            TreeNode::unnumbered("Plant", None, true),
            TreeNode::unnumbered("Hall", Some(id("Building")), true),
        ],
    );

    let err = forest.rebuild(&scope).unwrap_err();
    assert!(err.is_invariant_violation());
    // Nothing was renumbered
    assert!(forest.store().read_numbered(&scope).unwrap().is_empty());
}

#[test]
fn test_rebuild_preserves_sibling_order() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    forest
        .move_node(&scope, &id("Europe"), Some(&id("Asia")))
        .unwrap();
    let before = numbering(&forest, &scope);

    assert_eq!(forest.rebuild(&scope).unwrap(), 0);
    assert_eq!(numbering(&forest, &scope), before);
}
