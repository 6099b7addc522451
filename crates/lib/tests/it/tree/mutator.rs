use std::sync::Arc;
use std::time::Duration;

use canopy::{
    Deadline, Error, FixedClock, Forest, NewNode,
    tree::{Mutation, MutationOutcome, MutationPhase, TreeError},
};

use crate::helpers::*;

#[test]
fn test_world_numbering() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    assert_eq!(
        numbering(&forest, &scope),
        vec![
            ("World".to_string(), 1, 12),
            ("Europe".to_string(), 2, 7),
            ("France".to_string(), 3, 4),
            ("Germany".to_string(), 5, 6),
            ("Asia".to_string(), 8, 11),
            ("Japan".to_string(), 9, 10),
        ]
    );
}

#[test]
fn test_first_insert_into_empty_scope() {
    let forest = test_forest();
    let scope = forest.resolve("Cost Center", "Acme").unwrap();
    let root = forest.insert(&scope, None, NewNode::group()).unwrap();
    assert_eq!((root.lft, root.rgt), (1, 2));
    assert!(root.parent_id.is_none());
    assert!(!root.id.is_empty());
}

#[test]
fn test_move_group_across_branches() {
    let forest = test_forest();
    let scope = setup_world(&forest);

    let moved = forest
        .move_node(&scope, &id("Europe"), Some(&id("Asia")))
        .unwrap();
    assert_eq!(moved.old_parent, Some(id("World")));
    assert_eq!(
        numbering(&forest, &scope),
        vec![
            ("World".to_string(), 1, 12),
            ("Asia".to_string(), 2, 11),
            ("Japan".to_string(), 3, 4),
            ("Europe".to_string(), 5, 10),
            ("France".to_string(), 6, 7),
            ("Germany".to_string(), 8, 9),
        ]
    );
    assert!(forest.check(&scope).unwrap().is_consistent());

    // And back again restores the original shape
    forest
        .move_node(&scope, &id("Europe"), Some(&id("World")))
        .unwrap();
    let query = forest.query(&scope).unwrap();
    assert_eq!(
        ids(&query.children_of(&id("World")).unwrap()),
        vec!["Asia", "Europe"]
    );
    assert_eq!(
        query.node(&id("Europe")).unwrap().old_parent,
        Some(id("Asia"))
    );
}

#[test]
fn test_rejections_leave_store_untouched() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    let before = numbering(&forest, &scope);

    let attempts: Vec<(&str, Error)> = vec![
        (
            "leaf parent",
            forest
                .insert(&scope, Some(&id("Japan")), NewNode::leaf())
                .unwrap_err(),
        ),
        (
            "second root",
            forest.insert(&scope, None, NewNode::group()).unwrap_err(),
        ),
        (
            "cycle",
            forest
                .move_node(&scope, &id("Europe"), Some(&id("France")))
                .unwrap_err(),
        ),
        (
            "has children",
            forest.delete(&scope, &id("Asia"), false).unwrap_err(),
        ),
        (
            "duplicate",
            forest
                .insert(&scope, Some(&id("Asia")), NewNode::leaf().with_id("France"))
                .unwrap_err(),
        ),
    ];
    for (what, err) in attempts {
        assert!(err.is_validation_error(), "{what}: {err}");
        assert!(!err.is_retryable(), "{what}");
    }

    let missing = forest
        .insert(&scope, Some(&id("Atlantis")), NewNode::leaf())
        .unwrap_err();
    assert!(missing.is_not_found());

    assert_eq!(numbering(&forest, &scope), before);
    assert!(forest.halted_scopes().is_empty());
}

#[test]
fn test_cascade_delete_and_reinsert() {
    let forest = test_forest();
    let scope = setup_world(&forest);

    let removed = forest.delete(&scope, &id("Europe"), true).unwrap();
    assert_eq!(removed, vec![id("Europe"), id("France"), id("Germany")]);
    assert_eq!(
        numbering(&forest, &scope),
        vec![
            ("World".to_string(), 1, 6),
            ("Asia".to_string(), 2, 5),
            ("Japan".to_string(), 3, 4),
        ]
    );

    forest
        .insert(&scope, Some(&id("World")), NewNode::group().with_id("Europe"))
        .unwrap();
    assert!(forest.check(&scope).unwrap().is_consistent());
}

#[test]
fn test_delete_last_node_empties_scope() {
    let forest = test_forest();
    let scope = forest.resolve("Warehouse", "Acme").unwrap();
    let root = forest.insert(&scope, None, NewNode::group()).unwrap();
    forest.delete(&scope, &root.id, false).unwrap();
    assert!(forest.store().scan_scope(&scope).unwrap().is_empty());

    // The scope accepts a fresh root afterwards
    let again = forest.insert(&scope, None, NewNode::group()).unwrap();
    assert_eq!((again.lft, again.rgt), (1, 2));
}

#[test]
fn test_apply_returns_outcomes() {
    let forest = test_forest();
    let scope = setup_world(&forest);

    let outcome = forest
        .apply(
            &scope,
            Mutation::Convert {
                node: id("Japan"),
                is_group: true,
            },
            None,
        )
        .unwrap();
    assert!(outcome.node().unwrap().is_group);

    let outcome = forest
        .apply(
            &scope,
            Mutation::Insert {
                parent: Some(id("Japan")),
                node: NewNode::leaf().with_id("Tokyo"),
            },
            None,
        )
        .unwrap();
    let tokyo = outcome.into_node().unwrap();
    assert_eq!((tokyo.lft, tokyo.rgt), (10, 11));

    let outcome = forest
        .apply(
            &scope,
            Mutation::Delete {
                node: id("Japan"),
                cascade: true,
            },
            None,
        )
        .unwrap();
    assert_eq!(
        outcome,
        MutationOutcome::Deleted {
            removed: vec![id("Japan"), id("Tokyo")]
        }
    );
}

#[test]
fn test_expired_deadline_rejects_up_front() {
    let clock = Arc::new(FixedClock::new(5_000));
    let forest = test_forest().with_clock(clock.clone());
    let scope = setup_world(&forest);
    let before = numbering(&forest, &scope);

    let deadline = Deadline::after(clock.as_ref(), Duration::from_millis(100));
    clock.advance(100);
    let err = forest
        .apply(
            &scope,
            Mutation::Move {
                node: id("Japan"),
                new_parent: Some(id("Europe")),
            },
            Some(deadline),
        )
        .unwrap_err();
    assert!(err.is_deadline_exceeded());
    assert!(matches!(
        err,
        Error::Tree(TreeError::DeadlineExceeded {
            phase: MutationPhase::Validating,
            ..
        })
    ));
    assert_eq!(numbering(&forest, &scope), before);
    assert!(forest.halted_scopes().is_empty());
}

#[test]
fn test_failed_write_is_retryable() {
    let store = Arc::new(FaultyStore::new());
    let forest = Forest::from_store(store.clone());
    let scope = setup_world(&forest);
    let before = numbering(&forest, &scope);

    store.fail_next_writes(2);
    for _ in 0..2 {
        let err = forest
            .move_node(&scope, &id("Japan"), Some(&id("Europe")))
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(numbering(&forest, &scope), before);
    }

    // Retrying the same request succeeds once the store recovers
    let japan = forest
        .move_node(&scope, &id("Japan"), Some(&id("Europe")))
        .unwrap();
    assert_eq!(japan.old_parent, Some(id("Asia")));
    assert!(forest.check(&scope).unwrap().is_consistent());
    assert!(forest.halted_scopes().is_empty());

    // The retried move leaves the same tree as one that never failed
    let control = test_forest();
    let control_scope = setup_world(&control);
    let control_japan = control
        .move_node(&control_scope, &id("Japan"), Some(&id("Europe")))
        .unwrap();
    assert_eq!(
        numbering(&forest, &scope),
        numbering(&control, &control_scope)
    );
    assert_eq!(japan, control_japan);
}

#[test]
fn test_unverified_writes_still_number_correctly() {
    let forest = test_forest().with_verify_writes(false);
    let scope = setup_world(&forest);
    forest
        .move_node(&scope, &id("Asia"), Some(&id("Europe")))
        .unwrap();
    forest.delete(&scope, &id("France"), false).unwrap();
    assert!(forest.check(&scope).unwrap().is_consistent());
}
