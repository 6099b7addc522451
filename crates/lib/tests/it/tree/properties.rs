//! Random mutation sequences must never break the nested-set invariants,
//! and the range queries must agree with each other after every step.

use proptest::prelude::*;

use canopy::{Forest, NewNode, NodeId, ScopeId};

use crate::helpers::*;

#[derive(Debug, Clone)]
enum Op {
    Insert {
        parent: Option<usize>,
        group: bool,
        order_key: Option<String>,
    },
    Move { node: usize, parent: Option<usize> },
    Delete { node: usize, cascade: bool },
    Convert { node: usize, group: bool },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (
            proptest::option::of(any::<usize>()),
            any::<bool>(),
            proptest::option::of("[a-d]"),
        )
            .prop_map(|(parent, group, order_key)| Op::Insert {
                parent,
                group,
                order_key,
            }),
        3 => (any::<usize>(), proptest::option::of(any::<usize>()))
            .prop_map(|(node, parent)| Op::Move { node, parent }),
        1 => (any::<usize>(), any::<bool>())
            .prop_map(|(node, cascade)| Op::Delete { node, cascade }),
        1 => (any::<usize>(), any::<bool>())
            .prop_map(|(node, group)| Op::Convert { node, group }),
    ]
}

/// Applies one op, mapping indices onto the ids currently stored.
fn apply(forest: &Forest, scope: &ScopeId, op: &Op) -> canopy::Result<()> {
    let ids: Vec<NodeId> = forest
        .store()
        .read_numbered(scope)?
        .into_iter()
        .map(|node| node.id)
        .collect();
    let pick = |index: usize| ids[index % ids.len()].clone();

    match op {
        Op::Insert {
            parent,
            group,
            order_key,
        } => {
            let parent = parent.filter(|_| !ids.is_empty()).map(pick);
            let mut node = NewNode::new(*group);
            if let Some(key) = order_key {
                node = node.with_order_key(key.as_str());
            }
            forest.insert(scope, parent.as_ref(), node)?;
        }
        _ if ids.is_empty() => {}
        Op::Move { node, parent } => {
            let parent = parent.map(pick);
            forest.move_node(scope, &pick(*node), parent.as_ref())?;
        }
        Op::Delete { node, cascade } => {
            forest.delete(scope, &pick(*node), *cascade)?;
        }
        Op::Convert { node, group } => {
            forest.convert(scope, &pick(*node), *group)?;
        }
    }
    Ok(())
}

/// Every node is found below its outermost ancestor, and containment agrees
/// with the ancestor list in both directions.
fn check_query_laws(forest: &Forest, scope: &ScopeId) -> Result<(), TestCaseError> {
    let query = forest.query(scope).unwrap();
    for node in query.all().unwrap() {
        let ancestors = query.ancestors_of(&node.id).unwrap();
        prop_assert_eq!(query.depth_of(&node.id).unwrap(), ancestors.len());
        prop_assert_eq!(ancestors.is_empty(), node.is_root());

        if let Some(root) = ancestors.first() {
            prop_assert!(root.is_root());
            let below_root = query.descendants_of(&root.id, true).unwrap();
            prop_assert!(
                below_root.iter().any(|descendant| descendant.id == node.id),
                "{} missing below {}",
                node.id,
                root.id
            );
        }
        for ancestor in &ancestors {
            prop_assert!(query.is_descendant_of(&node.id, &ancestor.id).unwrap());
            prop_assert!(!query.is_descendant_of(&ancestor.id, &node.id).unwrap());
        }
        prop_assert!(!query.is_descendant_of(&node.id, &node.id).unwrap());
        if let Some(parent) = &node.parent_id {
            prop_assert_eq!(ancestors.last().map(|a| &a.id), Some(parent));
        }
    }
    Ok(())
}

fn run(entity_type: &str, context: &str, ops: &[Op]) -> Result<(), TestCaseError> {
    let forest = test_forest();
    let scope = forest.resolve(entity_type, context).unwrap();

    for op in ops {
        let before = numbering(&forest, &scope);
        if let Err(err) = apply(&forest, &scope, op) {
            prop_assert!(err.is_validation_error(), "{op:?} failed with {err}");
            prop_assert_eq!(numbering(&forest, &scope), before);
        }

        let report = forest.check(&scope).unwrap();
        prop_assert!(report.is_consistent(), "after {:?}: {}", op, report);
        prop_assert!(forest.halted_scopes().is_empty());
        check_query_laws(&forest, &scope)?;
    }

    // The stored numbering is exactly what a rebuild from parent pointers gives
    prop_assert_eq!(forest.rebuild(&scope).unwrap(), 0);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_multi_root_scope_stays_consistent(ops in prop::collection::vec(op(), 1..40)) {
        run("Account", "Acme", &ops)?;
    }

    #[test]
    fn prop_single_root_scope_stays_consistent(ops in prop::collection::vec(op(), 1..40)) {
        run("Territory", "", &ops)?;
    }
}
