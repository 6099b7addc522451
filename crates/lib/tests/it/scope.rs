use canopy::{
    Error, Forest, ForestConfig, NewNode,
    backend::database::InMemory,
    scope::{HierarchyConfig, ScopeError},
};

use crate::helpers::*;

#[test]
fn test_same_ids_in_different_contexts() {
    let forest = test_forest();
    let acme = forest.resolve("Cost Center", "Acme").unwrap();
    let globex = forest.resolve("Cost Center", "Globex").unwrap();
    assert_ne!(acme, globex);

    for scope in [&acme, &globex] {
        forest
            .insert(scope, None, NewNode::group().with_id("Main"))
            .unwrap();
        forest
            .insert(scope, Some(&id("Main")), NewNode::leaf().with_id("Ops"))
            .unwrap();
    }
    forest.delete(&acme, &id("Ops"), false).unwrap();

    assert_eq!(numbering(&forest, &acme), vec![("Main".to_string(), 1, 2)]);
    assert_eq!(
        numbering(&forest, &globex),
        vec![("Main".to_string(), 1, 4), ("Ops".to_string(), 2, 3)]
    );
}

#[test]
fn test_context_rules() {
    let forest = test_forest();

    let err = forest.resolve("Account", "").unwrap_err();
    assert!(matches!(
        err,
        Error::Scope(ScopeError::MissingContext { .. })
    ));
    let err = forest.resolve("Item Group", "Acme").unwrap_err();
    assert!(matches!(
        err,
        Error::Scope(ScopeError::UnexpectedContext { .. })
    ));
    assert!(forest.resolve("Sales Invoice", "").unwrap_err().is_not_found());

    let scope = forest.resolve("Item Group", "").unwrap();
    assert!(scope.is_global());
    assert_eq!(scope.to_string(), "Item Group");
}

#[test]
fn test_configured_hierarchy() {
    let config: ForestConfig = serde_json::from_str(
        r#"{
            "hierarchies": [
                {"entity_type": "Project Phase", "context_required": true, "require_order_key": true}
            ]
        }"#,
    )
    .unwrap();
    let forest = Forest::new(InMemory::new()).configure(&config).unwrap();
    assert_eq!(
        forest.registry().hierarchy("Project Phase").unwrap(),
        HierarchyConfig {
            context_required: true,
            policy: canopy::ScopePolicy::single_root().with_required_order_key(),
        }
    );

    let scope = forest.resolve("Project Phase", "Apollo").unwrap();
    assert!(forest.insert(&scope, None, NewNode::group()).is_err());
    let root = forest
        .insert(&scope, None, NewNode::group().with_order_key("0"))
        .unwrap();
    assert_eq!(root.order_key.as_deref(), Some("0"));

    // Standard hierarchies are still there
    assert!(forest.resolve("Territory", "").is_ok());
}
