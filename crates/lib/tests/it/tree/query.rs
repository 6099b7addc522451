use canopy::NewNode;

use crate::helpers::*;

#[test]
fn test_ancestors_root_first() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    let query = forest.query(&scope).unwrap();

    assert_eq!(
        ids(&query.ancestors_of(&id("Germany")).unwrap()),
        vec!["World", "Europe"]
    );
    assert!(query.ancestors_of(&id("World")).unwrap().is_empty());
    assert_eq!(query.depth_of(&id("Japan")).unwrap(), 2);
    assert_eq!(query.depth_of(&id("World")).unwrap(), 0);
}

#[test]
fn test_descendants_with_and_without_groups() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    let query = forest.query(&scope).unwrap();

    assert_eq!(
        ids(&query.descendants_of(&id("World"), true).unwrap()),
        vec!["Europe", "France", "Germany", "Asia", "Japan"]
    );
    assert_eq!(
        ids(&query.descendants_of(&id("World"), false).unwrap()),
        vec!["France", "Germany", "Japan"]
    );
    assert!(query.descendants_of(&id("France"), true).unwrap().is_empty());
}

#[test]
fn test_descendant_count_matches_width() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    let query = forest.query(&scope).unwrap();

    for node in query.all().unwrap() {
        let descendants = query.descendants_of(&node.id, true).unwrap();
        assert_eq!(descendants.len() as i64, node.descendant_count(), "{}", node.id);
        for descendant in &descendants {
            assert!(query.is_descendant_of(&descendant.id, &node.id).unwrap());
            assert!(!query.is_descendant_of(&node.id, &descendant.id).unwrap());
        }
    }
    assert!(!query.is_descendant_of(&id("World"), &id("World")).unwrap());
}

#[test]
fn test_children_and_siblings() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    let query = forest.query(&scope).unwrap();

    assert_eq!(
        ids(&query.children_of(&id("World")).unwrap()),
        vec!["Europe", "Asia"]
    );
    assert_eq!(
        ids(&query.children_of(&id("Europe")).unwrap()),
        vec!["France", "Germany"]
    );
    assert!(query.children_of(&id("Japan")).unwrap().is_empty());

    assert_eq!(ids(&query.siblings_of(&id("France")).unwrap()), vec!["Germany"]);
    assert_eq!(ids(&query.siblings_of(&id("Asia")).unwrap()), vec!["Europe"]);
    assert!(query.siblings_of(&id("Japan")).unwrap().is_empty());
    assert!(query.siblings_of(&id("World")).unwrap().is_empty());
}

#[test]
fn test_roots_of_multi_root_scope() {
    let forest = test_forest();
    let scope = forest.resolve("Account", "Acme").unwrap();
    for name in ["Assets", "Liabilities", "Equity"] {
        forest
            .insert(&scope, None, NewNode::group().with_id(name))
            .unwrap();
    }
    forest
        .insert(&scope, Some(&id("Assets")), NewNode::leaf().with_id("Cash"))
        .unwrap();

    let query = forest.query(&scope).unwrap();
    assert_eq!(
        ids(&query.roots().unwrap()),
        vec!["Assets", "Liabilities", "Equity"]
    );
    assert_eq!(
        ids(&query.siblings_of(&id("Equity")).unwrap()),
        vec!["Assets", "Liabilities"]
    );
    assert_eq!(query.scope(), &scope);
}

#[test]
fn test_query_unknown_node() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    let query = forest.query(&scope).unwrap();

    assert!(query.node(&id("Atlantis")).unwrap_err().is_not_found());
    assert!(query.ancestors_of(&id("Atlantis")).unwrap_err().is_not_found());
    assert!(
        query
            .is_descendant_of(&id("France"), &id("Atlantis"))
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn test_queries_see_committed_moves() {
    let forest = test_forest();
    let scope = setup_world(&forest);
    let query = forest.query(&scope).unwrap();

    forest
        .move_node(&scope, &id("Japan"), Some(&id("Europe")))
        .unwrap();
    assert_eq!(
        ids(&query.ancestors_of(&id("Japan")).unwrap()),
        vec!["World", "Europe"]
    );
    assert!(query.children_of(&id("Asia")).unwrap().is_empty());
}
