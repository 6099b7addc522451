//! Read-only commands.

use canopy::{NodeId, TreeNode};

use crate::backend::Session;
use crate::cli::{DescendantsArgs, NodeArgs, ScopeArgs};
use crate::output::{OutputFormat, print_nodes};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Run the show command: the whole tree, indented by depth
pub fn show(session: &Session, args: &ScopeArgs, format: OutputFormat) -> CmdResult {
    let scope = session.scope(args)?;
    let nodes = session.forest.query(&scope)?.all()?;

    if format == OutputFormat::Json {
        return print_nodes(&nodes, format);
    }
    if nodes.is_empty() {
        println!("{scope} is empty.");
        return Ok(());
    }
    for (depth, node) in with_depth(&nodes) {
        let marker = if node.is_group { "+" } else { "-" };
        println!(
            "{:indent$}{marker} {} [{}, {}]",
            "",
            node.id,
            node.lft,
            node.rgt,
            indent = depth * 2
        );
    }
    Ok(())
}

/// Pairs nodes in `lft` order with their depth, tracked by a stack of open
/// right boundaries.
fn with_depth(nodes: &[TreeNode]) -> Vec<(usize, &TreeNode)> {
    let mut open: Vec<i64> = Vec::new();
    nodes
        .iter()
        .map(|node| {
            while open.last().is_some_and(|&rgt| rgt < node.lft) {
                open.pop();
            }
            let depth = open.len();
            open.push(node.rgt);
            (depth, node)
        })
        .collect()
}

/// Run the ancestors command
pub fn ancestors(session: &Session, args: &NodeArgs, format: OutputFormat) -> CmdResult {
    let scope = session.scope(&args.scope)?;
    let nodes = session
        .forest
        .query(&scope)?
        .ancestors_of(&NodeId::from(args.node.as_str()))?;
    print_nodes(&nodes, format)
}

/// Run the descendants command
pub fn descendants(session: &Session, args: &DescendantsArgs, format: OutputFormat) -> CmdResult {
    let scope = session.scope(&args.scope)?;
    let nodes = session
        .forest
        .query(&scope)?
        .descendants_of(&NodeId::from(args.node.as_str()), !args.leaves_only)?;
    print_nodes(&nodes, format)
}
