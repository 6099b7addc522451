//! Commands that change a tree.

use canopy::{NewNode, NodeId, tree::MutationOutcome};

use crate::backend::Session;
use crate::cli::{ConvertArgs, DeleteArgs, InsertArgs, MoveArgs, NodeKind};
use crate::output::{OutputFormat, print_nodes};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Run the insert command
pub fn insert(session: &Session, args: &InsertArgs, format: OutputFormat) -> CmdResult {
    let scope = session.scope(&args.scope)?;

    let mut node = NewNode::new(args.group);
    if let Some(id) = &args.id {
        node = node.with_id(id.as_str());
    }
    if let Some(key) = &args.order_key {
        node = node.with_order_key(key.as_str());
    }
    if let Some(payload) = &args.payload {
        node = node.with_payload(serde_json::from_str(payload)?);
    }

    let parent = args.parent.as_deref().map(NodeId::from);
    let node = session.forest.insert(&scope, parent.as_ref(), node)?;
    session.save()?;
    report(MutationOutcome::Inserted { node }, format)
}

/// Run the move command
pub fn move_node(session: &Session, args: &MoveArgs, format: OutputFormat) -> CmdResult {
    let scope = session.scope(&args.scope)?;
    let parent = args.parent.as_deref().map(NodeId::from);
    let node = session
        .forest
        .move_node(&scope, &NodeId::from(args.node.as_str()), parent.as_ref())?;
    session.save()?;
    report(MutationOutcome::Moved { node }, format)
}

/// Run the delete command
pub fn delete(session: &Session, args: &DeleteArgs, format: OutputFormat) -> CmdResult {
    let scope = session.scope(&args.scope)?;
    let node = NodeId::from(args.node.as_str());
    let removed = if args.cascade {
        session.forest.delete(&scope, &node, true)?
    } else {
        session.forest.delete_with_policy(&scope, &node)?
    };
    session.save()?;
    report(MutationOutcome::Deleted { removed }, format)
}

/// Run the convert command
pub fn convert(session: &Session, args: &ConvertArgs, format: OutputFormat) -> CmdResult {
    let scope = session.scope(&args.scope)?;
    let node = session.forest.convert(
        &scope,
        &NodeId::from(args.node.as_str()),
        args.kind == NodeKind::Group,
    )?;
    session.save()?;
    report(MutationOutcome::Converted { node }, format)
}

fn report(outcome: MutationOutcome, format: OutputFormat) -> CmdResult {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&outcome)?),
        OutputFormat::Human => match outcome {
            MutationOutcome::Deleted { removed } => {
                let names: Vec<&str> = removed.iter().map(NodeId::as_str).collect();
                println!("Deleted {} node(s): {}", removed.len(), names.join(", "));
            }
            other => {
                if let Some(node) = other.into_node() {
                    print_nodes(std::slice::from_ref(&node), format)?;
                }
            }
        },
    }
    Ok(())
}
