//! Lists the stored trees.

use crate::backend::{Session, backend_label};
use crate::cli::StoreArgs;
use crate::output::{OutputFormat, print_table};

/// Run the scopes command
pub fn run(
    session: &Session,
    args: &StoreArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = session.forest.store();
    let mut rows = Vec::new();
    for scope in session.forest.scopes()? {
        let nodes = store.scan_scope(&scope)?.len();
        rows.push((scope, nodes));
    }

    match format {
        OutputFormat::Human => {
            println!("Backend: {}", backend_label(args));
            if rows.is_empty() {
                println!("No trees found.");
                return Ok(());
            }
            let table: Vec<Vec<String>> = rows
                .iter()
                .map(|(scope, nodes)| {
                    vec![
                        scope.entity_type().to_string(),
                        scope.context().to_string(),
                        nodes.to_string(),
                    ]
                })
                .collect();
            print_table(&["TYPE", "CONTEXT", "NODES"], &table);
        }
        OutputFormat::Json => {
            let entries: Vec<_> = rows
                .iter()
                .map(|(scope, nodes)| {
                    serde_json::json!({
                        "entity_type": scope.entity_type(),
                        "context": scope.context(),
                        "nodes": nodes,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string(&entries)?);
        }
    }
    Ok(())
}
