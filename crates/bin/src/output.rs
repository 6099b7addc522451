//! Output formatting helpers for human-readable and JSON output.

use canopy::TreeNode;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    println!("{}", aligned(headers.iter(), &widths));
    for row in rows {
        println!("{}", aligned(row.iter().take(col_count), &widths));
    }
}

fn aligned<S: AsRef<str>>(cells: impl Iterator<Item = S>, widths: &[usize]) -> String {
    let cells: Vec<String> = cells
        .enumerate()
        .map(|(i, cell)| format!("{:<width$}", cell.as_ref(), width = widths[i]))
        .collect();
    cells.join("  ")
}

/// Prints nodes as a table, or as a JSON array.
pub fn print_nodes(
    nodes: &[TreeNode],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Human => {
            if nodes.is_empty() {
                println!("No nodes.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = nodes.iter().map(node_row).collect();
            print_table(&["ID", "PARENT", "KIND", "LFT", "RGT"], &rows);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(nodes)?),
    }
    Ok(())
}

fn node_row(node: &TreeNode) -> Vec<String> {
    vec![
        node.id.to_string(),
        node.parent_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string()),
        if node.is_group { "group" } else { "leaf" }.to_string(),
        node.lft.to_string(),
        node.rgt.to_string(),
    ]
}
