//! Tree command - show the sorted directory tree.

use crate::app::App;
use crate::OutputFormat;
use std::path::PathBuf;
use tnet_core::FileNode;

/// Run the tree command.
pub fn run(app: &App, dir: Option<PathBuf>, output: OutputFormat) -> anyhow::Result<()> {
    let nodes = match dir {
        Some(dir) => app.workspace.file_tree_of(&app.resolve(&dir))?,
        None if app.workspace.is_open() => app.workspace.file_tree()?,
        None => {
            eprintln!("No workspace open. Pass --root or a directory.");
            return Ok(());
        }
    };

    match output {
        OutputFormat::Text => {
            for node in &nodes {
                print_node(node, 0);
            }

            eprintln!();
            eprintln!(
                "{} entries",
                nodes.iter().map(FileNode::count).sum::<usize>()
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
    }

    Ok(())
}

fn print_node(node: &FileNode, depth: usize) {
    let indent = "  ".repeat(depth);
    if node.is_directory {
        println!("{}{}/", indent, node.name);
        for child in node.children() {
            print_node(child, depth + 1);
        }
    } else {
        println!("{}{}", indent, node.name);
    }
}
