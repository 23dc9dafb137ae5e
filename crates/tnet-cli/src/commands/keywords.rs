//! Keyword commands - inspect and rebuild the keyword index.

use crate::app::App;
use crate::OutputFormat;
use std::time::Instant;

/// List every keyword and its file.
pub fn list(app: &App, output: OutputFormat) -> anyhow::Result<()> {
    let index = app.workspace.keywords();

    match output {
        OutputFormat::Text => {
            for (name, path) in &index {
                println!("{}\t{}", name, path.display());
            }

            eprintln!();
            eprintln!("{} keywords", index.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&index)?);
        }
    }

    Ok(())
}

/// Print the file declaring `name`.
pub fn get(app: &App, name: &str) -> anyhow::Result<()> {
    let index = app.workspace.keywords();
    match index.get(name) {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("Keyword not found: {}", name),
    }
    Ok(())
}

/// List up to `limit` keywords starting with `prefix`.
pub fn complete(app: &App, prefix: &str, limit: usize) -> anyhow::Result<()> {
    let index = app.workspace.keywords();
    for (name, _) in index.with_prefix(prefix).take(limit) {
        println!("{}", name);
    }
    Ok(())
}

/// Rebuild the index from the files on disk.
pub fn reindex(app: &App) -> anyhow::Result<()> {
    if !app.workspace.is_open() {
        eprintln!("No workspace open. Pass --root to select one.");
        return Ok(());
    }

    let start = Instant::now();
    let count = app.workspace.rebuild_keywords()?;
    println!(
        "Indexed {} keywords in {:.3}ms",
        count,
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
