//! Session commands - show or replace the open-file list.

use crate::app::App;
use std::path::PathBuf;

/// Print the open files, in order.
pub fn show(app: &App) -> anyhow::Result<()> {
    if !app.workspace.is_open() {
        eprintln!("No workspace open. Pass --root to select one.");
        return Ok(());
    }

    let paths = app.workspace.load_session()?;
    if paths.is_empty() {
        eprintln!("Session is empty.");
    }
    for path in &paths {
        println!("{}", path.display());
    }

    Ok(())
}

/// Replace the session with `paths`.
pub fn save(app: &App, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    if !app.workspace.is_open() {
        eprintln!("No workspace open. Pass --root to select one.");
        return Ok(());
    }

    let paths: Vec<PathBuf> = paths.iter().map(|p| app.resolve(p)).collect();
    let count = paths.len();
    app.workspace.save_session(paths)?;
    println!("Saved session with {} files", count);

    Ok(())
}
