//! Check command - report malformed keyword declarations.

use crate::app::App;
use std::path::Path;
use tnet_core::declarations;

/// Run the check command.
///
/// Exits with an error when any issue is found, so it can gate scripts.
pub fn run(app: &App, file: &Path) -> anyhow::Result<()> {
    let file = app.resolve(file);
    let content = app.workspace.read(&file)?;
    let report = declarations::scan(&content);

    for declaration in &report.declarations {
        println!(
            "{}:{}: keyword {:?}",
            file.display(),
            declaration.line,
            declaration.name
        );
    }
    for issue in &report.issues {
        println!("{}:{}: {}", file.display(), issue.line, issue.kind);
    }

    if !report.is_clean() {
        anyhow::bail!("{} declaration issue(s) in {}", report.issues.len(), file.display());
    }
    Ok(())
}
