//! Application state management.

use std::path::{Path, PathBuf};
use tnet_core::{paths, Config, Workspace};
use tracing::info;

/// Shared application state.
pub struct App {
    /// The workspace every command operates on
    pub workspace: Workspace,

    /// Base for relative paths given on the command line
    cwd: PathBuf,
}

impl App {
    /// Create a new application instance.
    ///
    /// Without a root the workspace is unset: file commands still work but
    /// nothing is recorded in a session or keyword index.
    pub fn new(config: &Config, root: Option<PathBuf>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let root = root
            .map(|r| absolute(&cwd, &r))
            .unwrap_or_default();
        let workspace = Workspace::open(&root, config)?;

        info!(
            root = %root.display(),
            open = workspace.is_open(),
            "Application initialized"
        );

        Ok(App { workspace, cwd })
    }

    /// Absolute, normalized form of a command-line path.
    ///
    /// Keyword and session entries hold absolute paths, so relative arguments
    /// must be resolved the same way every time.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        absolute(&self.cwd, path)
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        paths::normalize(path)
    } else {
        paths::normalize(&cwd.join(path))
    }
}
