//! Open-file session of a workspace.
//!
//! The session is the ordered list of notes the user has open, persisted as
//! a JSON array in `<root>/.tnet/session.json`. The order is the caller's
//! (tab order) and is stored verbatim.
//!
//! Unlike the keyword index, a missing or corrupt session is an error when a
//! workspace is open: the caller gets a [`crate::TnetError::Read`] and decides what
//! to show. The synchronizer's own maintenance calls
//! ([`SessionStore::remove_path`], [`SessionStore::retarget_path`]) treat it as
//! empty instead, since there is nothing to clean up in that case.

use crate::error::Result;
use crate::paths;
use crate::persistence::JsonFile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Ordered list of open file paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState {
    paths: Vec<PathBuf>,
}

impl SessionState {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        SessionState { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every occurrence of `path`. Returns true if anything changed.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| !paths::same_path(p, path));
        self.paths.len() != before
    }

    /// Substitute `old` (and anything beneath it) with `new`, in place.
    pub fn retarget(&mut self, old: &Path, new: &Path) -> bool {
        let mut changed = false;
        for entry in &mut self.paths {
            if let Some(rebased) = paths::rebase(entry, old, new) {
                if *entry != rebased {
                    *entry = rebased;
                    changed = true;
                }
            }
        }
        changed
    }
}

impl From<Vec<PathBuf>> for SessionState {
    fn from(paths: Vec<PathBuf>) -> Self {
        SessionState { paths }
    }
}

/// Persistent session of one workspace root.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    file: JsonFile,
}

impl SessionStore {
    pub fn new(root: impl AsRef<Path>, settings_dir: &str) -> Self {
        let root = root.as_ref().to_path_buf();
        let file = JsonFile::new(paths::session_file(&root, settings_dir));
        SessionStore { root, file }
    }

    pub fn is_active(&self) -> bool {
        !paths::is_unset(&self.root)
    }

    pub fn file(&self) -> &JsonFile {
        &self.file
    }

    /// Persist `session`, creating the settings directory if needed.
    ///
    /// A no-op when no workspace is open.
    pub fn save(&self, session: &SessionState) -> Result<()> {
        if !self.is_active() {
            debug!("No workspace open, session not saved");
            return Ok(());
        }
        self.file.save(session)
    }

    /// Load the session.
    ///
    /// Returns an empty session without touching the disk when no workspace
    /// is open. Otherwise a missing or corrupt document is a read error.
    pub fn load(&self) -> Result<SessionState> {
        if !self.is_active() {
            return Ok(SessionState::default());
        }
        self.file.load()
    }

    /// Load the session, treating a missing or corrupt document as empty.
    pub fn load_or_empty(&self) -> SessionState {
        match self.load() {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "Session unavailable, treating as empty");
                SessionState::default()
            }
        }
    }

    /// Drop `path` from the session.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn remove_path(&self, path: &Path) -> Result<()> {
        self.update(|session| session.remove(path))
    }

    /// Replace `old` with `new` wherever it appears in the session.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn retarget_path(&self, old: &Path, new: &Path) -> Result<()> {
        self.update(|session| session.retarget(old, new))
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState) -> bool) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let mut session = self.load_or_empty();
        if apply(&mut session) {
            debug!(entries = session.len(), "Persisting session");
            self.save(&session)?;
        }
        Ok(())
    }
}
