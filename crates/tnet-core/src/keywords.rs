//! Keyword index.
//!
//! Maps every declared keyword name to the file that most recently declared
//! it. The index lives in `<root>/.tnet/keywords.json` as a flat JSON object
//! `{ "name": "/abs/path.md" }`.
//!
//! Loading is deliberately forgiving: a missing or unparsable index is an
//! empty index, because the whole document can be rebuilt from the notes. The
//! session store takes the opposite stance (see [`crate::session`]).

use crate::declarations;
use crate::error::Result;
use crate::paths;
use crate::persistence::JsonFile;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashSet;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Every keyword name declared in `content`, deduplicated, in the order first
/// encountered.
pub fn extract_declared_names(content: &str) -> Vec<String> {
    let report = declarations::scan(content);
    for issue in &report.issues {
        debug!(
            line = issue.line,
            offset = issue.offset,
            issue = %issue.kind,
            "Keyword declaration issue"
        );
    }

    let mut seen = HashSet::new();
    report
        .declarations
        .into_iter()
        .map(|d| d.name)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// In-memory keyword index.
///
/// Keys are kept sorted so the persisted document is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordIndex {
    entries: BTreeMap<String, PathBuf>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File declaring `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    /// Names currently owned by `file`.
    pub fn names_for(&self, file: &Path) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, owner)| paths::same_path(owner, file))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Entries whose name starts with `prefix`, in name order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a Path)> {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(name, _)| name.starts_with(prefix))
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, PathBuf> {
        self.entries.iter()
    }

    /// Drop every entry owned by `file`. Returns true if anything changed.
    pub fn purge(&mut self, file: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|_, owner| !paths::same_path(owner, file));
        self.entries.len() != before
    }

    /// Replace `file`'s declarations with `names`.
    ///
    /// Stale names are purged first, then every name is pointed at `file`,
    /// taking ownership from any other file that declared it before.
    pub fn replace_declarations<I>(&mut self, file: &Path, names: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let previous = self.clone();
        self.purge(file);
        for name in names {
            self.entries.insert(name, file.to_path_buf());
        }
        *self != previous
    }

    /// Move entries owned by `old` (or by anything beneath it) to `new`.
    pub fn retarget(&mut self, old: &Path, new: &Path) -> bool {
        let mut changed = false;
        for owner in self.entries.values_mut() {
            if let Some(rebased) = paths::rebase(owner, old, new) {
                if *owner != rebased {
                    *owner = rebased;
                    changed = true;
                }
            }
        }
        changed
    }
}

impl<'a> IntoIterator for &'a KeywordIndex {
    type Item = (&'a String, &'a PathBuf);
    type IntoIter = btree_map::Iter<'a, String, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Persistent keyword index of one workspace root.
///
/// Every mutating call is load → modify → save, and the save is skipped
/// when nothing changed, so repeating a call is harmless.
#[derive(Debug, Clone)]
pub struct KeywordStore {
    root: PathBuf,
    file: JsonFile,
}

impl KeywordStore {
    pub fn new(root: impl AsRef<Path>, settings_dir: &str) -> Self {
        let root = root.as_ref().to_path_buf();
        let file = JsonFile::new(paths::keywords_file(&root, settings_dir));
        KeywordStore { root, file }
    }

    /// Whether this store belongs to an open workspace.
    pub fn is_active(&self) -> bool {
        !paths::is_unset(&self.root)
    }

    pub fn file(&self) -> &JsonFile {
        &self.file
    }

    /// Load the index, treating a missing or corrupt document as empty.
    pub fn load(&self) -> KeywordIndex {
        if !self.is_active() || !self.file.exists() {
            return KeywordIndex::new();
        }
        match self.file.load() {
            Ok(index) => index,
            Err(e) => {
                warn!(
                    path = %self.file.path().display(),
                    error = %e,
                    "Keyword index unreadable, starting fresh"
                );
                KeywordIndex::new()
            }
        }
    }

    pub fn save(&self, index: &KeywordIndex) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        self.file.save(index)
    }

    /// Re-derive `file`'s entries from its current content.
    #[instrument(skip(self, content), fields(root = %self.root.display()))]
    pub fn refresh_for_file(&self, file: &Path, content: &str) -> Result<()> {
        let names = extract_declared_names(content);
        // The first write under a root creates the document even with no names.
        self.update(true, |index| index.replace_declarations(file, names))
    }

    /// Remove every entry owned by `file`.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn purge_path(&self, file: &Path) -> Result<()> {
        self.update(false, |index| index.purge(file))
    }

    /// Point entries owned by `old` at `new`.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn retarget_path(&self, old: &Path, new: &Path) -> Result<()> {
        self.update(false, |index| index.retarget(old, new))
    }

    fn update(
        &self,
        create_if_missing: bool,
        apply: impl FnOnce(&mut KeywordIndex) -> bool,
    ) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let mut index = self.load();
        if apply(&mut index) || (create_if_missing && !self.file.exists()) {
            debug!(keywords = index.len(), "Persisting keyword index");
            self.save(&index)?;
        }
        Ok(())
    }
}
