//! Workspace synchronizer.
//!
//! [`Workspace`] is the entry point a presentation layer talks to. Every
//! mutation first changes the filesystem and then brings the workspace
//! metadata (session and keyword index) in line with the new state of disk:
//!
//! | operation | filesystem        | session          | keyword index          |
//! |-----------|-------------------|------------------|------------------------|
//! | write     | write content     | -                | refresh file's entries |
//! | delete    | remove file       | drop path        | drop file's entries    |
//! | rename    | move entry        | substitute path  | retarget entries       |
//! | create    | write template    | -                | -                      |
//!
//! The filesystem is authoritative; metadata is a cache. When a metadata step
//! fails after the filesystem changed, the configured
//! [`MetadataFailurePolicy`] decides between undoing the whole operation and
//! carrying on with a warning.

use crate::config::{Config, MetadataFailurePolicy};
use crate::error::{Result, TnetError};
use crate::keywords::{self, KeywordIndex, KeywordStore};
use crate::paths;
use crate::persistence::JsonFile;
use crate::session::{SessionState, SessionStore};
use crate::store;
use crate::tree::{self, FileNode, TreeOptions};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

/// An open (or unset) workspace.
///
/// ## Example
///
/// ```rust,ignore
/// use tnet_core::{Config, Workspace};
///
/// let ws = Workspace::open("/home/me/notes", &Config::default())?;
/// ws.write(Path::new("/home/me/notes/a.md"), "<keyword name=\"K\">...</keyword>")?;
/// assert!(ws.keywords().get("K").is_some());
/// ```
pub struct Workspace {
    root: PathBuf,
    policy: MetadataFailurePolicy,
    tree_options: TreeOptions,
    session: SessionStore,
    keywords: KeywordStore,
    /// Serializes metadata read-modify-write cycles issued through this value
    sync_lock: Mutex<()>,
}

/// Saved contents of a file, for undo.
#[derive(Debug)]
enum Saved {
    Absent,
    Bytes(Vec<u8>),
    /// Could not be read; rollback leaves it alone
    Unknown,
}

impl Saved {
    fn capture(path: &Path) -> Self {
        Self::from_snapshot(path, store::read_bytes_if_exists(path))
    }

    fn from_snapshot(path: &Path, snapshot: Result<Option<Vec<u8>>>) -> Self {
        match snapshot {
            Ok(Some(bytes)) => Saved::Bytes(bytes),
            Ok(None) => Saved::Absent,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cannot snapshot file");
                Saved::Unknown
            }
        }
    }
}

/// How to take back the filesystem half of an operation.
#[derive(Debug)]
enum Undo {
    Restore { path: PathBuf, previous: Saved },
    RenameBack { from: PathBuf, to: PathBuf },
}

/// Everything needed to put the workspace back as it was.
#[derive(Debug)]
struct Checkpoint {
    undo: Undo,
    /// Directories the operation is about to create, deepest first
    created: Vec<PathBuf>,
    session: Saved,
    keywords: Saved,
}

impl Workspace {
    /// Open the workspace rooted at `root`.
    ///
    /// An empty `root` yields the "no workspace open" value: session and
    /// keyword calls return empty results and persist nothing.
    pub fn open(root: impl AsRef<Path>, config: &Config) -> Result<Self> {
        config.validate()?;
        let root = root.as_ref().to_path_buf();
        let settings_dir = config.workspace.settings_dir.as_str();

        info!(
            root = %root.display(),
            policy = %config.sync.on_metadata_error,
            "Opening workspace"
        );

        Ok(Workspace {
            session: SessionStore::new(&root, settings_dir),
            keywords: KeywordStore::new(&root, settings_dir),
            policy: config.sync.on_metadata_error,
            tree_options: config.tree_options()?,
            root,
            sync_lock: Mutex::new(()),
        })
    }

    /// The "no workspace open" value.
    pub fn unset() -> Self {
        let settings_dir = paths::DEFAULT_SETTINGS_DIR;
        Workspace {
            root: PathBuf::new(),
            policy: MetadataFailurePolicy::default(),
            tree_options: TreeOptions::default(),
            session: SessionStore::new("", settings_dir),
            keywords: KeywordStore::new("", settings_dir),
            sync_lock: Mutex::new(()),
        }
    }

    pub fn with_policy(mut self, policy: MetadataFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_open(&self) -> bool {
        !paths::is_unset(&self.root)
    }

    pub fn policy(&self) -> MetadataFailurePolicy {
        self.policy
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.session
    }

    pub fn keyword_store(&self) -> &KeywordStore {
        &self.keywords
    }

    // === Pass-throughs ===

    pub fn read(&self, file: &Path) -> Result<String> {
        store::read_file(file)
    }

    /// Create a note from the template. No metadata is touched: the note is
    /// indexed on its first write and is not open yet.
    pub fn create(&self, file: &Path) -> Result<()> {
        store::create_file(file)?;
        info!(path = %file.display(), "Created note");
        Ok(())
    }

    pub fn create_directory(&self, dir: &Path) -> Result<()> {
        store::create_directory(dir)?;
        info!(path = %dir.display(), "Created directory");
        Ok(())
    }

    /// Tree of the workspace root; empty when no workspace is open.
    pub fn file_tree(&self) -> Result<Vec<FileNode>> {
        if !self.is_open() {
            return Ok(Vec::new());
        }
        self.file_tree_of(&self.root)
    }

    /// Tree of any directory, using the workspace's listing options.
    pub fn file_tree_of(&self, dir: &Path) -> Result<Vec<FileNode>> {
        tree::get_file_tree_with(dir, &self.tree_options)
    }

    pub fn save_session(&self, paths: Vec<PathBuf>) -> Result<()> {
        let _guard = self.sync_lock.lock();
        self.session.save(&SessionState::new(paths))
    }

    /// Open files of the last session. See [`SessionStore::load`] for the
    /// error contract.
    pub fn load_session(&self) -> Result<Vec<PathBuf>> {
        Ok(self.session.load()?.into_paths())
    }

    /// Current keyword index (empty when missing or unreadable).
    pub fn keywords(&self) -> KeywordIndex {
        self.keywords.load()
    }

    // === Synchronized mutations ===

    /// Write `content` to `file` and refresh the file's keyword entries.
    #[instrument(skip(self, content), fields(root = %self.root.display(), bytes = content.len()))]
    pub fn write(&self, file: &Path, content: &str) -> Result<()> {
        let _guard = self.sync_lock.lock();
        let checkpoint = self.checkpoint(file, || Undo::Restore {
            path: file.to_path_buf(),
            previous: Saved::capture(file),
        });

        store::write_raw(file, content)?;
        debug!("Content written");

        self.finish("write", file, checkpoint, || {
            self.keywords.refresh_for_file(file, content)
        })
    }

    /// Delete `file` and forget it in the session and keyword index.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn delete(&self, file: &Path) -> Result<()> {
        let _guard = self.sync_lock.lock();
        let checkpoint = self.checkpoint(file, || Undo::Restore {
            path: file.to_path_buf(),
            previous: Saved::capture(file),
        });

        store::delete_file(file)?;
        debug!("File deleted");

        self.finish("delete", file, checkpoint, || {
            self.session.remove_path(file)?;
            self.keywords.purge_path(file)
        })
    }

    /// Move `old` to `new` and carry session and keyword entries along.
    ///
    /// Works for directories too: entries beneath `old` are rebased.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn rename(&self, old: &Path, new: &Path) -> Result<()> {
        let _guard = self.sync_lock.lock();
        let checkpoint = self.checkpoint(new, || Undo::RenameBack {
            from: new.to_path_buf(),
            to: old.to_path_buf(),
        });

        store::rename_entry(old, new)?;
        debug!("Entry renamed");

        self.finish("rename", old, checkpoint, || {
            self.session.retarget_path(old, new)?;
            self.keywords.retarget_path(old, new)
        })
    }

    /// Rebuild the keyword index from every note under the root.
    ///
    /// Files are visited in tree order and later declarations win, so the
    /// result is deterministic. Unreadable files are skipped. Returns the
    /// number of keywords indexed.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn rebuild_keywords(&self) -> Result<usize> {
        if !self.is_open() {
            return Ok(0);
        }
        let _guard = self.sync_lock.lock();

        let settings_dir = self.keywords.file().path().parent().map(Path::to_path_buf);
        let mut files = Vec::new();
        collect_files(&self.file_tree_of(&self.root)?, settings_dir.as_deref(), &mut files);

        let declared: Vec<(PathBuf, Vec<String>)> = files
            .into_par_iter()
            .filter_map(|file| match store::read_file(&file) {
                Ok(content) => {
                    let names = keywords::extract_declared_names(&content);
                    Some((file, names))
                }
                Err(e) => {
                    debug!(path = %file.display(), error = %e, "Skipping unreadable file");
                    None
                }
            })
            .collect();

        let mut index = KeywordIndex::new();
        for (file, names) in declared {
            index.replace_declarations(&file, names);
        }
        self.keywords.save(&index)?;

        info!(keywords = index.len(), "Keyword index rebuilt");
        Ok(index.len())
    }

    // === Failure handling ===

    fn checkpoint(&self, target: &Path, undo: impl FnOnce() -> Undo) -> Option<Checkpoint> {
        if self.policy != MetadataFailurePolicy::Rollback {
            return None;
        }
        let (session, keywords) = if self.is_open() {
            let session = self.session.file();
            let keywords = self.keywords.file();
            (
                Saved::from_snapshot(session.path(), session.snapshot()),
                Saved::from_snapshot(keywords.path(), keywords.snapshot()),
            )
        } else {
            (Saved::Unknown, Saved::Unknown)
        };
        Some(Checkpoint {
            undo: undo(),
            created: store::missing_ancestors(target),
            session,
            keywords,
        })
    }

    fn finish(
        &self,
        operation: &'static str,
        path: &Path,
        checkpoint: Option<Checkpoint>,
        metadata: impl FnOnce() -> Result<()>,
    ) -> Result<()> {
        let err = match metadata() {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        match checkpoint {
            None => {
                warn!(
                    operation,
                    path = %path.display(),
                    error = %err,
                    "Workspace metadata is out of date with the filesystem"
                );
                if self.policy == MetadataFailurePolicy::BestEffort {
                    return Ok(());
                }
            }
            Some(checkpoint) => match self.rollback(checkpoint) {
                Ok(()) => {
                    warn!(
                        operation,
                        path = %path.display(),
                        error = %err,
                        "Metadata update failed, operation rolled back"
                    );
                    return Err(TnetError::rolled_back(operation, path, err));
                }
                Err(rollback_err) => error!(
                    operation,
                    path = %path.display(),
                    error = %err,
                    rollback_error = %rollback_err,
                    "Metadata update failed and rollback failed"
                ),
            },
        }

        Err(TnetError::metadata_sync(operation, path, err))
    }

    fn rollback(&self, checkpoint: Checkpoint) -> Result<()> {
        match checkpoint.undo {
            Undo::Restore { path, previous } => match previous {
                Saved::Bytes(bytes) => store::write_raw(&path, bytes)?,
                Saved::Absent => store::delete_file(&path)?,
                Saved::Unknown => {}
            },
            Undo::RenameBack { from, to } => store::rename_entry(&from, &to)?,
        }
        store::remove_empty_directories(&checkpoint.created);

        restore(self.session.file(), checkpoint.session)?;
        restore(self.keywords.file(), checkpoint.keywords)
    }
}

fn restore(file: &JsonFile, saved: Saved) -> Result<()> {
    match saved {
        Saved::Bytes(bytes) => file.restore(Some(&bytes)),
        Saved::Absent => file.restore(None),
        Saved::Unknown => Ok(()),
    }
}

fn collect_files(nodes: &[FileNode], skip_dir: Option<&Path>, out: &mut Vec<PathBuf>) {
    for node in nodes {
        if node.is_directory {
            if skip_dir.is_some_and(|dir| paths::same_path(dir, &node.path)) {
                continue;
            }
            collect_files(node.children(), skip_dir, out);
        } else {
            out.push(node.path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn open(temp_dir: &TempDir) -> Workspace {
        init_tracing();
        Workspace::open(temp_dir.path(), &Config::default()).unwrap()
    }

    #[test]
    fn test_write_indexes_keywords() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let doc = temp_dir.path().join("doc.md");

        ws.write(&doc, "<keyword name=\"K1\">x</keyword>\n<keyword name=\"K2\">y</keyword>")
            .unwrap();
        ws.write(&doc, "<keyword name=\"K2\">y</keyword>\n<keyword name=\"K3\">z</keyword>")
            .unwrap();

        assert_eq!(fs::read_to_string(&doc).unwrap().lines().count(), 2);
        let index = ws.keywords();
        assert_eq!(index.get("K2"), Some(doc.as_path()));
        assert_eq!(index.get("K3"), Some(doc.as_path()));
        assert!(index.get("K1").is_none());
    }

    #[test]
    fn test_write_into_new_directories() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let doc = temp_dir.path().join("deep").join("er").join("doc.md");

        ws.write(&doc, "<keyword name=\"K1\">x</keyword>").unwrap();

        let raw = fs::read_to_string(ws.keyword_store().file().path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json, serde_json::json!({ "K1": doc.to_str().unwrap() }));
    }

    #[test]
    fn test_template_is_indexed_under_empty_name() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let doc = temp_dir.path().join("draft.md");

        ws.write(&doc, store::FILE_TEMPLATE).unwrap();

        assert_eq!(ws.keywords().get(""), Some(doc.as_path()));
        assert_eq!(ws.keywords().names_for(&doc), vec![""]);
    }

    #[test]
    fn test_create_has_no_metadata_side_effects() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let doc = temp_dir.path().join("new").join("note.md");

        ws.create(&doc).unwrap();

        assert_eq!(fs::read_to_string(&doc).unwrap(), store::FILE_TEMPLATE);
        assert!(!ws.keyword_store().file().exists());
        assert!(!ws.session_store().file().exists());

        let err = ws.create(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Write);
    }

    #[test]
    fn test_delete_cleans_session_and_keywords() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let target = temp_dir.path().join("a.md");
        let other = temp_dir.path().join("b.md");

        ws.write(&target, "<keyword name=\"K1\">x</keyword>").unwrap();
        ws.write(&other, "<keyword name=\"K2\">x</keyword>").unwrap();
        ws.save_session(vec![target.clone(), other.clone()]).unwrap();

        ws.delete(&target).unwrap();

        assert!(!target.exists());
        assert_eq!(ws.load_session().unwrap(), vec![other.clone()]);
        let index = ws.keywords();
        assert!(index.get("K1").is_none());
        assert_eq!(index.get("K2"), Some(other.as_path()));
    }

    #[test]
    fn test_delete_missing_file_leaves_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let ghost = temp_dir.path().join("ghost.md");
        ws.save_session(vec![ghost.clone()]).unwrap();

        let err = ws.delete(&ghost).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Delete);
        assert_eq!(ws.load_session().unwrap(), vec![ghost]);
    }

    #[test]
    fn test_rename_moves_file_and_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let first = temp_dir.path().join("first.md");
        let old = temp_dir.path().join("old.md");
        let new = temp_dir.path().join("new.md");
        let last = temp_dir.path().join("last.md");

        ws.write(&old, "<keyword name=\"K1\">x</keyword>").unwrap();
        ws.save_session(vec![first.clone(), old.clone(), last.clone()])
            .unwrap();

        ws.rename(&old, &new).unwrap();

        assert!(!old.exists());
        assert!(new.exists());
        assert_eq!(ws.load_session().unwrap(), vec![first, new.clone(), last]);
        assert_eq!(ws.keywords().get("K1"), Some(new.as_path()));
    }

    #[test]
    fn test_rename_directory_rebases_entries() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let old_dir = temp_dir.path().join("topics");
        let new_dir = temp_dir.path().join("archive");
        let note = old_dir.join("a.md");

        ws.write(&note, "<keyword name=\"K\">x</keyword>").unwrap();
        ws.save_session(vec![note]).unwrap();

        ws.rename(&old_dir, &new_dir).unwrap();

        let moved = new_dir.join("a.md");
        assert!(moved.exists());
        assert_eq!(ws.load_session().unwrap(), vec![moved.clone()]);
        assert_eq!(ws.keywords().get("K"), Some(moved.as_path()));
    }

    #[test]
    fn test_unset_workspace() {
        init_tracing();
        let temp_dir = TempDir::new().unwrap();
        let ws = Workspace::unset();
        let doc = temp_dir.path().join("loose.md");

        assert!(!ws.is_open());
        assert!(ws.load_session().unwrap().is_empty());
        assert!(ws.file_tree().unwrap().is_empty());

        ws.write(&doc, "<keyword name=\"K\">x</keyword>").unwrap();
        assert!(doc.exists());
        assert!(ws.keywords().is_empty());
        assert_eq!(ws.rebuild_keywords().unwrap(), 0);
    }

    #[test]
    fn test_metadata_failure_rolls_back_write() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let doc = temp_dir.path().join("doc.md");
        fs::write(&doc, "original").unwrap();
        // A plain file where the settings directory should be
        fs::write(temp_dir.path().join(".tnet"), "blocker").unwrap();

        let err = ws
            .write(&doc, "<keyword name=\"K\">x</keyword>")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Metadata);
        assert!(matches!(err, TnetError::RolledBack { .. }));
        assert!(err.to_string().contains("was undone"));
        assert_eq!(fs::read_to_string(&doc).unwrap(), "original");
    }

    #[test]
    fn test_metadata_failure_rolls_back_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let doc = temp_dir.path().join("new").join("sub").join("fresh.md");
        fs::write(temp_dir.path().join(".tnet"), "blocker").unwrap();

        let err = ws
            .write(&doc, "<keyword name=\"K\">x</keyword>")
            .unwrap_err();
        assert!(matches!(err, TnetError::RolledBack { .. }));
        assert!(!doc.exists());
        assert!(!temp_dir.path().join("new").exists());

        let tree = ws.file_tree().unwrap();
        let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec![".tnet"]);
    }

    #[test]
    fn test_metadata_failure_best_effort() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir).with_policy(MetadataFailurePolicy::BestEffort);
        let doc = temp_dir.path().join("doc.md");
        fs::write(temp_dir.path().join(".tnet"), "blocker").unwrap();

        ws.write(&doc, "<keyword name=\"K\">x</keyword>").unwrap();
        assert_eq!(
            fs::read_to_string(&doc).unwrap(),
            "<keyword name=\"K\">x</keyword>"
        );
    }

    #[test]
    fn test_rollback_restores_deleted_file_and_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let doc = temp_dir.path().join("doc.md");
        ws.write(&doc, "<keyword name=\"K\">x</keyword>").unwrap();
        ws.save_session(vec![doc.clone()]).unwrap();

        let checkpoint = ws
            .checkpoint(&doc, || Undo::Restore {
                path: doc.clone(),
                previous: Saved::capture(&doc),
            })
            .unwrap();
        store::delete_file(&doc).unwrap();
        ws.session_store().remove_path(&doc).unwrap();

        ws.rollback(checkpoint).unwrap();

        assert!(doc.exists());
        assert_eq!(ws.load_session().unwrap(), vec![doc.clone()]);
        assert_eq!(ws.keywords().get("K"), Some(doc.as_path()));
    }

    #[test]
    fn test_rollback_renames_back() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let old = temp_dir.path().join("old.md");
        let new = temp_dir.path().join("archive").join("new.md");
        fs::write(&old, "body").unwrap();

        let checkpoint = ws
            .checkpoint(&new, || Undo::RenameBack {
                from: new.clone(),
                to: old.clone(),
            })
            .unwrap();
        store::rename_entry(&old, &new).unwrap();

        ws.rollback(checkpoint).unwrap();
        assert!(old.exists());
        assert!(!new.exists());
        assert!(!temp_dir.path().join("archive").exists());
        // Neither metadata document existed, and rollback keeps it that way
        assert!(!ws.session_store().file().exists());
    }

    #[test]
    fn test_rebuild_keywords_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let ws = open(&temp_dir);
        let a = temp_dir.path().join("a.md");
        let b = temp_dir.path().join("sub").join("b.md");
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(&a, "<keyword name=\"A\">x</keyword>").unwrap();
        fs::write(&b, "<keyword name=\"B\">x</keyword>").unwrap();
        // A stale entry for a file that no longer exists
        ws.keyword_store()
            .refresh_for_file(&temp_dir.path().join("gone.md"), "<keyword name=\"G\">x</keyword>")
            .unwrap();

        assert_eq!(ws.rebuild_keywords().unwrap(), 2);

        let index = ws.keywords();
        assert_eq!(index.get("A"), Some(a.as_path()));
        assert_eq!(index.get("B"), Some(b.as_path()));
        assert!(index.get("G").is_none());
    }

    #[test]
    fn test_file_tree_uses_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.tree.exclude = vec![".tnet".to_string()];
        let ws = Workspace::open(temp_dir.path(), &config).unwrap();

        ws.write(&temp_dir.path().join("a.md"), "<keyword name=\"K\">x</keyword>")
            .unwrap();
        let tree = ws.file_tree().unwrap();
        let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a.md"]);
    }
}
