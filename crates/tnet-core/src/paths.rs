//! Path helpers.
//!
//! Everything here is lexical: no function touches the filesystem. Paths are
//! compared after normalization so `notes/./a.md` and `notes/a.md` refer to
//! the same keyword owner or session entry.

use std::path::{Component, Path, PathBuf};

/// Default name of the hidden per-workspace settings directory.
pub const DEFAULT_SETTINGS_DIR: &str = ".tnet";
/// Session file name inside the settings directory.
pub const SESSION_FILE_NAME: &str = "session.json";
/// Keyword index file name inside the settings directory.
pub const KEYWORDS_FILE_NAME: &str = "keywords.json";

/// True for the empty-root sentinel meaning "no workspace open".
pub fn is_unset(root: &Path) -> bool {
    root.as_os_str().is_empty()
}

/// Lexically normalize a path.
///
/// `.` components are dropped and `..` pops the previous normal component.
/// A `..` that cannot pop (relative path start) is kept; one directly under
/// the root is discarded, matching how the OS resolves `/..`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compare two paths after normalization.
pub fn same_path(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

/// Map `path` from under `old` to under `new`.
///
/// Returns `new` when `path` is `old` itself, the rebased location when
/// `path` lives beneath `old`, and `None` when it is unrelated.
pub fn rebase(path: &Path, old: &Path, new: &Path) -> Option<PathBuf> {
    let path = normalize(path);
    let old = normalize(old);
    let rest = path.strip_prefix(&old).ok()?;
    if rest.as_os_str().is_empty() {
        Some(new.to_path_buf())
    } else {
        Some(new.join(rest))
    }
}

/// Hidden settings directory of a workspace.
pub fn settings_dir(root: &Path, dir_name: &str) -> PathBuf {
    root.join(dir_name)
}

pub fn session_file(root: &Path, dir_name: &str) -> PathBuf {
    settings_dir(root, dir_name).join(SESSION_FILE_NAME)
}

pub fn keywords_file(root: &Path, dir_name: &str) -> PathBuf {
    settings_dir(root, dir_name).join(KEYWORDS_FILE_NAME)
}
