//! Raw file store.
//!
//! Thin wrappers over `std::fs` that give every failure a typed error and a
//! log line. Nothing in this module knows about keywords or sessions; the
//! [`crate::workspace`] synchronizer layers that on top.

use crate::error::{Result, TnetError};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Starting document written by [`create_file`].
pub const FILE_TEMPLATE: &str = r#"<keyword name="">
### Variables & Conditions


### Claim

</keyword>

<details>
<summary>Proof</summary>

</details>"#;

/// Read a UTF-8 file.
pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Error reading file");
        TnetError::Read {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Read raw bytes, mapping "not found" to `None`.
pub fn read_bytes_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error reading file");
            Err(TnetError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

/// Write `content`, creating missing parent directories and replacing any
/// existing file.
pub fn write_raw(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
    let result = ensure_parent(path).and_then(|_| fs::write(path, content));
    result.map_err(|e| {
        error!(path = %path.display(), error = %e, "Error writing file");
        TnetError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Create a new note from [`FILE_TEMPLATE`].
///
/// Fails with [`TnetError::AlreadyExists`] without touching an existing file.
pub fn create_file(path: &Path) -> Result<()> {
    let write_err = |e: io::Error| {
        error!(path = %path.display(), error = %e, "Error creating file");
        TnetError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    };

    ensure_parent(path).map_err(write_err)?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            error!(path = %path.display(), "Refusing to overwrite existing file");
            return Err(TnetError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(write_err(e)),
    };

    file.write_all(FILE_TEMPLATE.as_bytes()).map_err(write_err)?;
    debug!(path = %path.display(), "Created file from template");
    Ok(())
}

/// Create a directory and any missing ancestors.
///
/// Intermediate directories may already exist; the leaf must not.
pub fn create_directory(path: &Path) -> Result<()> {
    let result = ensure_parent(path).and_then(|_| fs::create_dir(path));
    result.map_err(|e| {
        error!(path = %path.display(), error = %e, "Error creating directory");
        TnetError::Mkdir {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Remove a single file.
pub fn delete_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Error deleting file");
        TnetError::Delete {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Move a file or directory.
///
/// The destination's parent directories are created if needed. An existing
/// destination is refused rather than replaced.
pub fn rename_entry(from: &Path, to: &Path) -> Result<()> {
    let result = if to.symlink_metadata().is_ok() {
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "destination already exists",
        ))
    } else {
        fs::symlink_metadata(from)
            .and_then(|_| ensure_parent(to))
            .and_then(|_| fs::rename(from, to))
    };

    result.map_err(|e| {
        error!(
            from = %from.display(),
            to = %to.display(),
            error = %e,
            "Error renaming path"
        );
        TnetError::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        }
    })
}

/// Ancestors of `path` that do not exist yet, deepest first.
///
/// These are the directories [`write_raw`] or [`rename_entry`] would create
/// for `path`.
pub fn missing_ancestors(path: &Path) -> Vec<PathBuf> {
    path.ancestors()
        .skip(1)
        .take_while(|dir| !dir.as_os_str().is_empty() && dir.symlink_metadata().is_err())
        .map(Path::to_path_buf)
        .collect()
}

/// Remove directories in the given order, stopping at the first one that is
/// not empty.
pub fn remove_empty_directories(dirs: &[PathBuf]) {
    for dir in dirs {
        match fs::remove_dir(dir) {
            Ok(()) => debug!(path = %dir.display(), "Removed directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "Directory kept");
                break;
            }
        }
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_read_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x.txt");
        fs::write(&path, "hello").unwrap();

        assert_eq!(read_file(&path).unwrap(), "hello");
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_file(&temp_dir.path().join("missing.md")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[test]
    fn test_write_raw_creates_parents_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("note.md");

        write_raw(&path, "first").unwrap();
        write_raw(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_create_file_writes_template_in_new_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("new.md");

        create_file(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, FILE_TEMPLATE);
        assert!(content.contains(r#"<keyword name="">"#));
        assert!(content.contains("<details>"));
    }

    #[test]
    fn test_create_file_refuses_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("exists.md");
        fs::write(&path, "already").unwrap();

        let err = create_file(&path).unwrap_err();
        assert!(matches!(err, TnetError::AlreadyExists { .. }));
        assert_eq!(err.kind(), ErrorKind::Write);
        assert_eq!(fs::read_to_string(&path).unwrap(), "already");
    }

    #[test]
    fn test_create_directory_nested() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("c");

        create_directory(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn test_create_directory_existing_leaf() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dir");
        fs::create_dir(&path).unwrap();

        let err = create_directory(&path).unwrap_err();
        assert!(matches!(err, TnetError::Mkdir { .. }));
        assert_eq!(err.kind(), ErrorKind::Write);
    }

    #[test]
    fn test_delete_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone.md");
        fs::write(&path, "x").unwrap();

        delete_file(&path).unwrap();
        assert!(!path.exists());

        let err = delete_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Delete);
    }

    #[test]
    fn test_rename_entry() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("old.md");
        let to = temp_dir.path().join("moved").join("new.md");
        fs::write(&from, "body").unwrap();

        rename_entry(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "body");
    }

    #[test]
    fn test_rename_missing_source_or_taken_destination() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.md");
        let taken = temp_dir.path().join("taken.md");
        let source = temp_dir.path().join("source.md");
        fs::write(&taken, "keep me").unwrap();
        fs::write(&source, "src").unwrap();

        let err = rename_entry(&missing, &temp_dir.path().join("x.md")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rename);

        let err = rename_entry(&source, &taken).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rename);
        assert_eq!(fs::read_to_string(&taken).unwrap(), "keep me");
        assert!(source.exists());
    }

    #[test]
    fn test_missing_ancestors_are_removed_when_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("new").join("sub").join("doc.md");

        let created = missing_ancestors(&path);
        assert_eq!(
            created,
            vec![temp_dir.path().join("new").join("sub"), temp_dir.path().join("new")]
        );

        write_raw(&path, "x").unwrap();
        fs::write(temp_dir.path().join("new").join("other.md"), "y").unwrap();
        delete_file(&path).unwrap();

        remove_empty_directories(&created);
        assert!(!temp_dir.path().join("new").join("sub").exists());
        assert!(temp_dir.path().join("new").join("other.md").exists());
        assert!(missing_ancestors(&temp_dir.path().join("a.md")).is_empty());
    }

    #[test]
    fn test_read_bytes_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.md");
        assert_eq!(read_bytes_if_exists(&path).unwrap(), None);

        fs::write(&path, "abc").unwrap();
        assert_eq!(read_bytes_if_exists(&path).unwrap(), Some(b"abc".to_vec()));
    }
}
