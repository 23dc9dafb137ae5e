//! Directory tree listing for the file explorer.
//!
//! Builds a fresh [`FileNode`] hierarchy on every call. Sub-directories are
//! listed in parallel with Rayon; a sub-directory that cannot be listed shows
//! up as an empty directory rather than failing the whole tree. Only the root
//! listing itself can fail.

use crate::error::{Result, TnetError};
use glob::Pattern;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// One entry of the directory tree.
///
/// Serialized with the field names the presentation layer expects:
/// `{ "name", "path", "isDirectory", "children"? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        FileNode {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            children: None,
        }
    }

    pub fn directory(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        children: Vec<FileNode>,
    ) -> Self {
        FileNode {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            children: Some(children),
        }
    }

    /// Children of a directory node; empty for files.
    pub fn children(&self) -> &[FileNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Number of nodes in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(FileNode::count).sum::<usize>()
    }
}

/// Which entries a listing includes.
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Include entries whose name starts with `.`
    pub show_hidden: bool,
    /// Entries whose name matches any of these are left out
    pub exclude: Vec<Pattern>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        TreeOptions {
            show_hidden: true,
            exclude: Vec::new(),
        }
    }
}

impl TreeOptions {
    /// Compile glob patterns such as `*.tmp` or `.tnet`.
    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let compiled = Pattern::new(pattern).map_err(|e| TnetError::Config {
                reason: format!("invalid exclude pattern {:?}: {}", pattern, e),
            })?;
            self.exclude.push(compiled);
        }
        Ok(self)
    }

    pub fn with_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    fn includes(&self, name: &str) -> bool {
        if !self.show_hidden && name.starts_with('.') {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(name))
    }
}

/// List `dir` recursively with default options.
pub fn get_file_tree(dir: &Path) -> Result<Vec<FileNode>> {
    get_file_tree_with(dir, &TreeOptions::default())
}

/// List `dir` recursively.
///
/// Directories come first, then files; each group is in locale order.
pub fn get_file_tree_with(dir: &Path, options: &TreeOptions) -> Result<Vec<FileNode>> {
    let nodes = list(dir, options).map_err(|e| {
        error!(path = %dir.display(), error = %e, "Error occurred while reading file tree");
        TnetError::Tree {
            path: dir.to_path_buf(),
            source: e,
        }
    })?;
    debug!(
        path = %dir.display(),
        nodes = nodes.iter().map(FileNode::count).sum::<usize>(),
        "Built file tree"
    );
    Ok(nodes)
}

struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

fn list(dir: &Path, options: &TreeOptions) -> io::Result<Vec<FileNode>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !options.includes(&name) {
            continue;
        }
        entries.push(Entry {
            path: entry.path(),
            is_dir: entry.file_type()?.is_dir(),
            name,
        });
    }

    let mut nodes: Vec<FileNode> = entries
        .into_par_iter()
        .map(|entry| node_for(entry, options))
        .collect();
    nodes.sort_by(compare_nodes);
    Ok(nodes)
}

fn node_for(entry: Entry, options: &TreeOptions) -> FileNode {
    if !entry.is_dir {
        return FileNode::file(entry.name, entry.path);
    }
    let children = match list(&entry.path, options) {
        Ok(children) => children,
        Err(e) => {
            warn!(path = %entry.path.display(), error = %e, "Cannot list directory, showing it empty");
            Vec::new()
        }
    };
    FileNode::directory(entry.name, entry.path, children)
}

fn compare_nodes(a: &FileNode, b: &FileNode) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| locale_cmp(&a.name, &b.name))
}

/// Case-insensitive order; on a case-only difference lowercase sorts first.
fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn names(nodes: &[FileNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_directories_first_then_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("b-dir")).unwrap();
        fs::create_dir(root.join("a-dir")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let tree = get_file_tree(root).unwrap();

        assert_eq!(names(&tree), vec!["a-dir", "b-dir", "a.txt", "b.txt"]);
        assert!(tree[0].is_directory);
        assert!(!tree[2].is_directory);
        assert_eq!(tree[2].children, None);
        assert_eq!(tree[2].path, root.join("a.txt"));
    }

    #[test]
    fn test_recursive_children_are_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("notes").join("Zeta")).unwrap();
        fs::write(root.join("notes").join("b.md"), "").unwrap();
        fs::write(root.join("notes").join("B2.md"), "").unwrap();
        fs::write(root.join("notes").join("a.md"), "").unwrap();

        let tree = get_file_tree(root).unwrap();
        let notes = &tree[0];
        assert_eq!(names(notes.children()), vec!["Zeta", "a.md", "b.md", "B2.md"]);
        assert_eq!(notes.children()[0].children(), &[] as &[FileNode]);
        assert_eq!(tree[0].count(), 5);
    }

    #[test]
    fn test_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = get_file_tree(&temp_dir.path().join("definitely-not-here")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Tree);
    }

    #[test]
    fn test_unlistable_subdirectory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let entry = Entry {
            name: "vanished".to_string(),
            path: temp_dir.path().join("vanished"),
            is_dir: true,
        };

        let node = node_for(entry, &TreeOptions::default());
        assert!(node.is_directory);
        assert_eq!(node.children, Some(Vec::new()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_keeps_real_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let raw = temp_dir.path().join(OsStr::from_bytes(b"bad\xffname.md"));
        fs::write(&raw, "x").unwrap();

        let tree = get_file_tree(temp_dir.path()).unwrap();
        assert_eq!(tree[0].name, "bad\u{fffd}name.md");
        assert_eq!(tree[0].path, raw);
        assert!(tree[0].path.exists());
    }

    #[test]
    fn test_exclude_and_hidden() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join(".tnet")).unwrap();
        fs::write(root.join("note.md"), "").unwrap();
        fs::write(root.join("scratch.tmp"), "").unwrap();

        let all = get_file_tree(root).unwrap();
        assert_eq!(names(&all), vec![".tnet", "note.md", "scratch.tmp"]);

        let options = TreeOptions::default()
            .with_hidden(false)
            .with_exclude_patterns(["*.tmp"])
            .unwrap();
        let filtered = get_file_tree_with(root, &options).unwrap();
        assert_eq!(names(&filtered), vec!["note.md"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = TreeOptions::default()
            .with_exclude_patterns(["[unclosed"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_serialized_shape() {
        let node = FileNode::directory("d", "/n/d", vec![FileNode::file("f.md", "/n/d/f.md")]);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["isDirectory"], serde_json::json!(true));
        assert!(json["children"][0].get("children").is_none());
    }

    #[test]
    fn test_locale_cmp() {
        assert_eq!(locale_cmp("a", "B"), Ordering::Less);
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("b", "a"), Ordering::Greater);
    }
}
