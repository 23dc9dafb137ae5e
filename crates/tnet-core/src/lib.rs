//! # Tnet Core Library
//!
//! This crate keeps a notes workspace on disk consistent with its metadata.
//! Raw file operations go through the store; every mutation is followed by the
//! matching update of the open-file session and the keyword index, so both
//! stay in step with what is actually on disk.
//!
//! ## Architecture
//!
//! - **Paths** (`paths`): Joining, comparison and settings-file locations
//! - **Store** (`store`): Raw file and directory operations
//! - **Persistence** (`persistence`): Atomic JSON documents
//! - **Declarations** (`declarations`): Scanner for `<keyword name="...">` blocks
//! - **Keywords** (`keywords`): Keyword-name to file index
//! - **Session** (`session`): Ordered list of open files
//! - **Workspace** (`workspace`): The synchronizer tying the above together
//! - **Tree** (`tree`): Sorted directory listings
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use tnet_core::{Config, Workspace};
//!
//! let ws = Workspace::open("/home/me/notes", &Config::load()?)?;
//! ws.rename(Path::new("/home/me/notes/a.md"), Path::new("/home/me/notes/b.md"))?;
//! for node in ws.file_tree()? {
//!     println!("{}", node.name);
//! }
//! ```

pub mod config;
pub mod declarations;
pub mod error;
pub mod keywords;
pub mod paths;
pub mod persistence;
pub mod session;
pub mod store;
pub mod tree;
pub mod workspace;

// Re-export commonly used types
pub use config::{Config, MetadataFailurePolicy};
pub use declarations::{Declaration, DeclarationIssue, IssueKind, ScanReport};
pub use error::{ErrorKind, Result, TnetError};
pub use keywords::{extract_declared_names, KeywordIndex, KeywordStore};
pub use persistence::JsonFile;
pub use session::{SessionState, SessionStore};
pub use tree::{get_file_tree, get_file_tree_with, FileNode, TreeOptions};
pub use workspace::Workspace;
