//! Error types for tnet core operations.
//!
//! Library errors are defined with `thiserror`; the CLI wraps them with
//! `anyhow`. Every variant carries a stable, user-presentable message so a
//! presentation layer never has to look at platform error codes. The
//! underlying `std::io::Error` is kept as the error source for diagnostics.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TnetError
pub type Result<T> = std::result::Result<T, TnetError>;

/// Coarse error taxonomy shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Read,
    Write,
    Delete,
    Rename,
    Tree,
    Metadata,
    Config,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Read => write!(f, "read"),
            ErrorKind::Write => write!(f, "write"),
            ErrorKind::Delete => write!(f, "delete"),
            ErrorKind::Rename => write!(f, "rename"),
            ErrorKind::Tree => write!(f, "tree"),
            ErrorKind::Metadata => write!(f, "metadata"),
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Core error types for tnet operations.
#[derive(Error, Debug)]
pub enum TnetError {
    // === Raw file store ===
    /// The file is missing, unreadable or not valid UTF-8
    #[error("error reading file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the file failed (permissions, disk full, ...)
    #[error("error writing file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `create` refused to overwrite an existing file
    #[error("error writing file {path}: file already exists")]
    AlreadyExists { path: PathBuf },

    /// Directory creation failed, including when the leaf already exists
    #[error("error creating directory {path}")]
    Mkdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error deleting file {path}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error renaming {from} to {to}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The root of a tree listing could not be read
    #[error("error occurred while reading file tree at {path}")]
    Tree {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Keyword declarations ===
    /// Strict declaration parsing found a malformed block
    #[error("malformed keyword declaration at line {line}: {reason}")]
    MalformedDeclaration { line: usize, reason: String },

    // === Synchronizer ===
    /// The filesystem changed but the workspace metadata could not follow
    #[error("{operation} of {path} succeeded on disk but workspace metadata could not be updated")]
    MetadataSync {
        operation: String,
        path: PathBuf,
        #[source]
        source: Box<TnetError>,
    },

    /// The metadata update failed and the filesystem change was undone
    #[error("{operation} of {path} was undone because workspace metadata could not be updated")]
    RolledBack {
        operation: String,
        path: PathBuf,
        #[source]
        source: Box<TnetError>,
    },

    // === Configuration ===
    #[error("configuration error: {reason}")]
    Config { reason: String },

    // === Serialization ===
    #[error("serialization error: {0}")]
    Serialization(String),

    // === I/O ===
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TnetError {
    /// Classify this error into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TnetError::Read { .. } => ErrorKind::Read,
            TnetError::Write { .. } | TnetError::AlreadyExists { .. } | TnetError::Mkdir { .. } => {
                ErrorKind::Write
            }
            TnetError::Delete { .. } => ErrorKind::Delete,
            TnetError::Rename { .. } => ErrorKind::Rename,
            TnetError::Tree { .. } => ErrorKind::Tree,
            TnetError::MalformedDeclaration { .. } => ErrorKind::Read,
            TnetError::Serialization(_) => ErrorKind::Write,
            TnetError::MetadataSync { .. } | TnetError::RolledBack { .. } => ErrorKind::Metadata,
            TnetError::Config { .. } => ErrorKind::Config,
            TnetError::Io(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn metadata_sync(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: TnetError,
    ) -> Self {
        TnetError::MetadataSync {
            operation: operation.into(),
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn rolled_back(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: TnetError,
    ) -> Self {
        TnetError::RolledBack {
            operation: operation.into(),
            path: path.into(),
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for TnetError {
    fn from(err: serde_json::Error) -> Self {
        TnetError::Serialization(err.to_string())
    }
}
