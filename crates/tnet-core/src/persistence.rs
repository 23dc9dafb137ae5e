//! JSON persistence for workspace metadata.
//!
//! `session.json` and `keywords.json` are small documents that are always
//! rewritten wholesale. Writes go to a temporary sibling first and are then
//! renamed over the target, so a reader (or a crash) only ever observes the
//! old document or the new one.

use crate::error::{Result, TnetError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// A JSON document stored at a fixed path.
///
/// ## Example
///
/// ```rust,ignore
/// use tnet_core::persistence::JsonFile;
///
/// let file = JsonFile::new("/notes/.tnet/session.json");
/// file.save(&vec!["/notes/a.md"])?;
/// let paths: Vec<String> = file.load()?;
/// ```
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the temporary file used during save.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Parse the document.
    ///
    /// Missing and corrupt documents are both reported as read errors; the
    /// caller decides whether that means "empty".
    pub fn load<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = fs::read(&self.path).map_err(|e| self.read_error(e))?;
        serde_json::from_slice(&raw).map_err(|e| {
            self.read_error(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
        })
    }

    /// Serialize `value` and atomically replace the document.
    pub fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.write_atomic(&bytes).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "Error writing file");
            TnetError::Write {
                path: self.path.clone(),
                source: e,
            }
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Saved document");
        Ok(())
    }

    /// Current raw bytes of the document, if any.
    pub fn snapshot(&self) -> Result<Option<Vec<u8>>> {
        crate::store::read_bytes_if_exists(&self.path)
    }

    /// Put back a document captured with [`JsonFile::snapshot`].
    ///
    /// `None` removes the document, restoring the "never written" state.
    pub fn restore(&self, snapshot: Option<&[u8]>) -> Result<()> {
        let result = match snapshot {
            Some(bytes) => self.write_atomic(bytes),
            None => match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        };
        result.map_err(|e| TnetError::Write {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, &self.path)
    }

    fn read_error(&self, source: io::Error) -> TnetError {
        TnetError::Read {
            path: self.path.clone(),
            source,
        }
    }
}
