//! Error taxonomy for the object store and commit plumbing

use crate::hash::Sha1Hash;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by the core. None of them are retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// A directory could not be created or a file could not be read or written.
    #[error("storage error at {}: {source}", .path.display())]
    Storage {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The index failed its checksum, signature or entry-count checks.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// The index declares a format version other than 2.
    #[error("unsupported index version {0} (only version 2 is supported)")]
    UnsupportedVersion(u32),

    /// A staged path contains a directory separator.
    #[error("unsupported path {0:?}: nested directories are not supported")]
    UnsupportedPath(String),

    #[error("object not found: {0}")]
    ObjectNotFound(Sha1Hash),

    #[error("corrupt object {hash}: {reason}")]
    CorruptObject { hash: Sha1Hash, reason: String },

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// The branch pointer file holds something other than a hex digest.
    #[error("corrupt ref at {}: {reason}", .path.display())]
    CorruptRef { path: PathBuf, reason: String },

    /// Another writer holds the branch pointer lock.
    #[error("ref is locked by another writer ({})", .0.display())]
    RefLocked(PathBuf),

    /// The branch pointer changed between read and update.
    #[error("ref moved: expected {}, found {}", display_opt(.expected), display_opt(.actual))]
    RefMoved {
        expected: Option<Sha1Hash>,
        actual: Option<Sha1Hash>,
    },

    #[error("not a repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

fn display_opt(hash: &Option<Sha1Hash>) -> String {
    match hash {
        Some(h) => h.to_hex(),
        None => "(unborn)".to_string(),
    }
}

impl Error {
    /// Wrap an I/O error with the path it occurred on
    pub fn storage(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Storage {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Extension for attaching a path to `io::Result`s
pub(crate) trait IoResultExt<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::storage(path, e))
    }
}

/// Result type used throughout tinygit-core
pub type Result<T> = std::result::Result<T, Error>;
