//! Content-addressed object storage.
//!
//! The install engine only ever talks to storage through [`ContentStore`].
//! Objects are either file blobs or directories (a sorted list of named
//! links to other objects). A published package is a directory object
//! with a single link, `<package name>`, pointing at the package tree.
//!
//! [`FsObjectStore`] is the bundled implementation: a local object store
//! on disk, usable as a shared cache or as a stand-in for a remote network.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::package::hash::ContentHash;

mod fs;

pub use fs::FsObjectStore;


// ─── Data Types ────────────────────────────────────────────────────

/// A named edge from a directory object to a child object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub hash: ContentHash,
}

/// Errors reported by a content store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object {0} not found")]
    NotFound(ContentHash),

    #[error("object {hash} is corrupt: {reason}")]
    Corrupt { hash: ContentHash, reason: String },

    #[error("invalid object path '{0}'")]
    InvalidPath(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Errors that no amount of retrying will fix.
    ///
    /// Fetch retries do not consult this yet; it is only surfaced in logs.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_) | StoreError::Corrupt { .. } | StoreError::InvalidPath(_)
        )
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ─── Store Interface ───────────────────────────────────────────────

/// The narrow storage interface consumed by the engine.
///
/// Implementations must be safe to call from many fetch workers at once.
pub trait ContentStore: Send + Sync {
    /// Materialize object `hash` at `dest` (a file for blobs, a directory
    /// tree for directory objects). `dest` must not exist yet.
    fn get(&self, hash: &ContentHash, dest: &Path) -> Result<(), StoreError>;

    /// Store a file blob and return its hash.
    fn add(&self, reader: &mut dyn Read) -> Result<ContentHash, StoreError>;

    /// Return the hash of the empty directory object, creating it if needed.
    fn new_empty_dir(&self) -> Result<ContentHash, StoreError>;

    /// Return a copy of directory `dir` with `name` linked to `child`.
    fn patch_link(
        &self,
        dir: &ContentHash,
        name: &str,
        child: &ContentHash,
    ) -> Result<ContentHash, StoreError>;

    /// List the links of the directory at `path` (`<hex>[/<name>...]`).
    fn list(&self, path: &str) -> Result<Vec<Link>, StoreError>;
}
