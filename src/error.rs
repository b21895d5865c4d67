//! Error types for hashpack operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::package::hash::ContentHash;
use crate::package::objects::StoreError;

/// Result type alias for hashpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the install engine.
///
/// Graph inconsistencies (version splits, name/version drift) are not
/// errors: they are collected into a [`CheckReport`](crate::graph::CheckReport).
#[derive(Debug, Error)]
pub enum Error {
    /// No package with this hash in the local or global install root.
    #[error("package {hash} not found")]
    NotFound { hash: ContentHash },

    /// A dependency edge points at a hash that is not installed.
    #[error("package {name} ({hash}) not found")]
    MissingDependency { name: String, hash: ContentHash },

    /// A hash directory holds zero or several manifests.
    #[error("expected exactly one package in {}, found {candidates}", dir.display())]
    AmbiguousStoreState { dir: PathBuf, candidates: usize },

    /// Retrieval from the content store failed on every attempt.
    #[error("failed to fetch package {hash} after {attempts} attempt(s): {source}")]
    FetchFailure {
        hash: ContentHash,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// A subtool hook ran and exited unsuccessfully.
    #[error("{hook} hook failed for language '{language}': {status}")]
    HookFailure {
        hook: String,
        language: String,
        status: String,
    },

    /// The package requires a subtool that is not installed.
    #[error("no binary named hashpack-{language} was found")]
    MissingSubtool { language: String },

    /// The subtool binary could not be spawned or queried.
    #[error("cannot run subtool for '{language}': {source}")]
    Subtool {
        language: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported lockfile version: {0}")]
    UnsupportedLockVersion(u32),

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid content hash '{0}'")]
    InvalidHash(String),

    /// `update` was asked for a dependency the manifest does not declare.
    #[error("no dependency '{0}' in manifest")]
    UnknownDependency(String),

    #[error("a fetch worker panicked")]
    WorkerPanic,

    #[error("cannot start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
