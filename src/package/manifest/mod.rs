//! Package manifests.
//!
//! A manifest (`package.json`) describes one content-addressed package:
//! its name, version, the language tag selecting its subtool, and the
//! dependency edges it imports. Each edge pins a dependency by content
//! hash and carries a cached copy of the name and version the importer
//! saw at import time.
//!
//! Fields the engine does not interpret (author, description, license,
//! subtool-specific sections, ...) are kept verbatim in [`Package::extra`]
//! so that load → save never loses data.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::package::hash::ContentHash;

/// Manifest file name inside a package directory.
pub const PKG_FILE_NAME: &str = "package.json";

// ─── Data Types ────────────────────────────────────────────────────

/// A package manifest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Package {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Subtool selector; empty means no subtool.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    /// Treat a missing subtool as an error instead of a no-op.
    #[serde(
        default,
        rename = "subtoolRequired",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub subtool_required: bool,
    #[serde(
        default,
        alias = "gxDependencies",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependencies: Vec<Dependency>,
    /// Passthrough fields, preserved on round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A dependency edge, embedded in the importer's manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// The name the importer expects the target to have.
    #[serde(default)]
    pub name: String,
    pub hash: ContentHash,
    /// The target's version as observed at import time.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl Package {
    pub fn new(name: &str, version: &str) -> Self {
        Package {
            name: name.to_string(),
            version: version.to_string(),
            ..Package::default()
        }
    }

    /// Find a dependency by hash (hex) or by name.
    pub fn find_dep(&self, reference: &str) -> Option<&Dependency> {
        self.dependencies
            .iter()
            .find(|d| d.hash.to_hex() == reference || d.name == reference)
    }

    /// Mutable variant of [`find_dep`](Self::find_dep).
    pub fn find_dep_mut(&mut self, reference: &str) -> Option<&mut Dependency> {
        self.dependencies
            .iter_mut()
            .find(|d| d.hash.to_hex() == reference || d.name == reference)
    }

    pub fn depends_on(&self, hash: &ContentHash) -> bool {
        self.dependencies.iter().any(|d| d.hash == *hash)
    }

    /// The dependency edge a parent would record for this package.
    pub fn as_dependency(&self, hash: ContentHash) -> Dependency {
        Dependency {
            author: None,
            name: self.name.clone(),
            hash,
            version: self.version.clone(),
        }
    }
}

mod layout;
mod lockfile;

pub use layout::{find_package_in_dir, FoundPackage, META_DIR, STAGING_SUFFIX};
pub use lockfile::{
    load_lockfile, save_lockfile, LockDep, LockDeps, LockFile, LOCK_FILE_NAME, LOCK_VERSION,
};

// ─── Manifest I/O ──────────────────────────────────────────────────

/// Load a manifest from disk.
pub fn load_package_file(path: &Path) -> Result<Package> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_slice(&content).map_err(|e| Error::Manifest {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a manifest to disk as indented JSON.
pub fn save_package_file(pkg: &Package, path: &Path) -> Result<()> {
    let mut out = serde_json::to_string_pretty(pkg).map_err(|e| Error::Manifest {
        path: path.to_path_buf(),
        source: e,
    })?;
    out.push('\n');
    std::fs::write(path, out).map_err(|e| Error::io(path, e))
}

/// Walk up from `start` to the first directory holding a manifest.
pub fn find_package_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PKG_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests;
