use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::package::hash::ContentHash;

// ─── Lockfile ──────────────────────────────────────────────────────

pub const LOCK_FILE_NAME: &str = "hashpack-lock.json";

/// The only lockfile format version this build understands.
pub const LOCK_VERSION: u32 = 1;

/// language tag → local dependency name → entry.
pub type LockDeps = BTreeMap<String, BTreeMap<String, LockDep>>;

/// A precomputed install plan.
///
/// Format:
/// ```text
/// {
///   "language": "go",
///   "lockVersion": 1,
///   "deps": { "go": { "github.com/x/y": { "ref": "<hex>", "deps": { ... } } } }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    #[serde(default)]
    pub language: String,
    #[serde(rename = "lockVersion")]
    pub lock_version: u32,
    #[serde(default)]
    pub deps: LockDeps,
}

/// One locked dependency and, optionally, its own locked dependencies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockDep {
    #[serde(rename = "ref")]
    pub reference: ContentHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deps: Option<LockDeps>,
}

impl LockFile {
    pub fn new(language: &str) -> Self {
        LockFile {
            language: language.to_string(),
            lock_version: LOCK_VERSION,
            deps: LockDeps::new(),
        }
    }

    /// Total number of entries in the plan, nested ones included.
    pub fn entry_count(&self) -> usize {
        count_entries(&self.deps)
    }
}

fn count_entries(deps: &LockDeps) -> usize {
    deps.values()
        .flat_map(|by_name| by_name.values())
        .map(|dep| 1 + dep.deps.as_ref().map_or(0, count_entries))
        .sum()
}

/// Load a lockfile, rejecting unknown format versions.
pub fn load_lockfile(path: &Path) -> Result<LockFile> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let lock: LockFile = serde_json::from_slice(&content).map_err(|e| Error::Manifest {
        path: path.to_path_buf(),
        source: e,
    })?;
    if lock.lock_version != LOCK_VERSION {
        return Err(Error::UnsupportedLockVersion(lock.lock_version));
    }
    Ok(lock)
}

pub fn save_lockfile(path: &Path, lock: &LockFile) -> Result<()> {
    let mut out = serde_json::to_string_pretty(lock).map_err(|e| Error::Manifest {
        path: path.to_path_buf(),
        source: e,
    })?;
    out.push('\n');
    std::fs::write(path, out).map_err(|e| Error::io(path, e))
}
