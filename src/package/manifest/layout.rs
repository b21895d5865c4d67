use std::path::{Path, PathBuf};

use super::{load_package_file, Package, PKG_FILE_NAME};
use crate::error::{Error, Result};

/// Per-package bookkeeping directory (hook completion markers).
pub const META_DIR: &str = ".meta";

/// Suffix of the staging directory used while a fetch is in flight.
pub const STAGING_SUFFIX: &str = ".part";

/// A manifest located inside a hash directory.
#[derive(Clone, Debug)]
pub struct FoundPackage {
    pub package: Package,
    /// Name of the single child directory holding the manifest, if the
    /// manifest was not directly in the hash directory.
    pub local_name: Option<String>,
}

impl FoundPackage {
    /// The directory that holds the manifest.
    pub fn package_dir(&self, hash_dir: &Path) -> PathBuf {
        match &self.local_name {
            Some(name) => hash_dir.join(name),
            None => hash_dir.to_path_buf(),
        }
    }
}

/// Scan a hash directory for its package.
///
/// Returns `Ok(None)` if the directory does not exist. A directory that
/// exists must hold exactly one manifest, either directly or one level down
/// under a single child directory; anything else is an
/// [`Error::AmbiguousStoreState`].
pub fn find_package_in_dir(dir: &Path) -> Result<Option<FoundPackage>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(dir, e)),
    };

    let mut child_dirs: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == META_DIR {
            continue;
        }
        if file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir()) {
            child_dirs.push(name);
        }
    }
    child_dirs.sort();

    let direct = dir.join(PKG_FILE_NAME);
    if direct.is_file() {
        let nested = child_dirs
            .iter()
            .filter(|c| dir.join(c).join(PKG_FILE_NAME).is_file())
            .count();
        if nested > 0 {
            return Err(Error::AmbiguousStoreState {
                dir: dir.to_path_buf(),
                candidates: nested + 1,
            });
        }
        return Ok(Some(FoundPackage {
            package: load_package_file(&direct)?,
            local_name: None,
        }));
    }

    if child_dirs.len() != 1 {
        return Err(Error::AmbiguousStoreState {
            dir: dir.to_path_buf(),
            candidates: child_dirs.len(),
        });
    }

    let name = child_dirs.remove(0);
    let manifest = dir.join(&name).join(PKG_FILE_NAME);
    if !manifest.is_file() {
        return Err(Error::AmbiguousStoreState {
            dir: dir.to_path_buf(),
            candidates: 0,
        });
    }
    Ok(Some(FoundPackage {
        package: load_package_file(&manifest)?,
        local_name: Some(name),
    }))
}
