//! Dependency updates.
//!
//! A direct update rewrites one edge of the root manifest. A cascading
//! update replaces a hash everywhere in the graph: every package that
//! (transitively) depends on the old hash is rewritten and republished
//! under a new hash, and its importers are rewritten in turn, up to the
//! root.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::package::hash::ContentHash;
use crate::package::manifest::{save_package_file, Dependency, Package, PKG_FILE_NAME};
use crate::package::publish::publish_package;
use crate::package::store::{PackageStore, Tier};

/// Point the root's dependency `reference` (name or hash) at `new_hash`.
///
/// The edge takes the version of the new target, which is fetched into
/// the local root if needed. Returns the edge as it was before.
pub fn update_direct(
    packages: &PackageStore<'_>,
    root: &mut Package,
    reference: &str,
    new_hash: &ContentHash,
) -> Result<Dependency> {
    let target = packages.resolve_or_fetch(new_hash, Tier::Local)?;
    let dep = root
        .find_dep_mut(reference)
        .ok_or_else(|| Error::UnknownDependency(reference.to_string()))?;
    let old = dep.clone();
    if dep.name != target.package.name {
        debug!(
            edge = %dep.name,
            target = %target.package.name,
            "updated dependency has a different name"
        );
    }
    dep.hash = *new_hash;
    dep.version = target.package.version;
    info!(name = %old.name, from = %old.hash, to = %new_hash, "updated dependency");
    Ok(old)
}

/// A package rewritten and republished by a cascade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Republished {
    pub name: String,
    pub old: ContentHash,
    pub new: ContentHash,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Whether the root manifest was modified.
    pub changed: bool,
    /// In postorder: dependencies before their importers.
    pub republished: Vec<Republished>,
}

/// One cascading replacement of a hash throughout a graph.
pub struct Cascade<'s, 'a> {
    packages: &'s PackageStore<'a>,
    /// old hash → replacement
    updates: HashMap<ContentHash, ContentHash>,
    /// Version of each replacement target.
    versions: HashMap<ContentHash, String>,
    /// Hashes known to be unaffected.
    checked: HashSet<ContentHash>,
    /// Left out when republishing, relative to each package dir.
    local_root: PathBuf,
    scratch: tempfile::TempDir,
    republished: Vec<Republished>,
}

impl<'s, 'a> Cascade<'s, 'a> {
    pub fn new(packages: &'s PackageStore<'a>, local_root: &Path) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("hashpack-update")
            .tempdir()
            .map_err(|e| Error::io(&std::env::temp_dir(), e))?;
        Ok(Cascade {
            packages,
            updates: HashMap::new(),
            versions: HashMap::new(),
            checked: HashSet::new(),
            local_root: local_root.to_path_buf(),
            scratch,
            republished: Vec::new(),
        })
    }

    /// Replace `old` with `new` everywhere below `root`.
    ///
    /// Affected packages are republished to the content store. The root
    /// itself is only edited in memory; saving it is up to the caller.
    pub fn run(
        mut self,
        root: &mut Package,
        old: &ContentHash,
        new: &ContentHash,
    ) -> Result<CascadeReport> {
        info!(from = %old, to = %new, "cascading update");
        let target = self.packages.resolve_or_fetch(new, Tier::Local)?;
        self.updates.insert(*old, *new);
        self.versions.insert(*new, target.package.version);

        let changed = self.update_package(root)?;
        Ok(CascadeReport {
            changed,
            republished: self.republished,
        })
    }

    fn update_package(&mut self, pkg: &mut Package) -> Result<bool> {
        let mut changed = false;
        for dep in pkg.dependencies.iter_mut() {
            if self.checked.contains(&dep.hash) {
                continue;
            }
            if let Some(to) = self.updates.get(&dep.hash).copied() {
                debug!(dep = %dep.name, importer = %pkg.name, "rewriting edge");
                dep.hash = to;
                if let Some(version) = self.versions.get(&to) {
                    dep.version = version.clone();
                }
                changed = true;
                continue;
            }
            match self.fetch_and_update(&dep.hash)? {
                Some(replacement) => {
                    self.updates.insert(dep.hash, replacement);
                    dep.hash = replacement;
                    changed = true;
                }
                None => {
                    self.checked.insert(dep.hash);
                }
            }
        }
        Ok(changed)
    }

    /// Fetch `hash` into scratch space and cascade into it. Returns the
    /// republished hash if anything below it changed.
    fn fetch_and_update(&mut self, hash: &ContentHash) -> Result<Option<ContentHash>> {
        let dir = self.scratch.path().join(hash.to_hex());
        let fetched = self.packages.fetch_to(hash, &dir)?;
        let mut pkg = fetched.package().clone();
        if !self.update_package(&mut pkg)? {
            return Ok(None);
        }

        let pkg_dir = fetched.package_dir();
        save_package_file(&pkg, &pkg_dir.join(PKG_FILE_NAME))?;
        let new = publish_package(self.packages.content_store(), &pkg_dir, &self.local_root)?;
        debug!(name = %pkg.name, old = %hash, %new, "republished");
        self.versions.insert(new, pkg.version.clone());
        self.republished.push(Republished {
            name: pkg.name,
            old: *hash,
            new,
        });
        Ok(Some(new))
    }
}
