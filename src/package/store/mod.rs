//! Package store accessor.
//!
//! Maps a content hash to an installed package on disk, and fetches
//! packages from the content store when they are missing.
//!
//! Layout of an install root:
//! ```text
//! <root>/hashpack/objects/
//!   <hex-hash>/
//!     <package-name>/
//!       package.json
//!       .meta/post-install     hook completion marker
//!   <hex-hash>.part/           in-flight fetch, never read
//! ```
//!
//! Lookups search the local install root first, then the global one.
//! Fetches land in a `.part` staging directory and are renamed into place
//! only once the whole tree has been retrieved, so a hash directory either
//! holds a complete package or does not exist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::package::hash::ContentHash;
use crate::package::manifest::{
    find_package_in_dir, Dependency, FoundPackage, Package, STAGING_SUFFIX,
};
use crate::package::objects::ContentStore;
use crate::progress::Progress;


/// Namespace directory under every install root.
pub const NAMESPACE: &str = "hashpack/objects";

/// The directory a package with `hash` occupies under `root`.
pub fn hash_dir(root: &Path, hash: &ContentHash) -> PathBuf {
    root.join(NAMESPACE).join(hash.to_hex())
}

/// The staging directory used while fetching into `dest`.
pub fn staging_dir(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

// ─── Data Types ────────────────────────────────────────────────────

/// Which install root a package was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Local,
    Global,
}

/// A package resolved to a directory in one of the install roots.
#[derive(Clone, Debug)]
pub struct Located {
    pub package: Package,
    pub hash_dir: PathBuf,
    pub local_name: Option<String>,
    pub tier: Tier,
}

impl Located {
    fn new(found: FoundPackage, hash_dir: PathBuf, tier: Tier) -> Self {
        Located {
            package: found.package,
            hash_dir,
            local_name: found.local_name,
            tier,
        }
    }

    /// The directory holding `package.json`.
    pub fn package_dir(&self) -> PathBuf {
        match &self.local_name {
            Some(name) => self.hash_dir.join(name),
            None => self.hash_dir.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Retrieved from the content store by this call.
    Fetched,
    /// The destination already held the package; nothing was retrieved.
    AlreadyPresent,
}

/// Result of [`PackageStore::fetch_to`].
#[derive(Clone, Debug)]
pub struct Fetched {
    pub found: FoundPackage,
    pub dir: PathBuf,
    pub outcome: FetchOutcome,
}

impl Fetched {
    pub fn package(&self) -> &Package {
        &self.found.package
    }

    pub fn package_dir(&self) -> PathBuf {
        self.found.package_dir(&self.dir)
    }
}

/// How often and how patiently a failed `get` is retried.
///
/// The wait before attempt `n + 1` is `n * backoff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 4,
            backoff: Duration::from_millis(250),
        }
    }
}

// ─── Accessor ──────────────────────────────────────────────────────

/// Resolves hashes against the local and global install roots.
pub struct PackageStore<'a> {
    store: &'a dyn ContentStore,
    local_root: PathBuf,
    global_root: PathBuf,
    retry: RetryPolicy,
    progress: Progress,
}

impl<'a> PackageStore<'a> {
    pub fn new(store: &'a dyn ContentStore, local_root: &Path, global_root: &Path) -> Self {
        PackageStore {
            store,
            local_root: local_root.to_path_buf(),
            global_root: global_root.to_path_buf(),
            retry: RetryPolicy::default(),
            progress: Progress::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn content_store(&self) -> &'a dyn ContentStore {
        self.store
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn root(&self, tier: Tier) -> &Path {
        match tier {
            Tier::Local => &self.local_root,
            Tier::Global => &self.global_root,
        }
    }

    /// Find an installed package, local root first.
    ///
    /// `Ok(None)` means neither root has the hash; an ambiguous hash
    /// directory is an error, not a miss.
    pub fn lookup(&self, hash: &ContentHash) -> Result<Option<Located>> {
        for tier in [Tier::Local, Tier::Global] {
            let dir = hash_dir(self.root(tier), hash);
            if let Some(found) = find_package_in_dir(&dir)? {
                return Ok(Some(Located::new(found, dir, tier)));
            }
        }
        Ok(None)
    }

    /// Like [`lookup`](Self::lookup), but a miss is [`Error::NotFound`].
    pub fn resolve(&self, hash: &ContentHash) -> Result<Located> {
        self.lookup(hash)?.ok_or(Error::NotFound { hash: *hash })
    }

    /// Resolve the target of a dependency edge.
    pub fn load_dependency(&self, dep: &Dependency) -> Result<Located> {
        self.lookup(&dep.hash)?.ok_or_else(|| Error::MissingDependency {
            name: dep.name.clone(),
            hash: dep.hash,
        })
    }

    /// Resolve `hash`, fetching it into the `tier` root on a miss.
    pub fn resolve_or_fetch(&self, hash: &ContentHash, tier: Tier) -> Result<Located> {
        if let Some(located) = self.lookup(hash)? {
            return Ok(located);
        }
        let dest = hash_dir(self.root(tier), hash);
        let fetched = self.fetch_to(hash, &dest)?;
        Ok(Located::new(fetched.found, fetched.dir, tier))
    }

    /// Retrieve `hash` from the content store into `dest`.
    ///
    /// Retrieval goes to `<dest>.part` and is renamed onto `dest` once
    /// complete. A failed attempt removes the staging directory before the
    /// next one. Every storage error is retried until the attempt budget
    /// is spent.
    pub fn fetch_to(&self, hash: &ContentHash, dest: &Path) -> Result<Fetched> {
        if let Some(found) = find_package_in_dir(dest)? {
            debug!(%hash, dest = %dest.display(), "already present");
            return Ok(Fetched {
                found,
                dir: dest.to_path_buf(),
                outcome: FetchOutcome::AlreadyPresent,
            });
        }

        let staging = staging_dir(dest);
        remove_path(&staging)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            self.progress.record_fetch_call();
            debug!(%hash, attempt, "fetching");
            match self.store.get(hash, &staging) {
                Ok(()) => break,
                Err(e) => {
                    remove_path(&staging)?;
                    if attempt >= attempts {
                        self.progress.record_failed();
                        return Err(Error::FetchFailure {
                            hash: *hash,
                            attempts,
                            source: e,
                        });
                    }
                    warn!(
                        %hash,
                        attempt,
                        permanent = e.is_permanent(),
                        error = %e,
                        "fetch failed, retrying"
                    );
                    std::thread::sleep(self.retry.backoff * attempt);
                    attempt += 1;
                }
            }
        }

        std::fs::rename(&staging, dest).map_err(|e| Error::io(dest, e))?;
        self.progress.record_fetched();
        let found = find_package_in_dir(dest)?.ok_or(Error::NotFound { hash: *hash })?;
        debug!(%hash, name = %found.package.name, "fetched");
        Ok(Fetched {
            found,
            dir: dest.to_path_buf(),
            outcome: FetchOutcome::Fetched,
        })
    }
}

/// Remove a file or directory tree, ignoring a missing path.
pub(crate) fn remove_path(path: &Path) -> Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(path, e)),
    };
    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.map_err(|e| Error::io(path, e))
}
