//! Test doubles and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::graph::DependencyQueue;
use crate::hooks::{HookRunner, Subtool};
use crate::package::hash::ContentHash;
use crate::package::manifest::{save_package_file, Dependency, Package, PKG_FILE_NAME};
use crate::package::objects::{ContentStore, FsObjectStore, Link, StoreError};
use crate::package::publish::publish_package;
use crate::package::store::{PackageStore, RetryPolicy, Tier};

// ─── Instrumented store ────────────────────────────────────────────

/// Wraps an [`FsObjectStore`], counting `get` calls and tracking how many
/// run at once. Failures can be injected per hash.
pub(crate) struct CountingStore {
    inner: FsObjectStore,
    delay: Duration,
    gets: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    failures: Mutex<HashMap<ContentHash, u32>>,
    per_hash: Mutex<HashMap<ContentHash, usize>>,
}

impl CountingStore {
    pub fn open(root: &Path) -> Self {
        CountingStore {
            inner: FsObjectStore::open(root).unwrap(),
            delay: Duration::ZERO,
            gets: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            failures: Mutex::new(HashMap::new()),
            per_hash: Mutex::new(HashMap::new()),
        }
    }

    /// Hold every `get` for `delay` so concurrent calls overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make the next `times` gets of `hash` fail after writing a partial
    /// tree to the destination.
    pub fn fail_next(&self, hash: ContentHash, times: u32) {
        self.failures.lock().insert(hash, times);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn gets_of(&self, hash: &ContentHash) -> usize {
        self.per_hash.lock().get(hash).copied().unwrap_or(0)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn take_failure(&self, hash: &ContentHash) -> bool {
        let mut failures = self.failures.lock();
        match failures.get_mut(hash) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

impl ContentStore for CountingStore {
    fn get(&self, hash: &ContentHash, dest: &Path) -> std::result::Result<(), StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        *self.per_hash.lock().entry(*hash).or_insert(0) += 1;
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        let result = if self.take_failure(hash) {
            std::fs::create_dir_all(dest).unwrap();
            std::fs::write(dest.join("partial"), "x").unwrap();
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            self.inner.get(hash, dest)
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn add(&self, reader: &mut dyn Read) -> std::result::Result<ContentHash, StoreError> {
        self.inner.add(reader)
    }

    fn new_empty_dir(&self) -> std::result::Result<ContentHash, StoreError> {
        self.inner.new_empty_dir()
    }

    fn patch_link(
        &self,
        dir: &ContentHash,
        name: &str,
        child: &ContentHash,
    ) -> std::result::Result<ContentHash, StoreError> {
        self.inner.patch_link(dir, name, child)
    }

    fn list(&self, path: &str) -> std::result::Result<Vec<Link>, StoreError> {
        self.inner.list(path)
    }
}

// ─── Recording hooks ───────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct HookCall {
    pub hook: String,
    pub language: String,
    pub args: Vec<String>,
}

/// [`HookRunner`] that records calls instead of spawning processes.
///
/// Every language has a subtool except `"none"`. A hook fails when its
/// first argument contains the configured substring.
pub(crate) struct RecordingHooks {
    pub calls: Mutex<Vec<HookCall>>,
    fail_on: Option<String>,
    install_root: PathBuf,
}

impl RecordingHooks {
    pub fn new(install_root: &Path) -> Self {
        RecordingHooks {
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            install_root: install_root.to_path_buf(),
        }
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, hook: &str) -> Vec<HookCall> {
        self.calls().into_iter().filter(|c| c.hook == hook).collect()
    }
}

impl HookRunner for RecordingHooks {
    fn subtool(&self, language: &str) -> Result<Subtool> {
        if language.is_empty() || language == "none" {
            return Ok(Subtool::None);
        }
        Ok(Subtool::Binary(PathBuf::from(format!("hashpack-{}", language))))
    }

    fn run_hook(&self, hook: &str, language: &str, required: bool, args: &[String]) -> Result<()> {
        if self.subtool(language)? == Subtool::None {
            if required {
                return Err(Error::MissingSubtool {
                    language: language.to_string(),
                });
            }
            return Ok(());
        }
        self.calls.lock().push(HookCall {
            hook: hook.to_string(),
            language: language.to_string(),
            args: args.to_vec(),
        });
        if let (Some(needle), Some(first)) = (&self.fail_on, args.first()) {
            if first.contains(needle.as_str()) {
                return Err(Error::HookFailure {
                    hook: hook.to_string(),
                    language: language.to_string(),
                    status: "exit status: 1".to_string(),
                });
            }
        }
        Ok(())
    }

    fn install_path(&self, language: &str, global: bool) -> Result<PathBuf> {
        let scope = if global { "global" } else { "local" };
        Ok(self.install_root.join(scope).join(language))
    }
}

// ─── Fixture ───────────────────────────────────────────────────────

/// A temp workspace with an instrumented object store and two install
/// roots (`vendor/` and `global/`).
pub(crate) struct Fixture {
    pub tmp: tempfile::TempDir,
    pub store: CountingStore,
    next: AtomicUsize,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let store = CountingStore::open(&tmp.path().join("store"));
        Fixture {
            tmp,
            store,
            next: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Fixture {
            store: self.store.with_delay(delay),
            ..self
        }
    }

    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn local_root(&self) -> PathBuf {
        self.tmp.path().join("vendor")
    }

    pub fn global_root(&self) -> PathBuf {
        self.tmp.path().join("global")
    }

    /// Accessor over both roots with retries that do not sleep.
    pub fn package_store(&self) -> PackageStore<'_> {
        PackageStore::new(&self.store, &self.local_root(), &self.global_root()).with_retry(
            RetryPolicy {
                attempts: 3,
                backoff: Duration::ZERO,
            },
        )
    }

    /// Fetch the whole closure of `root` into the local root, sequentially.
    pub fn fetch_closure(&self, root: &Package) {
        let ps = self.package_store();
        let mut queue = DependencyQueue::new();
        queue.enqueue(root);
        while let Some(dep) = queue.dequeue() {
            let located = ps.resolve_or_fetch(&dep.hash, Tier::Local).unwrap();
            queue.enqueue(&located.package);
        }
    }

    /// Publish `pkg` and return its hash.
    pub fn publish(&self, pkg: &Package) -> ContentHash {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let dir = self.tmp.path().join("src").join(format!("{}-{}", pkg.name, n));
        std::fs::create_dir_all(&dir).unwrap();
        save_package_file(pkg, &dir.join(PKG_FILE_NAME)).unwrap();
        std::fs::write(dir.join("README"), &pkg.name).unwrap();
        publish_package(&self.store, &dir, Path::new("vendor")).unwrap()
    }

    /// Publish a package with the given dependencies and return the edge
    /// a parent would record for it.
    pub fn dep(&self, name: &str, version: &str, deps: &[Dependency]) -> Dependency {
        let pkg = package(name, version, deps);
        let hash = self.publish(&pkg);
        pkg.as_dependency(hash)
    }

    /// Publish a package tagged with a language.
    pub fn dep_lang(&self, name: &str, language: &str, deps: &[Dependency]) -> Dependency {
        let mut pkg = package(name, "1.0.0", deps);
        pkg.language = language.to_string();
        let hash = self.publish(&pkg);
        pkg.as_dependency(hash)
    }
}

pub(crate) fn package(name: &str, version: &str, deps: &[Dependency]) -> Package {
    let mut pkg = Package::new(name, version);
    pkg.dependencies = deps.to_vec();
    pkg
}
