//! The install pipeline.
//!
//! Installing a package's dependencies runs in two phases:
//!
//! 1. Fetch: the full transitive closure is resolved against the install
//!    roots and anything missing is fetched from the content store, on a
//!    bounded worker pool. Newly fetched manifests feed more work.
//! 2. Hook: the fetched tree is walked again and every package's
//!    `post-install` hook runs once, after the hooks of all its own
//!    dependencies. A marker file under `.meta/` records completion so a
//!    later install never re-runs it.
//!
//! Lock installs skip resolution: every entry of a lock file is fetched
//! into a local cache and linked under the language's install path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::{DependencyQueue, Frontier, Scheduler, SchedulerReport};
use crate::hooks::{HookRunner, InstallPaths, POST_IMPORT, POST_INSTALL};
use crate::package::hash::ContentHash;
use crate::package::manifest::{Dependency, LockDep, LockDeps, LockFile, Package, META_DIR};
use crate::package::store::{remove_path, Located, PackageStore, Tier};
use crate::progress::Progress;

/// Lock installs fetch into `<cwd>/.hashpack/cache/<hash>`.
pub const LOCK_CACHE_DIR: &str = ".hashpack/cache";

pub const DEFAULT_MAX_PARALLEL: usize = 20;

// ─── Installer ─────────────────────────────────────────────────────

pub struct Installer<'a> {
    packages: &'a PackageStore<'a>,
    hooks: &'a dyn HookRunner,
    scheduler: Scheduler,
    global: bool,
    /// Recorded on imported edges when the package names no author.
    author: Option<String>,
}

impl<'a> Installer<'a> {
    pub fn new(packages: &'a PackageStore<'a>, hooks: &'a dyn HookRunner) -> Self {
        Installer {
            packages,
            hooks,
            scheduler: Scheduler::new(DEFAULT_MAX_PARALLEL),
            global: false,
            author: None,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.scheduler = Scheduler::new(max_parallel);
        self
    }

    /// Install into the global root and pass `--global` to hooks.
    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// Default author for imported edges; empty means none.
    pub fn author(mut self, name: &str) -> Self {
        self.author = (!name.is_empty()).then(|| name.to_string());
        self
    }

    fn tier(&self) -> Tier {
        if self.global {
            Tier::Global
        } else {
            Tier::Local
        }
    }

    fn progress(&self) -> &Progress {
        self.packages.progress()
    }

    /// Fetch the whole closure of `root`, then run post-install hooks
    /// bottom-up.
    pub fn install_deps(&self, root: &Package) -> Result<SchedulerReport> {
        let report = self.fetch_all(root)?;
        self.post_install_all(root)?;
        Ok(report)
    }

    /// Install one package by hash along with its closure.
    pub fn install_package(&self, hash: &ContentHash) -> Result<Located> {
        let located = self.packages.resolve_or_fetch(hash, self.tier())?;
        self.install_deps(&located.package)?;
        self.post_install(&located)?;
        Ok(located)
    }

    /// Install `hash` as a new direct dependency and run its post-import
    /// hook. Returns the edge to append to the importing manifest.
    pub fn import(&self, hash: &ContentHash) -> Result<Dependency> {
        let located = self.install_package(hash)?;
        let pkg = &located.package;
        self.hooks.run_hook(
            POST_IMPORT,
            &pkg.language,
            pkg.subtool_required,
            &[hash.to_hex()],
        )?;
        info!(name = %pkg.name, %hash, "imported");
        let mut dep = pkg.as_dependency(*hash);
        dep.author = pkg
            .extra
            .get("author")
            .and_then(|a| a.as_str())
            .map(str::to_string)
            .or_else(|| self.author.clone());
        Ok(dep)
    }

    // ── Phase 1: fetch ─────────────────────────────────────────

    /// Resolve or fetch every package reachable from `root`.
    pub fn fetch_all(&self, root: &Package) -> Result<SchedulerReport> {
        let mut frontier = FetchFrontier {
            queue: DependencyQueue::new(),
            progress: self.progress(),
        };
        let seeded = frontier.queue.enqueue(root);
        self.progress().add_todos(seeded);
        info!(
            root = %root.name,
            direct = seeded,
            max_parallel = self.scheduler.max_parallel(),
            "fetching dependencies"
        );

        let packages = self.packages;
        let tier = self.tier();
        let report = self.scheduler.run(&mut frontier, |dep: Dependency| {
            packages.resolve_or_fetch(&dep.hash, tier)
        })?;
        info!(
            packages = report.completed,
            peak = report.peak_active,
            "fetch complete"
        );
        Ok(report)
    }

    // ── Phase 2: hooks ─────────────────────────────────────────

    /// Run post-install hooks over the fetched closure of `root`,
    /// dependencies before dependents.
    pub fn post_install_all(&self, root: &Package) -> Result<()> {
        let mut done = HashSet::new();
        let mut queue = DependencyQueue::new();
        queue.enqueue(root);
        while let Some(dep) = queue.dequeue() {
            let located = self.packages.load_dependency(&dep)?;
            self.ensure_hooked(&dep.hash, &located, &mut done)?;
            queue.enqueue(&located.package);
        }
        Ok(())
    }

    fn ensure_hooked(
        &self,
        hash: &ContentHash,
        located: &Located,
        done: &mut HashSet<ContentHash>,
    ) -> Result<()> {
        if !done.insert(*hash) {
            return Ok(());
        }
        for child in &located.package.dependencies {
            let child_located = self.packages.load_dependency(child)?;
            self.ensure_hooked(&child.hash, &child_located, done)?;
        }
        self.post_install(located)
    }

    /// Run the post-install hook of one package unless its marker exists.
    fn post_install(&self, located: &Located) -> Result<()> {
        let meta = located.package_dir().join(META_DIR);
        let marker = meta.join(POST_INSTALL);
        if marker.exists() {
            self.progress().record_hook_skipped();
            return Ok(());
        }

        let pkg = &located.package;
        let mut args = vec![located.hash_dir.display().to_string()];
        if self.global {
            args.push("--global".to_string());
        }
        debug!(name = %pkg.name, "post-install");
        self.hooks
            .run_hook(POST_INSTALL, &pkg.language, pkg.subtool_required, &args)?;
        self.progress().record_hook();

        std::fs::create_dir_all(&meta).map_err(|e| Error::io(&meta, e))?;
        std::fs::write(&marker, b"").map_err(|e| Error::io(&marker, e))
    }

    // ── Lock install ───────────────────────────────────────────

    /// Fetch every entry of `lock` into the lock cache under `cwd` and
    /// link it into its language's install path.
    pub fn install_lock(&self, lock: &LockFile, cwd: &Path) -> Result<SchedulerReport> {
        let mut frontier = LockFrontier {
            pending: Vec::new(),
            deferred: Vec::new(),
            seen: HashSet::new(),
            paths: InstallPaths::new(),
            hooks: self.hooks,
            global: self.global,
            cwd,
            progress: self.progress(),
        };
        frontier.push_all(&lock.deps)?;
        info!(entries = lock.entry_count(), "installing from lock file");

        let packages = self.packages;
        let cache = cwd.join(LOCK_CACHE_DIR);
        let fetch_and_link = |job: LockJob| -> Result<LockJob> {
            let dest = cache.join(job.dep.reference.to_hex());
            let fetched = packages.fetch_to(&job.dep.reference, &dest)?;
            link_package(&fetched.package_dir(), &job.link)?;
            debug!(link = %job.link.display(), "linked");
            Ok(job)
        };
        let report = self.scheduler.run(&mut frontier, &fetch_and_link)?;

        // Entries sharing a hash with an earlier one are only linked once
        // that hash is in the cache.
        for job in std::mem::take(&mut frontier.deferred) {
            fetch_and_link(job)?;
        }
        Ok(report)
    }
}

// ─── Frontiers ─────────────────────────────────────────────────────

struct FetchFrontier<'p> {
    queue: DependencyQueue,
    progress: &'p Progress,
}

impl Frontier for FetchFrontier<'_> {
    type Job = Dependency;
    type Output = Located;

    fn next_job(&mut self) -> Option<Dependency> {
        self.queue.dequeue()
    }

    fn complete(&mut self, located: Located) -> Result<()> {
        let added = self.queue.enqueue(&located.package);
        self.progress.add_todos(added);
        Ok(())
    }
}

struct LockJob {
    link: PathBuf,
    dep: LockDep,
}

struct LockFrontier<'a> {
    pending: Vec<LockJob>,
    /// Entries whose hash is already scheduled.
    deferred: Vec<LockJob>,
    seen: HashSet<ContentHash>,
    paths: InstallPaths,
    hooks: &'a dyn HookRunner,
    global: bool,
    cwd: &'a Path,
    progress: &'a Progress,
}

impl LockFrontier<'_> {
    fn push_all(&mut self, deps: &LockDeps) -> Result<()> {
        for (language, entries) in deps {
            let root = self.paths.get(self.hooks, language, self.global)?;
            for (name, dep) in entries {
                let job = LockJob {
                    link: self.cwd.join(&root).join(name),
                    dep: dep.clone(),
                };
                self.progress.add_todos(1);
                if self.seen.insert(dep.reference) {
                    self.pending.push(job);
                } else {
                    if let Some(nested) = &dep.deps {
                        self.push_all(nested)?;
                    }
                    self.deferred.push(job);
                }
            }
        }
        Ok(())
    }
}

impl Frontier for LockFrontier<'_> {
    type Job = LockJob;
    type Output = LockJob;

    fn next_job(&mut self) -> Option<LockJob> {
        self.pending.pop()
    }

    fn complete(&mut self, job: LockJob) -> Result<()> {
        match &job.dep.deps {
            Some(nested) => self.push_all(nested),
            None => Ok(()),
        }
    }
}

/// Point `link` at `target`, replacing whatever `link` held before.
fn link_package(target: &Path, link: &Path) -> Result<()> {
    remove_path(link)?;
    if let Some(parent) = link.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    link_dir(target, link)
}

#[cfg(unix)]
fn link_dir(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(|e| Error::io(link, e))
}

#[cfg(not(unix))]
fn link_dir(target: &Path, link: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(target) {
        let entry = entry.map_err(|e| Error::io(target, e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(target) else {
            continue;
        };
        let to = link.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&to).map_err(|e| Error::io(&to, e))?;
        } else {
            std::fs::copy(entry.path(), &to).map_err(|e| Error::io(&to, e))?;
        }
    }
    Ok(())
}
