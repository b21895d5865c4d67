pub mod check;
pub mod deps;
pub mod import;
pub mod install;
pub mod publish;
pub mod update;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use hashpack::config::Config;
use hashpack::hooks::SubtoolRunner;
use hashpack::package::manifest::{find_package_root, load_package_file, Package, PKG_FILE_NAME};
use hashpack::{FsObjectStore, PackageStore};

/// Everything a command needs: the package being worked on, the layered
/// config and the object store it points at.
pub struct Session {
    pub config: Config,
    pub root_dir: PathBuf,
    pub store: FsObjectStore,
}

impl Session {
    /// Locate the enclosing package and open the configured store.
    /// `store_dir` overrides the configured store location.
    pub fn open(store_dir: Option<PathBuf>) -> Result<Session> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        let root_dir = find_package_root(&cwd)
            .ok_or_else(|| anyhow!("no {} found (run from a package directory)", PKG_FILE_NAME))?;
        let mut config = Config::load(&cwd)?;
        if let Some(dir) = store_dir {
            config.store_dir = dir;
        }
        let store = FsObjectStore::open(&config.store_dir)
            .with_context(|| format!("cannot open store {}", config.store_dir.display()))?;
        Ok(Session {
            config,
            root_dir,
            store,
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root_dir.join(PKG_FILE_NAME)
    }

    pub fn load_root(&self) -> Result<Package> {
        Ok(load_package_file(&self.manifest_path())?)
    }

    pub fn local_root(&self) -> PathBuf {
        self.config.local_root_for(&self.root_dir)
    }

    pub fn packages(&self) -> PackageStore<'_> {
        PackageStore::new(&self.store, &self.local_root(), &self.config.global_root)
            .with_retry(self.config.retry_policy())
    }

    pub fn hooks(&self) -> SubtoolRunner {
        SubtoolRunner::new(&self.local_root(), &self.config.global_root)
    }
}
