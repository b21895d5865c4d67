//! User configuration.
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. `~/.hashpackrc`
//! 3. `./.hashpackrc`
//! 4. `HASHPACK_STORE_DIR`, `HASHPACK_GLOBAL_ROOT`, `HASHPACK_MAX_PARALLEL`
//!
//! Rc files are JSON objects and are deep-merged, so a project rc that
//! only sets `user.email` keeps the name from the home rc.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::package::store::RetryPolicy;

pub const RC_FILE_NAME: &str = ".hashpackrc";

/// Default local install root, relative to the package directory.
pub const DEFAULT_LOCAL_ROOT: &str = "vendor";

pub const ENV_STORE_DIR: &str = "HASHPACK_STORE_DIR";
pub const ENV_GLOBAL_ROOT: &str = "HASHPACK_GLOBAL_ROOT";
pub const ENV_MAX_PARALLEL: &str = "HASHPACK_MAX_PARALLEL";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Root of the filesystem object store.
    pub store_dir: PathBuf,
    pub local_root: PathBuf,
    pub global_root: PathBuf,
    pub max_parallel: usize,
    pub fetch_attempts: u32,
    pub backoff_ms: u64,
    pub user: User,
}

impl Default for Config {
    fn default() -> Self {
        Config::with_home(home_dir().as_deref())
    }
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from)
}

impl Config {
    /// Built-in defaults with data directories under `home`.
    pub fn with_home(home: Option<&Path>) -> Self {
        let base = home
            .map(|h| h.join(".hashpack"))
            .unwrap_or_else(|| PathBuf::from(".hashpack"));
        Config {
            store_dir: base.join("store"),
            local_root: PathBuf::from(DEFAULT_LOCAL_ROOT),
            global_root: base.join("global"),
            max_parallel: crate::install::DEFAULT_MAX_PARALLEL,
            fetch_attempts: RetryPolicy::default().attempts,
            backoff_ms: 250,
            user: User::default(),
        }
    }

    /// Load the layered configuration for a process running in `cwd`.
    pub fn load(cwd: &Path) -> Result<Config> {
        Config::load_layers(home_dir().as_deref(), cwd, |key| std::env::var(key).ok())
    }

    /// Load with an explicit home directory and environment.
    pub fn load_layers(
        home: Option<&Path>,
        cwd: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Config> {
        let defaults = Config::with_home(home);
        let mut merged = serde_json::to_value(&defaults).map_err(|source| Error::Config {
            path: PathBuf::from(RC_FILE_NAME),
            source,
        })?;

        let mut rc_files = Vec::new();
        if let Some(home) = home {
            rc_files.push(home.join(RC_FILE_NAME));
        }
        let local_rc = cwd.join(RC_FILE_NAME);
        if !rc_files.contains(&local_rc) {
            rc_files.push(local_rc);
        }

        let mut config = defaults;
        for path in rc_files {
            let Some(layer) = read_rc(&path)? else {
                continue;
            };
            debug!(path = %path.display(), "loading config");
            merge(&mut merged, layer);
            config = serde_json::from_value(merged.clone())
                .map_err(|source| Error::Config { path, source })?;
        }

        if let Some(dir) = env(ENV_STORE_DIR) {
            config.store_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env(ENV_GLOBAL_ROOT) {
            config.global_root = PathBuf::from(dir);
        }
        if let Some(n) = env(ENV_MAX_PARALLEL) {
            config.max_parallel =
                serde_json::from_str(n.trim()).map_err(|source| Error::Config {
                    path: PathBuf::from(format!("${}", ENV_MAX_PARALLEL)),
                    source,
                })?;
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.fetch_attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    /// The local install root for a package rooted at `pkg_dir`.
    pub fn local_root_for(&self, pkg_dir: &Path) -> PathBuf {
        pkg_dir.join(&self.local_root)
    }
}

fn read_rc(path: &Path) -> Result<Option<Value>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
}

/// Merge `layer` into `base`: objects recursively, anything else replaced.
fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
