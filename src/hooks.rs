//! Language subtool hooks.
//!
//! Packages with a `language` tag delegate language-specific work to a
//! separate binary named `hashpack-<language>`. The engine only knows the
//! process contract:
//!
//! ```text
//! hashpack-<language> hook <hook-name> <args...>
//! ```
//!
//! A zero exit status is success. `hook install-path [--global]` prints
//! the directory lock installs should link into.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

pub const POST_INSTALL: &str = "post-install";
pub const POST_IMPORT: &str = "post-import";
pub const INSTALL_PATH: &str = "install-path";

/// Result of looking up a language's subtool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Subtool {
    /// No language, or no binary found.
    None,
    Binary(PathBuf),
}

/// Runs lifecycle hooks on behalf of the install engine.
pub trait HookRunner: Sync {
    fn subtool(&self, language: &str) -> Result<Subtool>;

    /// Run `hook` for a package in `language`.
    ///
    /// A missing subtool is a no-op unless `required` is set.
    fn run_hook(&self, hook: &str, language: &str, required: bool, args: &[String]) -> Result<()>;

    /// The directory dependencies of `language` are linked into.
    fn install_path(&self, language: &str, global: bool) -> Result<PathBuf>;
}

// ─── Process Runner ────────────────────────────────────────────────

/// [`HookRunner`] that spawns `hashpack-<language>` binaries.
///
/// Binaries are searched on `PATH`, then next to the running executable.
pub struct SubtoolRunner {
    local_root: PathBuf,
    global_root: PathBuf,
    search_path: Option<Vec<PathBuf>>,
}

impl SubtoolRunner {
    pub fn new(local_root: &Path, global_root: &Path) -> Self {
        SubtoolRunner {
            local_root: local_root.to_path_buf(),
            global_root: global_root.to_path_buf(),
            search_path: None,
        }
    }

    /// Search only `dirs` for subtool binaries.
    pub fn with_search_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_path = Some(dirs);
        self
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if let Some(dirs) = &self.search_path {
            return dirs.clone();
        }
        let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                dirs.push(dir.to_path_buf());
            }
        }
        dirs
    }

    fn default_root(&self, global: bool) -> PathBuf {
        if global {
            self.global_root.clone()
        } else {
            self.local_root.clone()
        }
    }
}

/// File name of the subtool binary for `language`.
pub fn subtool_binary_name(language: &str) -> String {
    format!("hashpack-{}{}", language, std::env::consts::EXE_SUFFIX)
}

impl HookRunner for SubtoolRunner {
    fn subtool(&self, language: &str) -> Result<Subtool> {
        if language.is_empty() {
            return Ok(Subtool::None);
        }
        let name = subtool_binary_name(language);
        Ok(self
            .search_dirs()
            .into_iter()
            .map(|dir| dir.join(&name))
            .find(|candidate| candidate.is_file())
            .map_or(Subtool::None, Subtool::Binary))
    }

    fn run_hook(&self, hook: &str, language: &str, required: bool, args: &[String]) -> Result<()> {
        let bin = match self.subtool(language)? {
            Subtool::Binary(bin) => bin,
            Subtool::None if required => {
                return Err(Error::MissingSubtool {
                    language: language.to_string(),
                })
            }
            Subtool::None => {
                debug!(hook, language, "no subtool, skipping hook");
                return Ok(());
            }
        };

        debug!(hook, language, ?args, "running hook");
        let status = Command::new(&bin)
            .arg("hook")
            .arg(hook)
            .args(args)
            .status()
            .map_err(|e| Error::Subtool {
                language: language.to_string(),
                source: e,
            })?;
        if !status.success() {
            return Err(Error::HookFailure {
                hook: hook.to_string(),
                language: language.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    fn install_path(&self, language: &str, global: bool) -> Result<PathBuf> {
        let bin = match self.subtool(language)? {
            Subtool::Binary(bin) => bin,
            Subtool::None => return Ok(self.default_root(global)),
        };

        let mut cmd = Command::new(&bin);
        cmd.arg("hook").arg(INSTALL_PATH);
        if global {
            cmd.arg("--global");
        }
        let output = cmd
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| Error::Subtool {
                language: language.to_string(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(Error::HookFailure {
                hook: INSTALL_PATH.to_string(),
                language: language.to_string(),
                status: output.status.to_string(),
            });
        }

        let printed = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if printed.is_empty() {
            return Ok(self.default_root(global));
        }
        Ok(PathBuf::from(printed))
    }
}

// ─── Install Path Cache ────────────────────────────────────────────

/// Memoizes install paths for the lifetime of one operation.
#[derive(Debug, Default)]
pub struct InstallPaths {
    cache: HashMap<(String, bool), PathBuf>,
}

impl InstallPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &mut self,
        runner: &dyn HookRunner,
        language: &str,
        global: bool,
    ) -> Result<PathBuf> {
        let key = (language.to_string(), global);
        if let Some(path) = self.cache.get(&key) {
            return Ok(path.clone());
        }
        let path = runner.install_path(language, global)?;
        self.cache.insert(key, path.clone());
        Ok(path)
    }
}
