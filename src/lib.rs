//! hashpack: a content-addressed package manager.
//!
//! Packages live in a content store and are named by the BLAKE3 hash of
//! their contents. A manifest pins each dependency by hash, so a graph is
//! immutable once published: installing it means fetching every hash in
//! its closure and running the language subtool's hooks over the result.

pub mod config;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod install;
pub mod package;
pub mod progress;
pub mod update;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use error::{Error, Result};
pub use graph::{check, CheckOptions, CheckReport, Scheduler, SchedulerReport};
pub use hooks::{HookRunner, InstallPaths, Subtool, SubtoolRunner};
pub use install::Installer;
pub use package::hash::ContentHash;
pub use package::manifest::{Dependency, LockFile, Package};
pub use package::objects::{ContentStore, FsObjectStore, StoreError};
pub use package::store::{FetchOutcome, Located, PackageStore, RetryPolicy, Tier};
pub use progress::Progress;
pub use update::{update_direct, Cascade, CascadeReport};
