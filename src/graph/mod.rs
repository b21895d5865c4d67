//! Dependency graph traversal.
//!
//! The graph is never materialized: it is the tree of manifests reachable
//! from one root, walked on demand. [`DependencyQueue`] gives the
//! visit-each-hash-once order, [`Scheduler`] runs the visits on a bounded
//! worker pool, and [`check`] validates the installed closure.

pub mod check;
mod queue;
mod scheduler;
mod walk;

pub use check::{check, CheckOptions, CheckReport};
pub use queue::DependencyQueue;
pub use scheduler::{Frontier, Scheduler, SchedulerReport};
pub use walk::{enumerate_dependencies, for_each_dep, render_tree};
