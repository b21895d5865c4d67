use std::collections::BTreeMap;
use std::fmt::Write;

use super::DependencyQueue;
use crate::error::Result;
use crate::package::hash::ContentHash;
use crate::package::manifest::{Dependency, Package};
use crate::package::store::{Located, PackageStore};

/// Visit every installed package reachable from `root`, each hash once,
/// in breadth-first discovery order.
pub fn for_each_dep<V>(store: &PackageStore<'_>, root: &Package, mut visit: V) -> Result<()>
where
    V: FnMut(&Dependency, &Located) -> Result<()>,
{
    let mut queue = DependencyQueue::new();
    queue.enqueue(root);
    while let Some(dep) = queue.dequeue() {
        let located = store.load_dependency(&dep)?;
        visit(&dep, &located)?;
        queue.enqueue(&located.package);
    }
    Ok(())
}

/// The transitive closure of `root`, hash → package name.
pub fn enumerate_dependencies(
    store: &PackageStore<'_>,
    root: &Package,
) -> Result<BTreeMap<ContentHash, String>> {
    let mut out = BTreeMap::new();
    for_each_dep(store, root, |dep, located| {
        out.insert(dep.hash, located.package.name.clone());
        Ok(())
    })?;
    Ok(out)
}

/// Render the dependency tree of `root`, two spaces of indent per level.
///
/// Shared subtrees are printed under every importer. With `quiet`, only
/// hashes are printed.
pub fn render_tree(store: &PackageStore<'_>, root: &Package, quiet: bool) -> Result<String> {
    let mut out = String::new();
    render_level(store, root, 0, quiet, &mut out)?;
    Ok(out)
}

fn render_level(
    store: &PackageStore<'_>,
    pkg: &Package,
    depth: usize,
    quiet: bool,
    out: &mut String,
) -> Result<()> {
    for dep in &pkg.dependencies {
        let located = store.load_dependency(dep)?;
        let indent = "  ".repeat(depth);
        let _ = if quiet {
            writeln!(out, "{}{}", indent, dep.hash)
        } else {
            let line = format!(
                "{} {} {}",
                located.package.name, dep.hash, located.package.version
            );
            writeln!(out, "{}{}", indent, line.trim_end())
        };
        render_level(store, &located.package, depth + 1, quiet, out)?;
    }
    Ok(())
}
