//! Publishing a package directory into the content store.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};
use crate::package::hash::ContentHash;
use crate::package::manifest::{load_package_file, META_DIR, PKG_FILE_NAME};
use crate::package::objects::ContentStore;

/// Entries never published, at any depth.
const IGNORED: &[&str] = &[".git", ".hashpack", META_DIR];

enum Node {
    File(ContentHash),
    Dir(BTreeMap<String, Node>),
}

/// Add the package rooted at `dir` to the store and return its hash.
///
/// The published object is a directory with a single link named after the
/// package, pointing at the tree of `dir`. Installed dependencies under
/// `local_root` (relative to `dir`) are left out.
pub fn publish_package(
    store: &dyn ContentStore,
    dir: &Path,
    local_root: &Path,
) -> Result<ContentHash> {
    let pkg = load_package_file(&dir.join(PKG_FILE_NAME))?;
    let vendored = dir.join(local_root);

    let mut tree: BTreeMap<String, Node> = BTreeMap::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e) && e.path() != vendored);

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(&path, e.into())
        })?;
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let node = if entry.file_type().is_dir() {
            Node::Dir(BTreeMap::new())
        } else {
            let mut file =
                std::fs::File::open(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
            Node::File(store.add(&mut file)?)
        };
        insert(&mut tree, rel, node);
    }

    let body = store_tree(store, tree)?;
    let wrapper = store.new_empty_dir()?;
    let hash = store.patch_link(&wrapper, &pkg.name, &body)?;
    debug!(name = %pkg.name, %hash, "published");
    Ok(hash)
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    IGNORED.contains(&name.as_ref())
}

// walkdir yields a directory before its contents, so parents always exist.
fn insert(tree: &mut BTreeMap<String, Node>, rel: &Path, node: Node) {
    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let Some(leaf) = parts.pop() else {
        return;
    };
    let mut cur = tree;
    for part in parts {
        cur = match cur.entry(part).or_insert_with(|| Node::Dir(BTreeMap::new())) {
            Node::Dir(children) => children,
            Node::File(_) => return,
        };
    }
    cur.entry(leaf).or_insert(node);
}

fn store_tree(store: &dyn ContentStore, tree: BTreeMap<String, Node>) -> Result<ContentHash> {
    let mut hash = store.new_empty_dir()?;
    for (name, node) in tree {
        let child = match node {
            Node::File(h) => h,
            Node::Dir(children) => store_tree(store, children)?,
        };
        hash = store.patch_link(&hash, &name, &child)?;
    }
    Ok(hash)
}
