use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ContentStore, Link, StoreError};
use crate::package::hash::ContentHash;

const BLOB_EXT: &str = "blob";
const DIR_EXT: &str = "dir";

/// Content store kept in a local directory.
///
/// Layout:
/// ```text
/// <root>/objects/
///   <2-char-prefix>/
///     <full-hex-hash>.blob    raw file bytes
///     <full-hex-hash>.dir     JSON array of {name, hash}, sorted by name
/// ```
///
/// Blob hashes cover `"blob\0" ‖ bytes`, directory hashes cover
/// `"dir\0" ‖ canonical JSON`, so the two kinds never collide. Objects are
/// written through a temp file and renamed into place; once written they
/// are never modified.
pub struct FsObjectStore {
    root: PathBuf,
}

enum Object {
    Blob(PathBuf),
    Dir(Vec<Link>),
}

impl FsObjectStore {
    /// Open (or create) an object store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let objects = root.join("objects");
        fs::create_dir_all(&objects).map_err(|e| StoreError::io(&objects, e))?;
        Ok(FsObjectStore {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether an object with this hash has been stored.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.object_path(hash, BLOB_EXT).is_file() || self.object_path(hash, DIR_EXT).is_file()
    }

    fn object_path(&self, hash: &ContentHash, ext: &str) -> PathBuf {
        let hex = hash.to_hex();
        self.root
            .join("objects")
            .join(&hex[..2])
            .join(format!("{}.{}", hex, ext))
    }

    fn write_object(&self, hash: &ContentHash, ext: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.object_path(hash, ext);
        if path.exists() {
            return Ok(());
        }
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::InvalidPath(path.display().to_string()))?;
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(bytes).map_err(|e| StoreError::io(dir, e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;
        Ok(())
    }

    fn load(&self, hash: &ContentHash) -> Result<Object, StoreError> {
        let blob = self.object_path(hash, BLOB_EXT);
        if blob.is_file() {
            return Ok(Object::Blob(blob));
        }

        let dir = self.object_path(hash, DIR_EXT);
        let bytes = match fs::read(&dir) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(*hash))
            }
            Err(e) => return Err(StoreError::io(&dir, e)),
        };
        let links = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            hash: *hash,
            reason: e.to_string(),
        })?;
        Ok(Object::Dir(links))
    }

    fn dir_links(&self, hash: &ContentHash, path: &str) -> Result<Vec<Link>, StoreError> {
        match self.load(hash)? {
            Object::Dir(links) => Ok(links),
            Object::Blob(_) => Err(StoreError::InvalidPath(format!(
                "{} is not a directory",
                path
            ))),
        }
    }

    fn put_dir(&self, mut links: Vec<Link>) -> Result<ContentHash, StoreError> {
        links.sort();
        let bytes = serde_json::to_vec(&links)
            .map_err(|e| StoreError::Unavailable(format!("cannot encode directory: {}", e)))?;
        let hash = ContentHash::of_parts(&[b"dir\0", &bytes]);
        self.write_object(&hash, DIR_EXT, &bytes)?;
        Ok(hash)
    }

    fn materialize(&self, hash: &ContentHash, dest: &Path) -> Result<(), StoreError> {
        match self.load(hash)? {
            Object::Blob(path) => {
                fs::copy(&path, dest).map_err(|e| StoreError::io(dest, e))?;
            }
            Object::Dir(links) => {
                fs::create_dir_all(dest).map_err(|e| StoreError::io(dest, e))?;
                for link in &links {
                    validate_link_name(&link.name)?;
                    self.materialize(&link.hash, &dest.join(&link.name))?;
                }
            }
        }
        Ok(())
    }
}

/// Link names become path components on `get`; reject anything that could
/// escape the destination directory.
fn validate_link_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\')
    {
        return Err(StoreError::InvalidPath(name.to_string()));
    }
    Ok(())
}

impl ContentStore for FsObjectStore {
    fn get(&self, hash: &ContentHash, dest: &Path) -> Result<(), StoreError> {
        debug!(%hash, dest = %dest.display(), "materializing object");
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        self.materialize(hash, dest)
    }

    fn add(&self, reader: &mut dyn Read) -> Result<ContentHash, StoreError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| StoreError::io(Path::new("<input>"), e))?;
        let hash = ContentHash::of_parts(&[b"blob\0", &bytes]);
        self.write_object(&hash, BLOB_EXT, &bytes)?;
        Ok(hash)
    }

    fn new_empty_dir(&self) -> Result<ContentHash, StoreError> {
        self.put_dir(Vec::new())
    }

    fn patch_link(
        &self,
        dir: &ContentHash,
        name: &str,
        child: &ContentHash,
    ) -> Result<ContentHash, StoreError> {
        validate_link_name(name)?;
        let mut links = self.dir_links(dir, &dir.to_hex())?;
        links.retain(|l| l.name != name);
        links.push(Link {
            name: name.to_string(),
            hash: *child,
        });
        self.put_dir(links)
    }

    fn list(&self, path: &str) -> Result<Vec<Link>, StoreError> {
        let mut segments = path.trim_matches('/').split('/');
        let root = segments
            .next()
            .and_then(ContentHash::from_hex)
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        let mut links = self.dir_links(&root, path)?;
        for segment in segments.filter(|s| !s.is_empty()) {
            let next = links
                .iter()
                .find(|l| l.name == segment)
                .map(|l| l.hash)
                .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
            links = self.dir_links(&next, path)?;
        }
        Ok(links)
    }
}
