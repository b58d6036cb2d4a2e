use std::path::{Path, PathBuf};

use crate::{Error, Result, chain::hash_bytes};

/// Identity of a file inside a cache store: hex(SHA256(canonical path)).
///
/// Only the path is hashed, not the content. A file rewritten in place keeps
/// its key and will be served with the hashes computed the first time.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Resolves `path` to its canonical form and derives the key from it.
    pub fn for_path(path: &Path) -> Result<(CacheKey, PathBuf)> {
        let canonical = path.canonicalize().map_err(|source| Error::Stat {
            path: path.to_owned(),
            source,
        })?;
        Ok((Self::from_canonical_path(&canonical), canonical))
    }

    /// Derives the key without touching the filesystem. `path` should already be canonical.
    pub fn from_canonical_path(path: &Path) -> CacheKey {
        CacheKey(hash_bytes(path.as_os_str().as_encoded_bytes()).as_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CacheKey({})", self.0)
    }
}
