use std::path::{Path, PathBuf};

use libhashplay_core::{
    CacheKey, Error, Id32, Result,
    constants::HASH_LEN,
    directories::default_cache_dir,
    lengths::{Lengths, ValidBlockIndex},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::{CacheStore, CacheWriter, PublishOutcome};

const STAGING_PREFIX: &str = ".staging-";
const GEOMETRY_FILE: &str = "geometry.json";

#[derive(Serialize, Deserialize)]
struct StoredGeometry {
    total_length: u64,
    block_size: u64,
}

/// Keeps each chain in its own directory, one file per block, next to the
/// geometry it was built with:
///
/// ```text
/// <root>/<cache key>/geometry.json
/// <root>/<cache key>/<block index>.sha256
/// ```
///
/// A chain is built in a uniquely named staging directory next to its final
/// location and renamed into place when complete.
#[derive(Debug, Clone)]
pub struct FilesystemCacheStore {
    root: PathBuf,
}

impl Default for FilesystemCacheStore {
    fn default() -> Self {
        Self::new(default_cache_dir())
    }
}

impl FilesystemCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn hash_file(dir: &Path, index: ValidBlockIndex) -> PathBuf {
        dir.join(format!("{index}.sha256"))
    }
}

impl CacheStore for FilesystemCacheStore {
    fn contains(&self, key: &CacheKey) -> Result<bool> {
        let dir = self.key_dir(key);
        match std::fs::metadata(&dir) {
            Ok(m) if m.is_dir() => Ok(true),
            Ok(_) => Err(Error::CacheCorrupt(dir)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(Error::Stat { path: dir, source }),
        }
    }

    fn begin(&self, key: &CacheKey, lengths: &Lengths) -> Result<Box<dyn CacheWriter + '_>> {
        let staging = self
            .root
            .join(format!("{STAGING_PREFIX}{key}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&staging).map_err(|source| Error::CreateCacheDir {
            path: staging.clone(),
            source,
        })?;
        debug!(?staging, "created staging directory");
        let writer = FilesystemCacheWriter {
            store: self,
            key: key.clone(),
            staging,
            published: false,
        };

        let path = writer.staging.join(GEOMETRY_FILE);
        let geometry = StoredGeometry {
            total_length: lengths.total_length(),
            block_size: lengths.default_block_length(),
        };
        let json = serde_json::to_vec(&geometry).map_err(|e| Error::CacheWrite {
            path: path.clone(),
            source: e.into(),
        })?;
        std::fs::write(&path, json).map_err(|source| Error::CacheWrite { path, source })?;
        Ok(Box::new(writer))
    }

    fn read_lengths(&self, key: &CacheKey) -> Result<Lengths> {
        let path = self.key_dir(key).join(GEOMETRY_FILE);
        let buf = match std::fs::read(&path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.contains(key)? {
                    return Err(Error::CacheCorrupt(path));
                }
                return Err(Error::ChainNotCached(key.clone()));
            }
            Err(source) => return Err(Error::CacheRead { path, source }),
        };
        let geometry: StoredGeometry = match serde_json::from_slice(&buf) {
            Ok(g) => g,
            Err(e) => {
                warn!(?path, "error parsing chain geometry: {e:#}");
                return Err(Error::CacheCorrupt(path));
            }
        };
        Lengths::new(geometry.total_length, geometry.block_size)
            .ok_or(Error::CacheCorrupt(path))
    }

    fn read_hash(&self, key: &CacheKey, index: ValidBlockIndex) -> Result<Id32> {
        let path = Self::hash_file(&self.key_dir(key), index);
        let buf = match std::fs::read(&path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CacheMiss { index: index.get() });
            }
            Err(source) => return Err(Error::CacheRead { path, source }),
        };
        Id32::from_bytes(&buf).ok_or(Error::CacheEntryWrongSize {
            index: index.get(),
            len: buf.len(),
        })
    }
}

struct FilesystemCacheWriter<'a> {
    store: &'a FilesystemCacheStore,
    key: CacheKey,
    staging: PathBuf,
    published: bool,
}

impl CacheWriter for FilesystemCacheWriter<'_> {
    fn write_hash(&mut self, index: ValidBlockIndex, hash: &Id32) -> Result<()> {
        let path = FilesystemCacheStore::hash_file(&self.staging, index);
        trace!(?path, "writing hash");
        debug_assert_eq!(hash.as_bytes().len(), HASH_LEN);
        std::fs::write(&path, hash.as_bytes()).map_err(|source| Error::CacheWrite { path, source })
    }

    fn publish(mut self: Box<Self>) -> Result<PublishOutcome> {
        self.published = true;
        let staging = std::mem::take(&mut self.staging);
        let target = self.store.key_dir(&self.key);
        match std::fs::rename(&staging, &target) {
            Ok(()) => {
                debug!(?target, "published cache");
                Ok(PublishOutcome::Published)
            }
            Err(source) => {
                remove_staging(&staging);
                // Losing a rename race leaves the winner's directory in place.
                if self.store.contains(&self.key)? {
                    debug!(?target, "cache was published concurrently, joining it");
                    return Ok(PublishOutcome::Joined);
                }
                Err(Error::CachePublish {
                    path: target,
                    source,
                })
            }
        }
    }
}

impl Drop for FilesystemCacheWriter<'_> {
    fn drop(&mut self) {
        if !self.published {
            remove_staging(&self.staging);
        }
    }
}

fn remove_staging(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging) {
        warn!(?staging, "error removing staging directory: {e:#}");
    }
}
