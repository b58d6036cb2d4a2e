use std::{
    io::{Read, Seek},
    path::{Path, PathBuf},
    sync::Arc,
};

use libhashplay_core::{
    CacheKey, Error, Id32, Result,
    chain::{hash_link, zero_hash},
    constants::DEFAULT_BLOCK_SIZE,
    lengths::{Lengths, coerce_block_size},
};
use tracing::{debug, info, trace, warn};

use crate::{
    block_server::BlockServer,
    file_ops::{block_buffer, read_block},
    opened_file::LazyFile,
    storage::{CacheStore, CacheWriter, PublishOutcome},
};

#[derive(Debug, Clone, Copy)]
pub struct EncoderOptions {
    /// Non-positive values fall back to [`DEFAULT_BLOCK_SIZE`].
    pub block_size: i64,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE as i64,
        }
    }
}

/// A file whose chain hashes are in the cache store and can be served.
#[derive(Debug, Clone)]
pub struct PreparedFile {
    pub path: PathBuf,
    pub key: CacheKey,
    pub lengths: Lengths,
    /// The chain was already in the store and was not rebuilt.
    pub cache_hit: bool,
}

/// Prepares files and hands out block servers for them. All files share one
/// cache store, each under its own key.
#[derive(Clone)]
pub struct Encoder {
    store: Arc<dyn CacheStore>,
    options: EncoderOptions,
}

impl Encoder {
    pub fn new(store: Arc<dyn CacheStore>, options: EncoderOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Builds the chain for `path` unless the store already has one for it.
    ///
    /// The store is looked up by path only. A file modified in place after
    /// it was first prepared keeps being served with its old hashes, and a
    /// cached chain is always served with the block size it was built with.
    pub fn prepare(&self, path: &Path) -> Result<PreparedFile> {
        let meta = std::fs::metadata(path).map_err(|source| Error::Stat {
            path: path.to_owned(),
            source,
        })?;
        if !meta.is_file() {
            return Err(Error::NotARegularFile(path.to_owned()));
        }

        let block_size = coerce_block_size(self.options.block_size);
        let lengths = Lengths::new(meta.len(), block_size)
            .ok_or_else(|| Error::EmptyFile(path.to_owned()))?;
        let (key, canonical) = CacheKey::for_path(path)?;

        if self.store.contains(&key)? {
            let cached = self.store.read_lengths(&key)?;
            if cached != lengths {
                warn!(
                    ?path,
                    %key,
                    cached_block_size = cached.default_block_length(),
                    cached_total_length = cached.total_length(),
                    block_size,
                    total_length = meta.len(),
                    "cached chain was built with different geometry, serving it as cached"
                );
            }
            info!(?path, %key, "cache hit");
            return Ok(PreparedFile {
                path: canonical,
                key,
                lengths: cached,
                cache_hit: true,
            });
        }

        info!(
            ?path,
            %key,
            num_blocks = lengths.total_blocks(),
            highest_block_size = lengths.last_block_length(),
            "cache miss, building chain"
        );
        let mut file = LazyFile::new(canonical);
        let mut writer = self.store.begin(&key, &lengths)?;
        let root = build_chain(file.get()?, &lengths, writer.as_mut())?;
        file.close();

        let lengths = match writer.publish()? {
            PublishOutcome::Published => {
                debug!(%key, root = %root, "chain published");
                lengths
            }
            PublishOutcome::Joined => {
                info!(%key, "chain was built concurrently by someone else, using theirs");
                self.store.read_lengths(&key)?
            }
        };

        Ok(PreparedFile {
            path: file.path().to_owned(),
            key,
            lengths,
            cache_hit: false,
        })
    }

    /// Starts serving a prepared file. The file itself is not opened until
    /// the first block is requested.
    pub fn serve(&self, prepared: PreparedFile) -> BlockServer {
        BlockServer::new(prepared, self.store.clone())
    }
}

/// Hashes the file from its last block back to its first, writing every
/// chain hash to `writer`. Returns the root hash.
pub fn build_chain<F: Read + Seek>(
    file: &mut F,
    lengths: &Lengths,
    writer: &mut dyn CacheWriter,
) -> Result<Id32> {
    let mut buf = block_buffer(lengths);
    let mut next = zero_hash();
    for info in lengths.iter_block_infos_rev() {
        let block = read_block(file, &info, &mut buf)?;
        next = hash_link(block, &next);
        trace!(index = %info.index, hash = %next, "hashed block");
        writer.write_hash(info.index, &next)?;
    }
    Ok(next)
}
