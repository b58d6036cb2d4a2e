//! Where chain hashes live between preparing a file and serving it.
//!
//! A store holds one 32-byte hash per `(CacheKey, block index)`, plus the block
//! geometry the chain was built with. Entries for a
//! key are written through a [`CacheWriter`] and only become visible once the
//! writer is published, so readers never observe a half-built chain.

pub mod filesystem;
pub mod inmemory;

use libhashplay_core::{
    CacheKey, Id32, Result,
    lengths::{Lengths, ValidBlockIndex},
};

pub use filesystem::FilesystemCacheStore;
pub use inmemory::InMemoryCacheStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Our entries are now the ones stored under the key.
    Published,
    /// Someone else published the key first. Our entries were dropped and
    /// theirs are used.
    Joined,
}

pub trait CacheStore: Send + Sync {
    /// Whether a published chain exists for `key`.
    fn contains(&self, key: &CacheKey) -> Result<bool>;

    /// Starts writing a chain for `key`, built with `lengths`.
    fn begin(&self, key: &CacheKey, lengths: &Lengths) -> Result<Box<dyn CacheWriter + '_>>;

    /// The geometry a published chain was built with.
    fn read_lengths(&self, key: &CacheKey) -> Result<Lengths>;

    fn read_hash(&self, key: &CacheKey, index: ValidBlockIndex) -> Result<Id32>;
}

/// Dropping a writer without publishing discards everything written to it.
pub trait CacheWriter: Send {
    fn write_hash(&mut self, index: ValidBlockIndex, hash: &Id32) -> Result<()>;

    /// Atomically makes the written entries visible under the key, unless
    /// another writer got there first.
    fn publish(self: Box<Self>) -> Result<PublishOutcome>;
}
