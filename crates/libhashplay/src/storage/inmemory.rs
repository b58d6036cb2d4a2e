use std::collections::HashMap;

use libhashplay_core::{
    CacheKey, Error, Id32, Result,
    lengths::{Lengths, ValidBlockIndex},
};
use parking_lot::RwLock;

use super::{CacheStore, CacheWriter, PublishOutcome};

struct Chain {
    lengths: Lengths,
    hashes: HashMap<ValidBlockIndex, Id32>,
}

/// Keeps chains in process memory. Useful for tests and for short-lived
/// processes that never want to touch the disk.
#[derive(Default)]
pub struct InMemoryCacheStore {
    chains: RwLock<HashMap<CacheKey, Chain>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chains.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for InMemoryCacheStore {
    fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.chains.read().contains_key(key))
    }

    fn begin(&self, key: &CacheKey, lengths: &Lengths) -> Result<Box<dyn CacheWriter + '_>> {
        Ok(Box::new(InMemoryCacheWriter {
            store: self,
            key: key.clone(),
            pending: Chain {
                lengths: *lengths,
                hashes: HashMap::new(),
            },
        }))
    }

    fn read_lengths(&self, key: &CacheKey) -> Result<Lengths> {
        self.chains
            .read()
            .get(key)
            .map(|chain| chain.lengths)
            .ok_or_else(|| Error::ChainNotCached(key.clone()))
    }

    fn read_hash(&self, key: &CacheKey, index: ValidBlockIndex) -> Result<Id32> {
        self.chains
            .read()
            .get(key)
            .and_then(|chain| chain.hashes.get(&index))
            .copied()
            .ok_or(Error::CacheMiss { index: index.get() })
    }
}

struct InMemoryCacheWriter<'a> {
    store: &'a InMemoryCacheStore,
    key: CacheKey,
    pending: Chain,
}

impl CacheWriter for InMemoryCacheWriter<'_> {
    fn write_hash(&mut self, index: ValidBlockIndex, hash: &Id32) -> Result<()> {
        self.pending.hashes.insert(index, *hash);
        Ok(())
    }

    fn publish(self: Box<Self>) -> Result<PublishOutcome> {
        let this = *self;
        let mut g = this.store.chains.write();
        match g.entry(this.key) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(PublishOutcome::Joined),
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(this.pending);
                Ok(PublishOutcome::Published)
            }
        }
    }
}
