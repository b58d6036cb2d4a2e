use std::path::PathBuf;

use bytes::Bytes;

use crate::{CacheKey, Id32};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0:?} is not a regular file")]
    NotARegularFile(PathBuf),
    #[error("{0:?} is empty, there is nothing to chain")]
    EmptyFile(PathBuf),
    #[error("error reading metadata of {path:?}: {source:#}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error opening {path:?}: {source:#}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error seeking to block {index} at offset {offset}: {source:#}")]
    Seek {
        index: u64,
        offset: u64,
        #[source]
        source: std::io::Error,
    },
    /// The bytes that were read before the failure are in `partial`. They are
    /// not verified and must not be forwarded.
    #[error("error reading block {index}, got {} bytes before failing: {source:#}", .partial.len())]
    ReadBlock {
        index: u64,
        partial: Bytes,
        #[source]
        source: std::io::Error,
    },

    #[error("cache entry {0:?} is corrupt")]
    CacheCorrupt(PathBuf),
    #[error("cache entry for block {index} has {len} bytes, expected 32")]
    CacheEntryWrongSize { index: u64, len: usize },
    #[error("no cached hash for block {index}")]
    CacheMiss { index: u64 },
    #[error("no cached chain for key {0}")]
    ChainNotCached(CacheKey),
    #[error("error creating cache directory {path:?}: {source:#}")]
    CreateCacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error writing cache entry {path:?}: {source:#}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error reading cache entry {path:?}: {source:#}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error publishing cache {path:?}: {source:#}")]
    CachePublish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hashed block too short, expected length > 32, got {0}")]
    TooShort(usize),
    #[error("hashed block failed verification, expected {expected:?}, got {actual:?}")]
    VerificationFailed { expected: Id32, actual: Id32 },
    #[error("chain already reached its terminal block")]
    ChainFinished,
    #[error("chain rejected a block after {verified_blocks} verified ones, refusing further input")]
    ChainPoisoned { verified_blocks: u64 },

    #[error("end of stream")]
    EndOfStream,
}

impl Error {
    /// End of stream is how a finished chain is reported. Everything else is a failure.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}
