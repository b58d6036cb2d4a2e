//!
//! Streams files as a chain of blocks that a consumer can verify one at a
//! time against a single trusted root hash.
//!
//! # Quick usage example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libhashplay::*;
//!
//! let encoder = Encoder::new(
//!     Arc::new(FilesystemCacheStore::default()),
//!     EncoderOptions::default(),
//! );
//! let prepared = encoder.prepare("movie.mp4".as_ref()).unwrap();
//! let mut server = encoder.serve(prepared);
//!
//! // The root hash reaches the consumer through some trusted channel.
//! let root = Id32::from_bytes(&server.request(0).unwrap()).unwrap();
//! let mut verifier = ChainVerifier::new(root);
//! for n in 1.. {
//!     let verified = verifier.accept(server.request(n).unwrap()).unwrap();
//!     // use verified.block
//!     if verified.is_terminal() {
//!         break;
//!     }
//! }
//! ```
//!
//! # Overview
//! [`Encoder::prepare`] builds the chain hashes of a file into a
//! [`CacheStore`], from the end of the file backwards. [`BlockServer`] then
//! serves blocks from the start, each followed by the hash that verifies the
//! next one, and [`ChainVerifier`] checks them on the consumer side.

mod block_server;
mod encoder;
mod file_ops;
mod opened_file;
pub mod storage;
mod stream;
#[cfg(feature = "tracing-subscriber-utils")]
pub mod tracing_subscriber_config_utils;

pub use block_server::BlockServer;
pub use encoder::{Encoder, EncoderOptions, PreparedFile, build_chain};
pub use storage::{
    CacheStore, CacheWriter, FilesystemCacheStore, InMemoryCacheStore, PublishOutcome,
};
pub use stream::{StreamSummary, stream_file};

pub use libhashplay_core::chain::{ChainVerifier, VerifiedBlock, verify};
pub use libhashplay_core::lengths::Lengths;
pub use libhashplay_core::{CacheKey, Error, Id32, Result};

#[cfg(test)]
mod tests;

/// The cargo version of libhashplay.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
