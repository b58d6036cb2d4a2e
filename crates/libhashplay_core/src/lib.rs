pub mod cache_key;
pub mod chain;
pub mod constants;
pub mod directories;
pub mod error;
pub mod hash_id;
pub mod lengths;

pub use cache_key::CacheKey;
pub use error::{Error, Result};
pub use hash_id::Id32;

assert_cfg::exactly_one! {
    feature = "sha256-rust",
    feature = "sha256-crypto-hash",
}
