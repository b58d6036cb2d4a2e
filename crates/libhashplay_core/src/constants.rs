/// Block size used when the caller asks for a non-positive one.
pub const DEFAULT_BLOCK_SIZE: u64 = 1024;

/// Length of every chain hash, and of the trailer appended to each served block.
pub const HASH_LEN: usize = 32;
