use tracing::{debug, warn};

use crate::constants::DEFAULT_BLOCK_SIZE;

pub const fn ceil_div_u64(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

/// Size of the last element when `total` is cut into `chunk_size` pieces.
/// Never zero for a non-zero total, even when it divides evenly.
pub const fn last_element_size_u64(total: u64, chunk_size: u64) -> u64 {
    (total - 1) % chunk_size + 1
}

/// Turns a caller-provided block size into a usable one. Non-positive sizes
/// fall back to [`DEFAULT_BLOCK_SIZE`] with a warning.
pub fn coerce_block_size(block_size: i64) -> u64 {
    if block_size <= 0 {
        warn!(
            block_size,
            default = DEFAULT_BLOCK_SIZE,
            "invalid block size, using default"
        );
        return DEFAULT_BLOCK_SIZE;
    }
    block_size as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub index: ValidBlockIndex,
    pub offset: u64,
    pub len: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidBlockIndex(u64);

impl std::fmt::Display for ValidBlockIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Debug for ValidBlockIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl ValidBlockIndex {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Block geometry of one file. Block 0 is the start of the file, the last
/// block may be shorter than the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lengths {
    total_length: u64,
    block_length: u64,
    last_block_id: u64,
    last_block_length: u64,
}

impl Lengths {
    /// Returns None for an empty file or a zero block size.
    pub fn new(total_length: u64, block_length: u64) -> Option<Self> {
        if total_length == 0 || block_length == 0 {
            return None;
        }
        let total_blocks = ceil_div_u64(total_length, block_length);
        let l = Self {
            total_length,
            block_length,
            last_block_id: total_blocks - 1,
            last_block_length: last_element_size_u64(total_length, block_length),
        };
        debug!(
            num_blocks = l.total_blocks(),
            highest_block_size = l.last_block_length,
            "computed block geometry"
        );
        Some(l)
    }

    pub const fn total_length(&self) -> u64 {
        self.total_length
    }
    pub const fn default_block_length(&self) -> u64 {
        self.block_length
    }
    pub const fn total_blocks(&self) -> u64 {
        self.last_block_id + 1
    }
    pub const fn last_block_id(&self) -> ValidBlockIndex {
        ValidBlockIndex(self.last_block_id)
    }
    /// Length of the last block, the "highest block size".
    pub const fn last_block_length(&self) -> u64 {
        self.last_block_length
    }
    pub const fn validate_block_index(&self, index: u64) -> Option<ValidBlockIndex> {
        if index > self.last_block_id {
            return None;
        }
        Some(ValidBlockIndex(index))
    }
    pub const fn is_last(&self, index: ValidBlockIndex) -> bool {
        index.0 == self.last_block_id
    }
    pub const fn block_length(&self, index: ValidBlockIndex) -> u64 {
        if index.0 == self.last_block_id {
            return self.last_block_length;
        }
        self.block_length
    }
    pub const fn block_offset(&self, index: ValidBlockIndex) -> u64 {
        index.0 * self.block_length
    }
    pub const fn block_info(&self, index: ValidBlockIndex) -> BlockInfo {
        BlockInfo {
            index,
            offset: self.block_offset(index),
            len: self.block_length(index),
        }
    }

    /// Blocks from the start of the file to its end, the order they are served in.
    pub fn iter_block_infos(&self) -> impl DoubleEndedIterator<Item = BlockInfo> + use<> {
        let l = *self;
        (0..self.total_blocks()).map(move |idx| l.block_info(ValidBlockIndex(idx)))
    }

    /// Blocks from the end of the file back to its start, the order chain hashes are built in.
    pub fn iter_block_infos_rev(&self) -> impl Iterator<Item = BlockInfo> + use<> {
        self.iter_block_infos().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned() {
        let l = Lengths::new(10240, 1024).unwrap();
        assert_eq!(l.total_blocks(), 10);
        assert_eq!(l.last_block_length(), 1024);
        assert_eq!(l.block_offset(l.last_block_id()), 9216);
    }

    #[test]
    fn test_misaligned() {
        let l = Lengths::new(10241, 1024).unwrap();
        assert_eq!(l.total_blocks(), 11);
        assert_eq!(l.last_block_length(), 1);
    }

    #[test]
    fn test_smaller_than_one_block() {
        let l = Lengths::new(11, 1024).unwrap();
        assert_eq!(l.total_blocks(), 1);
        assert_eq!(l.last_block_length(), 11);
        assert_eq!(l.last_block_id().get(), 0);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(Lengths::new(0, 1024).is_none());
        assert!(Lengths::new(10, 0).is_none());
    }

    #[test]
    fn test_last_block_always_in_range() {
        for total in 1..200u64 {
            for bs in 1..20u64 {
                let l = Lengths::new(total, bs).unwrap();
                assert!(l.total_blocks() >= 1);
                assert!(l.last_block_length() > 0 && l.last_block_length() <= bs);
                assert_eq!(l.total_blocks(), (total - 1) / bs + 1);
                let sum: u64 = l.iter_block_infos().map(|b| b.len).sum();
                assert_eq!(sum, total);
            }
        }
    }

    #[test]
    fn test_validate_index() {
        let l = Lengths::new(3000, 1024).unwrap();
        assert!(l.validate_block_index(2).is_some());
        assert!(l.validate_block_index(3).is_none());
    }

    #[test]
    fn test_reverse_iteration_starts_at_last_block() {
        let l = Lengths::new(2100, 1000).unwrap();
        let rev: Vec<_> = l.iter_block_infos_rev().map(|b| (b.offset, b.len)).collect();
        assert_eq!(rev, vec![(2000, 100), (1000, 1000), (0, 1000)]);
    }

    #[test]
    fn test_coerce_block_size() {
        assert_eq!(coerce_block_size(0), DEFAULT_BLOCK_SIZE);
        assert_eq!(coerce_block_size(-5), DEFAULT_BLOCK_SIZE);
        assert_eq!(coerce_block_size(4096), 4096);
    }
}
