//! Chain hashing and verification.
//!
//! Every block is hashed together with the chain hash of the block after it:
//!
//! ```text
//! hash(last) = SHA256(block[last] || 0x00 * 32)
//! hash(i)    = SHA256(block[i]    || hash(i + 1))
//! ```
//!
//! so `hash(0)`, the root hash, commits to the whole file. A consumer that
//! trusts the root hash can verify blocks one at a time from the start of the
//! file, each verified block handing over the hash to trust for the next one.

use bytes::{Bytes, BytesMut};

use crate::{Error, Id32, Result, constants::HASH_LEN};

/// Trailer of the last block. Seeing it after a successful verification means
/// the chain is complete.
pub const fn zero_hash() -> Id32 {
    Id32::new([0u8; HASH_LEN])
}

/// SHA256(block || next)
pub fn hash_link(block: &[u8], next: &Id32) -> Id32 {
    Id32::new(sha256w::digest_parts(&[block, next.as_bytes()]))
}

/// SHA-256 of a whole "block || hash" string as it travels to the consumer.
pub fn hash_bytes(buf: &[u8]) -> Id32 {
    Id32::new(sha256w::digest_parts(&[buf]))
}

/// Builds the bytes served for one block: its content followed by the chain
/// hash of the next block, or the zero hash for the last one.
pub fn make_hashed_block(block: &[u8], next: &Id32) -> Bytes {
    let mut buf = BytesMut::with_capacity(block.len() + HASH_LEN);
    buf.extend_from_slice(block);
    buf.extend_from_slice(next.as_bytes());
    buf.freeze()
}

/// A block that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedBlock {
    pub block: Bytes,
    /// The hash to trust for the next request.
    pub next_hash: Id32,
}

impl VerifiedBlock {
    /// The last block of a chain carries the zero hash. Nothing should be
    /// requested after it.
    pub fn is_terminal(&self) -> bool {
        self.next_hash.is_zero()
    }
}

/// Checks `hashed_block` against `trusted` and splits it into the block and
/// the next hash to trust.
///
/// Any mismatch is [`Error::VerificationFailed`]. The data is either corrupt or
/// adversarial and nothing more should be read from whoever sent it.
pub fn verify(trusted: &Id32, hashed_block: Bytes) -> Result<VerifiedBlock> {
    if hashed_block.len() <= HASH_LEN {
        return Err(Error::TooShort(hashed_block.len()));
    }

    let actual = hash_bytes(&hashed_block);
    if actual != *trusted {
        return Err(Error::VerificationFailed {
            expected: *trusted,
            actual,
        });
    }

    let split_at = hashed_block.len() - HASH_LEN;
    let next_hash = Id32::from_bytes(&hashed_block[split_at..]).ok_or(Error::TooShort(split_at))?;
    let block = hashed_block.slice(..split_at);
    Ok(VerifiedBlock { block, next_hash })
}

/// Consumer side of the chain. Holds the currently trusted hash and moves it
/// forward with every verified block.
///
/// The first rejected block poisons the verifier. Nothing is accepted after
/// it, not even the correct bytes for the same slot.
#[derive(Debug)]
pub struct ChainVerifier {
    trusted: Id32,
    verified_blocks: u64,
    finished: bool,
    failed: bool,
}

impl ChainVerifier {
    pub fn new(root_hash: Id32) -> Self {
        Self {
            trusted: root_hash,
            verified_blocks: 0,
            finished: false,
            failed: false,
        }
    }

    pub fn trusted_hash(&self) -> &Id32 {
        &self.trusted
    }

    pub fn verified_blocks(&self) -> u64 {
        self.verified_blocks
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether a block was rejected.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Verifies the next block.
    pub fn accept(&mut self, hashed_block: Bytes) -> Result<VerifiedBlock> {
        if self.failed {
            return Err(Error::ChainPoisoned {
                verified_blocks: self.verified_blocks,
            });
        }
        if self.finished {
            return Err(Error::ChainFinished);
        }
        let verified = verify(&self.trusted, hashed_block)
            .inspect_err(|_| self.failed = true)?;
        self.trusted = verified.next_hash;
        self.verified_blocks += 1;
        self.finished = verified.is_terminal();
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds the chain in memory for `data`, returning root hash and served blocks.
    fn build(data: &[u8], block_size: usize) -> (Id32, Vec<Bytes>) {
        let blocks: Vec<&[u8]> = data.chunks(block_size).collect();
        let mut next = zero_hash();
        let mut served = Vec::new();
        for b in blocks.iter().rev() {
            served.push(make_hashed_block(b, &next));
            next = hash_link(b, &next);
        }
        served.reverse();
        (next, served)
    }

    #[test]
    fn test_hash_link_equals_hash_of_served_bytes() {
        let next = hash_bytes(b"whatever");
        let served = make_hashed_block(b"hello", &next);
        assert_eq!(hash_link(b"hello", &next), hash_bytes(&served));
    }

    #[test]
    fn test_verify_splits_block_and_hash() {
        let next = hash_bytes(b"next");
        let served = make_hashed_block(b"content", &next);
        let trusted = hash_bytes(&served);
        let v = verify(&trusted, served).unwrap();
        assert_eq!(&v.block[..], b"content");
        assert_eq!(v.next_hash, next);
        assert!(!v.is_terminal());
    }

    #[test]
    fn test_verify_too_short() {
        let err = verify(&zero_hash(), Bytes::from(vec![0u8; 32])).unwrap_err();
        assert!(matches!(err, Error::TooShort(32)));
        let err = verify(&zero_hash(), Bytes::new()).unwrap_err();
        assert!(matches!(err, Error::TooShort(0)));
    }

    #[test]
    fn test_verify_detects_any_flipped_byte() {
        let served = make_hashed_block(b"abc", &zero_hash());
        let trusted = hash_bytes(&served);
        for i in 0..served.len() {
            let mut tampered = served.to_vec();
            tampered[i] ^= 0x01;
            let err = verify(&trusted, tampered.into()).unwrap_err();
            assert!(matches!(err, Error::VerificationFailed { .. }), "byte {i}");
        }
    }

    #[test]
    fn test_chain_verifier_walks_whole_chain() {
        let data: Vec<u8> = (0..100u8).collect();
        let (root, served) = build(&data, 7);
        let mut v = ChainVerifier::new(root);
        let mut out = Vec::new();
        for s in served {
            out.extend_from_slice(&v.accept(s).unwrap().block);
        }
        assert_eq!(out, data);
        assert!(v.is_finished());
        assert!(v.trusted_hash().is_zero());
        assert_eq!(v.verified_blocks(), 15);
    }

    #[test]
    fn test_chain_verifier_refuses_after_terminal() {
        let (root, served) = build(b"tiny", 1024);
        let mut v = ChainVerifier::new(root);
        v.accept(served[0].clone()).unwrap();
        assert!(matches!(
            v.accept(served[0].clone()),
            Err(Error::ChainFinished)
        ));
    }

    #[test]
    fn test_chain_verifier_refuses_after_failure() {
        let served = make_hashed_block(b"genuine", &zero_hash());
        let root = hash_bytes(&served);
        let mut v = ChainVerifier::new(root);

        let mut tampered = served.to_vec();
        tampered[0] ^= 0xff;
        assert!(matches!(
            v.accept(tampered.into()),
            Err(Error::VerificationFailed { .. })
        ));
        assert!(v.is_failed());

        // The genuine bytes for the same slot are refused too.
        assert!(matches!(
            v.accept(served),
            Err(Error::ChainPoisoned { verified_blocks: 0 })
        ));
        assert_eq!(v.trusted_hash(), &root);
        assert!(!v.is_finished());
    }

    #[test]
    fn test_too_short_block_poisons_verifier() {
        let (root, served) = build(b"some data", 4);
        let mut v = ChainVerifier::new(root);
        assert!(matches!(
            v.accept(Bytes::from_static(&[0u8; 8])),
            Err(Error::TooShort(8))
        ));
        assert!(matches!(
            v.accept(served[0].clone()),
            Err(Error::ChainPoisoned { .. })
        ));
    }

    #[test]
    fn test_out_of_order_block_fails() {
        let data = vec![42u8; 64];
        let (root, served) = build(&data, 16);
        let mut v = ChainVerifier::new(root);
        // Identical content, but block 1 carries a different successor hash.
        assert!(matches!(
            v.accept(served[1].clone()),
            Err(Error::VerificationFailed { .. })
        ));
    }
}
