// Wrapper for sha256 libraries.
// Hashing every block twice (once when preparing, once when verifying) is
// where nearly all the CPU goes, so the backend is swappable with a feature.
// The pure-rust one is the default as it needs nothing from the system.

#[cfg(feature = "sha256-crypto-hash")]
pub type Sha256 = Sha256System;

#[cfg(all(feature = "sha256-rust", not(feature = "sha256-crypto-hash")))]
pub type Sha256 = Sha256Rust;

pub trait ISha256 {
    fn new() -> Self;
    fn update(&mut self, buf: &[u8]);
    fn finish(self) -> [u8; 32];
}

/// One-shot helper over several buffers.
pub fn digest_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut h = Sha256::new();
    for p in parts {
        h.update(p);
    }
    h.finish()
}

#[cfg(feature = "sha256-rust")]
pub struct Sha256Rust {
    inner: sha2::Sha256,
}

#[cfg(feature = "sha256-rust")]
impl ISha256 for Sha256Rust {
    fn new() -> Self {
        use sha2::Digest;
        Sha256Rust {
            inner: sha2::Sha256::new(),
        }
    }

    fn update(&mut self, buf: &[u8]) {
        use sha2::Digest;
        self.inner.update(buf)
    }

    fn finish(self) -> [u8; 32] {
        use sha2::Digest;
        self.inner.finalize().into()
    }
}

#[cfg(feature = "sha256-crypto-hash")]
pub struct Sha256System {
    inner: crypto_hash::Hasher,
}

#[cfg(feature = "sha256-crypto-hash")]
impl ISha256 for Sha256System {
    fn new() -> Self {
        Self {
            inner: crypto_hash::Hasher::new(crypto_hash::Algorithm::SHA256),
        }
    }

    fn update(&mut self, buf: &[u8]) {
        use std::io::Write;
        // Hasher's Write impl never fails.
        let _ = self.inner.write_all(buf);
    }

    fn finish(mut self) -> [u8; 32] {
        let result = self.inner.finish();
        debug_assert_eq!(result.len(), 32);
        let mut result_arr = [0u8; 32];
        result_arr.copy_from_slice(&result);
        result_arr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("abc")
    const ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn hex(b: &[u8]) -> String {
        b.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_known_vector() {
        let mut h = Sha256::new();
        h.update(b"abc");
        assert_eq!(hex(&h.finish()), ABC);
    }

    #[test]
    fn test_digest_parts_matches_single_update() {
        assert_eq!(hex(&digest_parts(&[b"a", b"", b"bc"])), ABC);
    }
}
