use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::HASH_LEN;

/// A 32-byte chain hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Id32(pub [u8; HASH_LEN]);

impl Id32 {
    pub const fn new(from: [u8; HASH_LEN]) -> Id32 {
        Id32(from)
    }

    /// Returns None if `b` is not exactly 32 bytes.
    pub fn from_bytes(b: &[u8]) -> Option<Id32> {
        let arr: [u8; HASH_LEN] = b.try_into().ok()?;
        Some(Id32(arr))
    }

    pub fn as_string(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl AsRef<[u8]> for Id32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Id32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x?}")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Id32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Id32 {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; HASH_LEN];
        if s.len() != HASH_LEN * 2 {
            anyhow::bail!("expected a hex string of length {}", HASH_LEN * 2)
        };
        hex::decode_to_slice(s, &mut out)?;
        Ok(Id32(out))
    }
}

impl Serialize for Id32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for Id32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = Id32;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a 64 character hex string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Id32::from_str(v).map_err(E::custom)
            }
        }
        deserializer.deserialize_str(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_through_serde() {
        let mut raw = [0u8; 32];
        raw[0] = 0xab;
        raw[31] = 0x01;
        let id = Id32::new(raw);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(
            json,
            "\"ab00000000000000000000000000000000000000000000000000000000000001\""
        );
        let back: Id32 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_from_str_rejects_wrong_length() {
        assert!(Id32::from_str("abcd").is_err());
    }

    #[test]
    fn test_from_bytes() {
        assert!(Id32::from_bytes(&[0u8; 31]).is_none());
        assert!(Id32::from_bytes(&[0u8; 32]).unwrap().is_zero());
    }
}
