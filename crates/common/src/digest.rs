//! Digest newtype and the one canonical hash used across the verifier.
//!
//! Every commitment in the protocol — Merkle leaves, internal nodes, peak
//! bagging, committee hashes, update signing roots — goes through the same
//! SHA3-256 instance exposed here. Two implementations that disagree on a
//! single byte fed to `hash` produce unrelated digests, which is exactly the
//! property the disagreement games rely on.

use hex::{decode as hex_decode, encode as hex_encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest as _, Sha3_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Digest width in bytes (SHA3-256).
pub const DIGEST_SIZE: usize = 32;

/// SHA3-256 digest wrapper (32 bytes), hex-encoded for display and serde.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; DIGEST_SIZE]);

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("invalid digest length: expected {DIGEST_SIZE}, found {0}")]
    InvalidLength(usize),

    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl Digest {
    pub fn from_bytes(b: [u8; DIGEST_SIZE]) -> Self {
        Digest(b)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// All-zero digest, used as the commitment of an empty accumulator.
    pub fn zero() -> Self {
        Digest([0u8; DIGEST_SIZE])
    }

    pub fn to_hex(&self) -> String {
        hex_encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex_decode(s)?;
        if bytes.len() != DIGEST_SIZE {
            return Err(DigestError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; DIGEST_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Digest(arr))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Digest").field(&self.to_hex()).finish()
    }
}

impl FromStr for Digest {
    type Err = DigestError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Digest::from_hex(s)
    }
}

/* serde impls: hex string on the wire, same convention as addresses */
impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Digest, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash a byte slice into a [`Digest`].
#[must_use]
pub fn hash(bytes: &[u8]) -> Digest {
    let mut hasher = Sha3_256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut arr = [0u8; DIGEST_SIZE];
    arr.copy_from_slice(&out);
    Digest(arr)
}

/// Hash the concatenation of several byte strings without materializing it.
///
/// `hash_concat([a, b])` equals `hash(&concat(&[a, b]))` byte for byte.
#[must_use]
pub fn hash_concat<I, T>(parts: I) -> Digest
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    let out = hasher.finalize();
    let mut arr = [0u8; DIGEST_SIZE];
    arr.copy_from_slice(&out);
    Digest(arr)
}

/// Plain byte concatenation.
#[must_use]
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = hash(b"superlight");
        let b = hash(b"superlight");
        assert_eq!(a, b);
        assert_ne!(a, hash(b"superlighT"));
    }

    #[test]
    fn hash_concat_matches_manual_concat() {
        let joined = concat(&[b"left", b"right"]);
        assert_eq!(hash_concat([b"left".as_slice(), b"right"]), hash(&joined));
    }

    #[test]
    fn hash_concat_order_matters() {
        let ab = hash_concat([b"a".as_slice(), b"b"]);
        let ba = hash_concat([b"b".as_slice(), b"a"]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn hex_roundtrip() {
        let d = hash(b"roundtrip");
        let restored = Digest::from_hex(&d.to_hex()).expect("from hex");
        assert_eq!(d, restored);

        // 0x prefix tolerated
        let prefixed = format!("0x{}", d.to_hex());
        assert_eq!(Digest::from_hex(&prefixed).expect("prefixed"), d);
    }

    #[test]
    fn from_hex_rejects_bad_length() {
        assert!(matches!(
            Digest::from_hex("deadbeef"),
            Err(DigestError::InvalidLength(4))
        ));
    }

    #[test]
    fn serde_hex_string() {
        let d = hash(b"serde");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.to_hex()));
        let restored: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(d, restored);
    }

    #[test]
    fn zero_digest_is_all_zero() {
        assert_eq!(Digest::zero().as_bytes(), &[0u8; DIGEST_SIZE]);
    }
}
