use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as Sha2Digest, Sha256};

use crate::validation::ValidationError;

/// Length in bytes of a SHA-256 digest.
pub const HASH_LEN: usize = 32;

/// SHA-256 digest. Hex-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    /// Hashes `bytes` with SHA-256.
    pub fn digest(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Wraps raw digest bytes.
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Decodes a hex string into a hash, rejecting non-hex input and wrong lengths.
    pub fn from_hex(value: &str) -> Result<Self, ValidationError> {
        let bytes = hex::decode(value).map_err(|_| ValidationError::InvalidHex {
            field: "hash",
            value: value.to_string(),
        })?;
        let array: [u8; HASH_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ValidationError::InvalidLength {
                    field: "hash",
                    expected: HASH_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Starts an ordered pairing with `self` as the left operand.
    ///
    /// `a.pair().with(&b)` is `SHA-256(a || b)`. Operands are never reordered.
    pub fn pair(&self) -> HashPair<'_> {
        HashPair { left: self }
    }
}

/// Left half of an ordered hash pairing; see [`Hash::pair`].
#[derive(Debug, Clone, Copy)]
pub struct HashPair<'a> {
    left: &'a Hash,
}

impl HashPair<'_> {
    /// Completes the pairing: `SHA-256(left || right)`.
    pub fn with(self, right: &Hash) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.left.0);
        hasher.update(right.0);
        Hash(hasher.finalize().into())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
