//! Topic and alias fingerprints using SHA3-256

use std::fmt;

use sha3::{Digest, Sha3_256};

/// Length of a fingerprint in bytes
pub const FINGERPRINT_LEN: usize = 32;

/// Hash arbitrary bytes into a 32-byte identifier.
///
/// Deterministic and infallible. The empty string is a valid input.
pub fn fingerprint(data: impl AsRef<[u8]>) -> [u8; FINGERPRINT_LEN] {
    Sha3_256::digest(data.as_ref()).into()
}

/// SHA3-256 fingerprint of a topic name.
///
/// Used as the lookup key for topic keys. The topic name cannot be recovered
/// from it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprint of a topic name.
    pub fn of(topic: impl AsRef<[u8]>) -> Self {
        Self(fingerprint(topic))
    }

    /// Wrap raw fingerprint bytes.
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a fingerprint from a slice. `None` unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; FINGERPRINT_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Raw fingerprint bytes.
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
