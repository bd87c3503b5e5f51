//! Fixed-size key material and client identities

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::fingerprint::{FINGERPRINT_LEN, fingerprint};

/// Length of a root or topic key in bytes (AES-256-SIV)
pub const KEY_LEN: usize = 64;

/// Length of a client identity in bytes
pub const ID_LEN: usize = FINGERPRINT_LEN;

/// A 64-byte AES-SIV key, used both as root key and as topic key.
///
/// Zeroized on drop. `Debug` never prints key bytes and equality is
/// constant time.
#[derive(Clone)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key from a slice. `None` unless exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; KEY_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// 32-byte client identity.
///
/// Either random or derived from a human-readable alias with
/// [`ClientId::from_alias`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId([u8; ID_LEN]);

impl ClientId {
    /// Wrap raw id bytes.
    pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse an id from a slice. `None` unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; ID_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Derive the id from an alias (SHA3-256 of the alias bytes).
    pub fn from_alias(alias: &str) -> Self {
        Self(fingerprint(alias))
    }

    /// Raw id bytes.
    pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.to_hex())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_debug_is_redacted() {
        let key = SymmetricKey::from_bytes([0x42; KEY_LEN]);
        let rendered = format!("{key:?}");

        assert_eq!(rendered, "SymmetricKey([REDACTED])");
        assert!(!rendered.contains("42"));
    }

    #[test]
    fn key_from_slice_requires_exact_length() {
        assert!(SymmetricKey::from_slice(&[0u8; 63]).is_none());
        assert!(SymmetricKey::from_slice(&[0u8; 65]).is_none());
        assert!(SymmetricKey::from_slice(&[0u8; 64]).is_some());
    }

    #[test]
    fn key_equality() {
        let a = SymmetricKey::from_bytes([1; KEY_LEN]);
        let b = SymmetricKey::from_bytes([1; KEY_LEN]);
        let mut c_bytes = [1; KEY_LEN];
        c_bytes[63] = 2;
        let c = SymmetricKey::from_bytes(c_bytes);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn alias_derivation_is_deterministic() {
        let a = ClientId::from_alias("sensor-17");
        let b = ClientId::from_alias("sensor-17");
        let c = ClientId::from_alias("sensor-18");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_bytes(), &fingerprint("sensor-17"));
    }
}
