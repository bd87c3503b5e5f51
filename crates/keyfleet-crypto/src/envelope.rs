//! Timestamped envelopes using AES-256-SIV
//!
//! The `*_at` functions are pure - the caller provides the current time.
//! This enables deterministic testing of the freshness window. [`protect`]
//! and [`unprotect`] read the system clock.

use std::time::{SystemTime, UNIX_EPOCH};

use aes_siv::{KeyInit, siv::Aes256Siv};

use crate::{error::EnvelopeError, keys::KEY_LEN};

/// Size of the little-endian timestamp prefix (8 bytes)
pub const TIMESTAMP_LEN: usize = 8;

/// Size of the AES-SIV synthetic IV (16 bytes)
pub const TAG_LEN: usize = 16;

/// Smallest well-formed envelope: timestamp plus synthetic IV
pub const MIN_ENVELOPE_LEN: usize = TIMESTAMP_LEN + TAG_LEN;

/// Maximum age of an envelope in seconds. The boundary itself is accepted.
pub const MAX_TIMESTAMP_DELAY_SECS: u64 = 600;

/// Current Unix time in whole seconds.
///
/// A clock set before 1970 reads as 0, which makes every envelope look like
/// it comes from the future and is rejected.
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// Protect a payload under `key`, stamped with the system clock.
///
/// # Errors
///
/// - `InvalidKey`: key is not 64 bytes
pub fn protect(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    protect_at(plaintext, key, unix_now())
}

/// Unprotect an envelope under `key`, checked against the system clock.
///
/// # Errors
///
/// See [`unprotect_at`].
pub fn unprotect(envelope: &[u8], key: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    unprotect_at(envelope, key, unix_now())
}

/// Protect a payload under `key` with timestamp `now`.
///
/// Output is `now (8 bytes LE) || synthetic IV (16) || ciphertext`, so it is
/// always exactly `plaintext.len() + 24` bytes.
///
/// # Security
///
/// - AES-SIV is deterministic, there is no nonce to manage or reuse
/// - The timestamp is the only associated data, binding it into the tag
pub fn protect_at(plaintext: &[u8], key: &[u8], now: u64) -> Result<Vec<u8>, EnvelopeError> {
    let mut cipher = build_cipher(key)?;
    let timestamp = now.to_le_bytes();

    let Ok(ciphertext) = cipher.encrypt([&timestamp], plaintext) else {
        unreachable!("AES-SIV encryption cannot fail with a single associated data field");
    };

    let mut envelope = Vec::with_capacity(TIMESTAMP_LEN + ciphertext.len());
    envelope.extend_from_slice(&timestamp);
    envelope.extend_from_slice(&ciphertext);

    debug_assert_eq!(envelope.len(), plaintext.len() + MIN_ENVELOPE_LEN);
    Ok(envelope)
}

/// Unprotect an envelope under `key`, judging freshness against `now`.
///
/// Checks run in this order: length, key, timestamp window, tag.
///
/// # Errors
///
/// - `Malformed`: fewer than 24 bytes
/// - `InvalidKey`: key is not 64 bytes
/// - `FutureTimestamp`: envelope timestamp is after `now`
/// - `StaleTimestamp`: envelope is more than 600 seconds old
/// - `AuthenticationFailed`: tag mismatch, for any reason
pub fn unprotect_at(envelope: &[u8], key: &[u8], now: u64) -> Result<Vec<u8>, EnvelopeError> {
    if envelope.len() < MIN_ENVELOPE_LEN {
        return Err(EnvelopeError::Malformed { len: envelope.len(), min: MIN_ENVELOPE_LEN });
    }

    let mut cipher = build_cipher(key)?;

    let (timestamp, ciphertext) = envelope.split_at(TIMESTAMP_LEN);
    let mut ts_bytes = [0u8; TIMESTAMP_LEN];
    ts_bytes.copy_from_slice(timestamp);
    check_freshness(u64::from_le_bytes(ts_bytes), now)?;

    cipher.decrypt([timestamp], ciphertext).map_err(|_| EnvelopeError::AuthenticationFailed)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Siv, EnvelopeError> {
    if key.len() != KEY_LEN {
        return Err(EnvelopeError::InvalidKey { expected: KEY_LEN, actual: key.len() });
    }

    Aes256Siv::new_from_slice(key)
        .map_err(|_| EnvelopeError::InvalidKey { expected: KEY_LEN, actual: key.len() })
}

fn check_freshness(timestamp: u64, now: u64) -> Result<(), EnvelopeError> {
    if now < timestamp {
        return Err(EnvelopeError::FutureTimestamp { timestamp, now });
    }

    if now - timestamp > MAX_TIMESTAMP_DELAY_SECS {
        return Err(EnvelopeError::StaleTimestamp { timestamp, now });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn test_key(seed: u8) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_add(seed);
        }
        key
    }

    #[test]
    fn protect_unprotect_roundtrip() {
        let key = test_key(0);
        let envelope = protect_at(b"Hello, World!", &key, NOW).unwrap();
        let plaintext = unprotect_at(&envelope, &key, NOW).unwrap();

        assert_eq!(plaintext, b"Hello, World!");
    }

    #[test]
    fn empty_payload_roundtrip() {
        let key = test_key(1);
        let envelope = protect_at(b"", &key, NOW).unwrap();

        assert_eq!(envelope.len(), MIN_ENVELOPE_LEN);
        assert_eq!(unprotect_at(&envelope, &key, NOW).unwrap(), b"");
    }

    #[test]
    fn envelope_layout() {
        let key = test_key(2);
        let envelope = protect_at(b"test message", &key, NOW).unwrap();

        assert_eq!(envelope.len(), b"test message".len() + TIMESTAMP_LEN + TAG_LEN);
        assert_eq!(&envelope[..TIMESTAMP_LEN], &NOW.to_le_bytes());
    }

    #[test]
    fn same_second_is_deterministic() {
        let key = test_key(3);
        let a = protect_at(b"payload", &key, NOW).unwrap();
        let b = protect_at(b"payload", &key, NOW).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn different_timestamps_change_ciphertext() {
        let key = test_key(3);
        let a = protect_at(b"payload", &key, NOW).unwrap();
        let b = protect_at(b"payload", &key, NOW + 1).unwrap();

        assert_ne!(a[TIMESTAMP_LEN..], b[TIMESTAMP_LEN..]);
    }

    #[test]
    fn freshness_window_boundaries() {
        let key = test_key(4);

        let at_now = protect_at(b"x", &key, NOW).unwrap();
        assert!(unprotect_at(&at_now, &key, NOW).is_ok());

        let future = protect_at(b"x", &key, NOW + 1).unwrap();
        assert_eq!(
            unprotect_at(&future, &key, NOW),
            Err(EnvelopeError::FutureTimestamp { timestamp: NOW + 1, now: NOW })
        );

        let edge = protect_at(b"x", &key, NOW - MAX_TIMESTAMP_DELAY_SECS).unwrap();
        assert!(unprotect_at(&edge, &key, NOW).is_ok());

        let stale = protect_at(b"x", &key, NOW - MAX_TIMESTAMP_DELAY_SECS - 1).unwrap();
        assert_eq!(
            unprotect_at(&stale, &key, NOW),
            Err(EnvelopeError::StaleTimestamp { timestamp: NOW - 601, now: NOW })
        );
    }

    #[test]
    fn replay_inside_window_is_accepted() {
        let key = test_key(5);
        let envelope = protect_at(b"replayed", &key, NOW).unwrap();

        assert!(unprotect_at(&envelope, &key, NOW + 10).is_ok());
        assert!(unprotect_at(&envelope, &key, NOW + 10).is_ok());
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let envelope = protect_at(b"secret", &test_key(6), NOW).unwrap();
        let result = unprotect_at(&envelope, &test_key(7), NOW);

        assert_eq!(result, Err(EnvelopeError::AuthenticationFailed));
    }

    #[test]
    fn swapped_timestamp_fails_authentication() {
        let key = test_key(8);
        let mut envelope = protect_at(b"secret", &key, NOW).unwrap();
        envelope[..TIMESTAMP_LEN].copy_from_slice(&(NOW - 5).to_le_bytes());

        assert_eq!(unprotect_at(&envelope, &key, NOW), Err(EnvelopeError::AuthenticationFailed));
    }

    #[test]
    fn truncated_ciphertext_fails_authentication() {
        let key = test_key(9);
        let envelope = protect_at(b"some longer payload", &key, NOW).unwrap();

        let result = unprotect_at(&envelope[..envelope.len() - 1], &key, NOW);
        assert_eq!(result, Err(EnvelopeError::AuthenticationFailed));
    }

    #[test]
    fn short_input_is_malformed() {
        let result = unprotect_at(&[0u8; MIN_ENVELOPE_LEN - 1], &test_key(0), NOW);
        assert_eq!(result, Err(EnvelopeError::Malformed { len: 23, min: 24 }));
    }

    #[test]
    fn short_input_is_malformed_even_with_bad_key() {
        let result = unprotect_at(&[0u8; 4], &[0u8; 3], NOW);
        assert!(matches!(result, Err(EnvelopeError::Malformed { .. })));
    }

    #[test]
    fn invalid_key_length_is_rejected() {
        assert_eq!(
            protect_at(b"x", &[0u8; 32], NOW),
            Err(EnvelopeError::InvalidKey { expected: 64, actual: 32 })
        );
        assert_eq!(
            unprotect_at(&[0u8; 40], &[0u8; 65], NOW),
            Err(EnvelopeError::InvalidKey { expected: 64, actual: 65 })
        );
    }

    #[test]
    fn system_clock_roundtrip() {
        let key = test_key(10);
        let envelope = protect(b"now", &key).unwrap();

        assert_eq!(unprotect(&envelope, &key).unwrap(), b"now");
    }
}
