//! Property-based tests for the envelope
//!
//! These tests verify the envelope contract for ALL keys and payloads, not
//! just specific examples: round-trip inside the window, bit-flip detection,
//! the exact freshness boundaries and short-input rejection.

use keyfleet_crypto::{
    EnvelopeError, KEY_LEN, MAX_TIMESTAMP_DELAY_SECS, MIN_ENVELOPE_LEN, TIMESTAMP_LEN, protect_at,
    unprotect_at,
};
use proptest::prelude::*;

/// Strategy for generating arbitrary 64-byte keys
fn arbitrary_key() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), KEY_LEN)
}

/// Timestamps far enough from both ends of `u64` to do window arithmetic
fn arbitrary_now() -> impl Strategy<Value = u64> {
    1_000u64..4_000_000_000u64
}

#[test]
fn prop_roundtrip_within_window() {
    proptest!(|(
        key in arbitrary_key(),
        payload in prop::collection::vec(any::<u8>(), 0..1024),
        now in arbitrary_now(),
        age in 0..=MAX_TIMESTAMP_DELAY_SECS,
    )| {
        let envelope = protect_at(&payload, &key, now).expect("protect should succeed");

        // PROPERTY: Any age inside the window decrypts to the original payload
        let decrypted = unprotect_at(&envelope, &key, now + age).expect("unprotect should succeed");
        prop_assert_eq!(decrypted, payload);
    });
}

#[test]
fn prop_single_bit_flip_fails_authentication() {
    proptest!(|(
        key in arbitrary_key(),
        payload in prop::collection::vec(any::<u8>(), 0..256),
        now in arbitrary_now(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    )| {
        let mut envelope = protect_at(&payload, &key, now).expect("protect should succeed");

        // Flip one bit in the ciphertext portion (after the timestamp)
        let ciphertext_len = envelope.len() - TIMESTAMP_LEN;
        let index = TIMESTAMP_LEN + position.index(ciphertext_len);
        envelope[index] ^= 1 << bit;

        // PROPERTY: Tampering is detected, never returns altered plaintext
        prop_assert_eq!(
            unprotect_at(&envelope, &key, now),
            Err(EnvelopeError::AuthenticationFailed)
        );
    });
}

#[test]
fn prop_freshness_boundaries() {
    proptest!(|(key in arbitrary_key(), now in arbitrary_now())| {
        let fresh = protect_at(b"x", &key, now).expect("protect should succeed");
        prop_assert!(unprotect_at(&fresh, &key, now).is_ok());

        let future = protect_at(b"x", &key, now + 1).expect("protect should succeed");
        let is_future = matches!(
            unprotect_at(&future, &key, now),
            Err(EnvelopeError::FutureTimestamp { .. })
        );
        prop_assert!(is_future);

        let edge = protect_at(b"x", &key, now - MAX_TIMESTAMP_DELAY_SECS)
            .expect("protect should succeed");
        prop_assert!(unprotect_at(&edge, &key, now).is_ok());

        let stale = protect_at(b"x", &key, now - MAX_TIMESTAMP_DELAY_SECS - 1)
            .expect("protect should succeed");
        let is_stale = matches!(
            unprotect_at(&stale, &key, now),
            Err(EnvelopeError::StaleTimestamp { .. })
        );
        prop_assert!(is_stale);
    });
}

#[test]
fn prop_short_input_is_malformed() {
    proptest!(|(
        input in prop::collection::vec(any::<u8>(), 0..MIN_ENVELOPE_LEN),
        key in prop::collection::vec(any::<u8>(), 0..96),
        now in any::<u64>(),
    )| {
        // PROPERTY: Length is checked before anything else, whatever the key
        let is_malformed =
            matches!(unprotect_at(&input, &key, now), Err(EnvelopeError::Malformed { .. }));
        prop_assert!(is_malformed);
    });
}

#[test]
fn prop_ciphertext_overhead_is_constant() {
    proptest!(|(
        key in arbitrary_key(),
        payload in prop::collection::vec(any::<u8>(), 0..512),
        now in any::<u64>(),
    )| {
        let envelope = protect_at(&payload, &key, now).expect("protect should succeed");
        prop_assert_eq!(envelope.len(), payload.len() + MIN_ENVELOPE_LEN);
    });
}
