//! Fuzz target for envelope unprotection
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary envelopes under a fixed key
//! - Tampered: a valid envelope with one flipped bit
//! - Clock skew: a valid envelope checked at an arbitrary offset
//!
//! # Invariants
//!
//! - Unprotect NEVER panics
//! - Inputs shorter than 24 bytes are always `Malformed`
//! - Any flipped bit is rejected
//! - A valid envelope is accepted iff `0 <= now - ts <= 600`

#![no_main]

use arbitrary::Arbitrary;
use keyfleet_crypto::{
    EnvelopeError, KEY_LEN, MAX_TIMESTAMP_DELAY_SECS, MIN_ENVELOPE_LEN, protect_at, unprotect_at,
};
use libfuzzer_sys::fuzz_target;

const NOW: u64 = 1_700_000_000;

#[derive(Debug, Clone, Arbitrary)]
enum EnvelopeInput {
    RawBytes { key_byte: u8, bytes: Vec<u8> },
    Tampered { key_byte: u8, plaintext: Vec<u8>, flip_at: u16, bit: u8 },
    ClockSkew { key_byte: u8, plaintext: Vec<u8>, offset: i16 },
}

fuzz_target!(|input: EnvelopeInput| {
    match input {
        EnvelopeInput::RawBytes { key_byte, bytes } => {
            let result = unprotect_at(&bytes, &[key_byte; KEY_LEN], NOW);
            if bytes.len() < MIN_ENVELOPE_LEN {
                assert!(matches!(result, Err(EnvelopeError::Malformed { .. })));
            }
        },
        EnvelopeInput::Tampered { key_byte, plaintext, flip_at, bit } => {
            let key = [key_byte; KEY_LEN];
            let Ok(mut envelope) = protect_at(&plaintext, &key, NOW) else {
                unreachable!("64-byte key always protects");
            };

            let index = usize::from(flip_at) % envelope.len();
            envelope[index] ^= 1 << (bit % 8);

            assert!(unprotect_at(&envelope, &key, NOW).is_err(), "tampered envelope accepted");
        },
        EnvelopeInput::ClockSkew { key_byte, plaintext, offset } => {
            let key = [key_byte; KEY_LEN];
            let Ok(envelope) = protect_at(&plaintext, &key, NOW) else {
                unreachable!("64-byte key always protects");
            };

            let now = NOW.saturating_add_signed(i64::from(offset));
            let result = unprotect_at(&envelope, &key, now);
            let fresh = now >= NOW && now - NOW <= MAX_TIMESTAMP_DELAY_SECS;

            assert_eq!(result.is_ok(), fresh, "freshness mismatch at offset {offset}");
            if let Ok(decrypted) = result {
                assert_eq!(decrypted, plaintext);
            }
        },
    }
});
