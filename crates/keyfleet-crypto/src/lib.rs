//! Keyfleet Cryptographic Primitives
//!
//! Cryptographic building blocks for Keyfleet. Everything in this crate is a
//! pure function of its inputs: the envelope functions take the current time
//! as a parameter (`*_at` variants) so freshness behaviour can be tested
//! deterministically. The plain variants read the system clock.
//!
//! # Key Hierarchy
//!
//! ```text
//! Client alias ──SHA3-256──▶ ClientId (32 bytes)
//!
//! Root key (64 bytes) ──AES-SIV──▶ control channel envelopes (commands)
//!
//! Topic name ──SHA3-256──▶ Fingerprint ──lookup──▶ Topic key (64 bytes)
//!                                                     │
//!                                                     ▼
//!                                          AES-SIV ──▶ data envelopes
//! ```
//!
//! Keys are pre-shared. Root keys are rotated in-band by a controller, topic
//! keys are installed, removed and reset in-band through commands protected
//! under the root key.
//!
//! # Envelope
//!
//! ```text
//! ┌──────────────────┬──────────────────┬────────────────────────┐
//! │ timestamp (8 LE) │ synthetic IV (16)│ ciphertext (len(pt))   │
//! └──────────────────┴──────────────────┴────────────────────────┘
//! ```
//!
//! # Security
//!
//! Misuse resistance:
//! - AES-SIV is deterministic, no nonce state is kept between calls
//! - The timestamp is the associated data, so it cannot be swapped without
//!   breaking the tag
//!
//! Freshness:
//! - Envelopes older than [`MAX_TIMESTAMP_DELAY_SECS`] are rejected
//! - Envelopes from the future are rejected
//! - Replays inside the window are accepted (window, not counter)
//!
//! Authenticity:
//! - Any tampering, truncation or wrong key yields
//!   [`EnvelopeError::AuthenticationFailed`] without further detail

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod error;
mod fingerprint;
mod keys;

pub use envelope::{
    MAX_TIMESTAMP_DELAY_SECS, MIN_ENVELOPE_LEN, TAG_LEN, TIMESTAMP_LEN, protect, protect_at,
    unix_now, unprotect, unprotect_at,
};
pub use error::EnvelopeError;
pub use fingerprint::{FINGERPRINT_LEN, Fingerprint, fingerprint};
pub use keys::{ClientId, ID_LEN, KEY_LEN, SymmetricKey};
