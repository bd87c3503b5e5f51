//! Error types for envelope operations

use thiserror::Error;

/// Errors from protecting or unprotecting an envelope.
///
/// None of these are retriable: the same input always produces the same
/// error (modulo the clock for the freshness variants).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Key material is not 64 bytes
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKey {
        /// Required key length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Input cannot hold a timestamp plus the synthetic IV
    #[error("malformed envelope: {len} bytes, need at least {min}")]
    Malformed {
        /// Length of the rejected input
        len: usize,
        /// Minimum envelope length
        min: usize,
    },

    /// Envelope timestamp is ahead of the local clock
    #[error("envelope timestamp {timestamp} is in the future (now {now})")]
    FutureTimestamp {
        /// Timestamp carried by the envelope
        timestamp: u64,
        /// Local clock when the check ran
        now: u64,
    },

    /// Envelope is older than the replay window
    #[error("envelope timestamp {timestamp} is stale (now {now})")]
    StaleTimestamp {
        /// Timestamp carried by the envelope
        timestamp: u64,
        /// Local clock when the check ran
        now: u64,
    },

    /// Tag verification failed (tampered, truncated or wrong key)
    #[error("envelope authentication failed")]
    AuthenticationFailed,
}

impl EnvelopeError {
    /// Returns true for the two timestamp window failures.
    ///
    /// They are reported separately for observability but callers must treat
    /// them like any other rejection.
    pub fn is_freshness_failure(&self) -> bool {
        matches!(self, Self::FutureTimestamp { .. } | Self::StaleTimestamp { .. })
    }
}
