//! Error types for the Keyfleet client core.
//!
//! [`KeyStoreError`] covers everything the key store and command processor
//! can report, wrapping envelope and command errors from the lower layers.
//! [`ClientError`] is what the Sans-IO client driver returns for
//! caller-initiated events.

use keyfleet_crypto::{EnvelopeError, FINGERPRINT_LEN, Fingerprint};
use keyfleet_proto::CommandError;
use thiserror::Error;

/// Errors from key store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyStoreError {
    /// No key registered for the topic's fingerprint
    #[error("no key for topic fingerprint {fingerprint}")]
    TopicKeyNotFound {
        /// Fingerprint that was looked up
        fingerprint: Fingerprint,
    },

    /// Fingerprint passed as raw bytes is not 32 bytes long
    #[error("invalid fingerprint length: expected {expected}, got {actual}")]
    InvalidFingerprint {
        /// Required fingerprint length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Envelope could not be protected or unprotected
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Control command was rejected; the store is unchanged
    #[error("command rejected: {0}")]
    Command(#[from] CommandError),

    /// Snapshot location could not be read or written
    #[error("storage unavailable at {location}: {reason}")]
    StorageUnavailable {
        /// Snapshot location
        location: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// Snapshot was read but does not decode to a valid key store
    #[error("corrupt snapshot: {reason}")]
    Corrupt {
        /// What was wrong with it
        reason: String,
    },
}

impl KeyStoreError {
    /// Build an `InvalidFingerprint` for a slice of the given length.
    pub(crate) fn invalid_fingerprint(actual: usize) -> Self {
        Self::InvalidFingerprint { expected: FINGERPRINT_LEN, actual }
    }

    /// Returns true if this error came from a rejected control command.
    ///
    /// Rejected commands are dropped without touching the store and must be
    /// reported, not retried.
    pub fn is_command_rejection(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    /// Returns true if this error concerns persistence rather than protocol
    /// processing.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. } | Self::Corrupt { .. })
    }
}

/// Errors returned by [`crate::Client::handle`].
///
/// Inbound messages never produce a `ClientError`; their failures become
/// rejection actions. Only local requests (publishing) can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Publishing failed in the key store
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// Application tried to publish on the private control channel
    #[error("cannot publish on control topic {topic}")]
    ControlTopicPublish {
        /// The control topic name
        topic: String,
    },
}

#[cfg(test)]
mod tests {
    use keyfleet_proto::Opcode;

    use super::*;

    #[test]
    fn command_errors_are_rejections() {
        let err = KeyStoreError::from(CommandError::EmptyCommand);
        assert!(err.is_command_rejection());
        assert!(!err.is_storage());
    }

    #[test]
    fn storage_errors_are_classified() {
        let err = KeyStoreError::Corrupt { reason: "bad cbor".to_string() };
        assert!(err.is_storage());
        assert!(!err.is_command_rejection());
    }

    #[test]
    fn envelope_errors_display_transparently() {
        let err = KeyStoreError::from(EnvelopeError::AuthenticationFailed);
        assert_eq!(err.to_string(), "envelope authentication failed");
    }

    #[test]
    fn command_error_display() {
        let err = KeyStoreError::from(CommandError::InvalidCommandLength {
            opcode: Opcode::RemoveTopic,
            expected: 33,
            actual: 34,
        });
        assert_eq!(
            err.to_string(),
            "command rejected: invalid length for RemoveTopic: expected 33 bytes, got 34"
        );
    }
}
