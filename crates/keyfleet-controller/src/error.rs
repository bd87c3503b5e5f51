//! Controller errors.

use keyfleet_crypto::{ClientId, EnvelopeError};
use thiserror::Error;

/// Errors from command issuance and registry management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// Client id is not registered
    #[error("unknown client {id}")]
    UnknownClient {
        /// Requested client
        id: ClientId,
    },

    /// Client id is already registered
    #[error("client {id} already registered")]
    DuplicateClient {
        /// Conflicting client
        id: ClientId,
    },

    /// Topic was never created on this controller
    #[error("unknown topic {topic:?}")]
    UnknownTopic {
        /// Requested topic name
        topic: String,
    },

    /// Topic already exists
    #[error("topic {topic:?} already exists")]
    DuplicateTopic {
        /// Conflicting topic name
        topic: String,
    },

    /// Command could not be protected
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl ControllerError {
    /// Returns true if the request named something the registry does not
    /// know.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownClient { .. } | Self::UnknownTopic { .. })
    }
}
