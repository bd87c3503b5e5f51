//! Client events and actions.

use keyfleet_proto::Opcode;

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Subscribing to the topics returned by `Client::subscriptions`
/// - Forwarding every message received on those topics
/// - Forwarding application intents (publish on a topic)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Protected bytes arrived on a topic.
    MessageReceived {
        /// Topic the message arrived on.
        topic: String,
        /// Protected bytes as received.
        payload: Vec<u8>,
    },

    /// Application wants to publish on a topic.
    Publish {
        /// Target topic.
        topic: String,
        /// Message plaintext.
        plaintext: Vec<u8>,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Send protected bytes on a topic.
    Publish {
        /// Target topic.
        topic: String,
        /// Protected bytes to send.
        payload: Vec<u8>,
    },

    /// Deliver an unprotected message to the application layer.
    Deliver {
        /// Topic the message arrived on.
        topic: String,
        /// Unprotected plaintext.
        plaintext: Vec<u8>,
    },

    /// A control command was applied to the key store.
    CommandApplied {
        /// Opcode of the applied command.
        opcode: Opcode,
    },

    /// Persist the key store.
    ///
    /// Emitted after every applied command. The caller decides when to
    /// actually call `save`.
    Persist,

    /// A control message was rejected. The key store is unchanged.
    CommandRejected {
        /// Human-readable reason.
        reason: String,
    },

    /// A topic message could not be unprotected and was dropped.
    MessageRejected {
        /// Topic the message arrived on.
        topic: String,
        /// Human-readable reason.
        reason: String,
    },
}
