//! Events broadcast by the controller.

use keyfleet_crypto::{ClientId, Fingerprint};
use keyfleet_proto::Opcode;

/// Something the controller did. Published on its [`EventHub`](crate::EventHub).
///
/// Events never carry key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A client was added to the registry.
    ClientRegistered {
        /// The new client.
        id: ClientId,
    },

    /// A topic key was generated.
    TopicCreated {
        /// Topic name.
        topic: String,
        /// Fingerprint clients store the key under.
        fingerprint: Fingerprint,
    },

    /// A protected command is ready for delivery.
    CommandIssued {
        /// Target client.
        client: ClientId,
        /// Command kind.
        opcode: Opcode,
        /// Control topic the payload must be published on.
        control_topic: String,
    },
}
