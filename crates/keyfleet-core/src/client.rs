//! Client state machine.
//!
//! The `Client` is a Sans-IO driver around a [`SharedKeyStore`]. It routes
//! inbound messages either to the command processor (control topic) or to
//! topic-key unprotection (everything else), and protects outbound messages.
//! It never touches the network or the filesystem: it returns
//! [`ClientAction`]s for the caller to execute.

use keyfleet_crypto::ClientId;
use keyfleet_proto::{DEFAULT_CONTROL_PREFIX, control_topic};

use crate::{
    env::Environment,
    error::ClientError,
    event::{ClientAction, ClientEvent},
    shared::SharedKeyStore,
};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix of the control topic; the hex client id is appended.
    pub control_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { control_prefix: DEFAULT_CONTROL_PREFIX.to_string() }
    }
}

/// Key-distribution client.
pub struct Client<E: Environment> {
    /// Clock source for envelope stamping and freshness checks.
    env: E,

    /// Key store shared with the caller.
    store: SharedKeyStore,

    /// Control topic, fixed because the client id never changes.
    control_topic: String,
}

impl<E: Environment> Client<E> {
    /// Create a client over `store`.
    pub fn new(env: E, store: SharedKeyStore, config: &ClientConfig) -> Self {
        let control_topic = control_topic(&config.control_prefix, &store.id());
        tracing::info!(id = %store.id(), %control_topic, "client started");

        Self { env, store, control_topic }
    }

    /// Client identity.
    pub fn id(&self) -> ClientId {
        self.store.id()
    }

    /// Topic this client receives commands on.
    pub fn control_topic(&self) -> &str {
        &self.control_topic
    }

    /// Topics the caller must subscribe to.
    ///
    /// Only the control topic: data topic names cannot be recovered from the
    /// stored fingerprints, so the application subscribes to those itself.
    pub fn subscriptions(&self) -> Vec<String> {
        vec![self.control_topic.clone()]
    }

    /// Handle to the underlying key store.
    pub fn store(&self) -> &SharedKeyStore {
        &self.store
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Inbound messages never fail; their problems become
    /// [`ClientAction::CommandRejected`] or [`ClientAction::MessageRejected`].
    /// Publishing fails with:
    ///
    /// - `ControlTopicPublish`: the target is the control topic
    /// - `KeyStore(TopicKeyNotFound)`: no key for the topic
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::MessageReceived { topic, payload } => {
                if topic == self.control_topic {
                    Ok(self.handle_control_message(&payload))
                } else {
                    Ok(self.handle_topic_message(topic, &payload))
                }
            },
            ClientEvent::Publish { topic, plaintext } => self.handle_publish(topic, &plaintext),
        }
    }

    fn handle_control_message(&self, payload: &[u8]) -> Vec<ClientAction> {
        let now = self.env.wall_clock_secs();

        match self.store.apply_control_message_at(payload, now) {
            Ok(opcode) => {
                tracing::debug!(%opcode, "applied control command");
                vec![ClientAction::CommandApplied { opcode }, ClientAction::Persist]
            },
            Err(e) => {
                tracing::warn!(error = %e, len = payload.len(), "rejected control message");
                vec![ClientAction::CommandRejected { reason: e.to_string() }]
            },
        }
    }

    fn handle_topic_message(&self, topic: String, payload: &[u8]) -> Vec<ClientAction> {
        let now = self.env.wall_clock_secs();

        match self.store.unprotect_for_topic_at(&topic, payload, now) {
            Ok(plaintext) => vec![ClientAction::Deliver { topic, plaintext }],
            Err(e) => {
                tracing::warn!(%topic, error = %e, "rejected topic message");
                vec![ClientAction::MessageRejected { topic, reason: e.to_string() }]
            },
        }
    }

    fn handle_publish(
        &self,
        topic: String,
        plaintext: &[u8],
    ) -> Result<Vec<ClientAction>, ClientError> {
        if topic == self.control_topic {
            return Err(ClientError::ControlTopicPublish { topic });
        }

        let payload =
            self.store.protect_for_topic_at(&topic, plaintext, self.env.wall_clock_secs())?;
        Ok(vec![ClientAction::Publish { topic, payload }])
    }
}
