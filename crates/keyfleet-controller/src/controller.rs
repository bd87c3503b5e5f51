//! Command issuance.
//!
//! The controller is the only party that knows every client's root key. It
//! keeps a registry of clients and topics, builds command plaintexts,
//! protects them under the target client's current root key and hands back
//! the bytes to publish on that client's control topic. Delivery is the
//! caller's job.
//!
//! The registry tracks which topics each client has been issued, assuming
//! every issued command is delivered. A command lost in transit leaves the
//! registry ahead of the client; reissuing is idempotent for every opcode
//! except `SetIdKey`.

use std::collections::{BTreeSet, HashMap};

use keyfleet_core::Environment;
use keyfleet_crypto::{ClientId, Fingerprint, ID_LEN, KEY_LEN, SymmetricKey, protect_at};
use keyfleet_proto::{Command, DEFAULT_CONTROL_PREFIX, Opcode, control_topic};

use crate::{
    error::ControllerError,
    event::ControllerEvent,
    hub::{EventHub, HubConfig, Subscription},
};

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Control topic prefix; must match the clients' configuration.
    pub control_prefix: String,

    /// Event hub settings.
    pub hub: HubConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { control_prefix: DEFAULT_CONTROL_PREFIX.to_string(), hub: HubConfig::default() }
    }
}

/// What the controller knows about one client.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// Client identity.
    pub id: ClientId,
    /// Root key the client currently holds.
    pub root_key: SymmetricKey,
    /// Topics whose keys were issued to the client.
    pub topics: BTreeSet<String>,
}

/// A protected command ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    /// Control topic of the target client.
    pub topic: String,
    /// Protected command bytes.
    pub payload: Vec<u8>,
    /// Command kind.
    pub opcode: Opcode,
}

/// Protect `command` under `root_key`, stamped with `now`.
///
/// The building block for every issuer; usable without a registry.
pub fn issue_command(
    command: &Command,
    root_key: &SymmetricKey,
    now: u64,
) -> Result<Vec<u8>, ControllerError> {
    Ok(protect_at(&command.encode(), root_key.as_bytes(), now)?)
}

/// Key-distribution controller.
pub struct Controller<E: Environment> {
    env: E,
    control_prefix: String,
    clients: HashMap<ClientId, ClientRecord>,
    topics: HashMap<String, SymmetricKey>,
    events: EventHub<ControllerEvent>,
}

impl<E: Environment> Controller<E> {
    /// Create an empty controller.
    pub fn new(env: E, config: ControllerConfig) -> Self {
        Self {
            env,
            control_prefix: config.control_prefix,
            clients: HashMap::new(),
            topics: HashMap::new(),
            events: EventHub::new(config.hub),
        }
    }

    /// Subscribe to controller events.
    pub fn subscribe(&self) -> Subscription<ControllerEvent> {
        self.events.subscribe()
    }

    /// Register a client. A missing root key is generated.
    ///
    /// Returns the root key to provision on the client out of band.
    pub fn register_client(
        &mut self,
        id: ClientId,
        root_key: Option<SymmetricKey>,
    ) -> Result<SymmetricKey, ControllerError> {
        if self.clients.contains_key(&id) {
            return Err(ControllerError::DuplicateClient { id });
        }

        let root_key =
            root_key.unwrap_or_else(|| SymmetricKey::from_bytes(self.env.random_array::<KEY_LEN>()));
        self.clients
            .insert(id, ClientRecord { id, root_key: root_key.clone(), topics: BTreeSet::new() });

        tracing::info!(%id, "registered client");
        self.events.publish(&ControllerEvent::ClientRegistered { id });
        Ok(root_key)
    }

    /// Register a client whose id is derived from `alias`.
    pub fn register_alias(
        &mut self,
        alias: &str,
        root_key: Option<SymmetricKey>,
    ) -> Result<(ClientId, SymmetricKey), ControllerError> {
        let id = ClientId::from_alias(alias);
        let root_key = self.register_client(id, root_key)?;
        Ok((id, root_key))
    }

    /// Register a client with a random id and root key.
    pub fn register_random(&mut self) -> Result<(ClientId, SymmetricKey), ControllerError> {
        let id = ClientId::from_bytes(self.env.random_array::<ID_LEN>());
        let root_key = self.register_client(id, None)?;
        Ok((id, root_key))
    }

    /// Registry entry for `id`. `None` if unknown.
    pub fn client(&self, id: &ClientId) -> Option<&ClientRecord> {
        self.clients.get(id)
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Control topic for `id`.
    pub fn control_topic(&self, id: &ClientId) -> String {
        control_topic(&self.control_prefix, id)
    }

    /// Generate a random key for a new topic.
    pub fn new_topic(&mut self, topic: &str) -> Result<Fingerprint, ControllerError> {
        if self.topics.contains_key(topic) {
            return Err(ControllerError::DuplicateTopic { topic: topic.to_string() });
        }

        let key = SymmetricKey::from_bytes(self.env.random_array::<KEY_LEN>());
        let fingerprint = Fingerprint::of(topic);
        self.topics.insert(topic.to_string(), key);

        tracing::info!(%topic, %fingerprint, "created topic");
        self.events
            .publish(&ControllerEvent::TopicCreated { topic: topic.to_string(), fingerprint });
        Ok(fingerprint)
    }

    /// Current key for `topic`. `None` if the topic was never created.
    pub fn topic_key(&self, topic: &str) -> Option<&SymmetricKey> {
        self.topics.get(topic)
    }

    /// Issue `SetTopicKey` for `topic` to `client`.
    pub fn set_topic_key(
        &mut self,
        client: &ClientId,
        topic: &str,
    ) -> Result<Issued, ControllerError> {
        let key = self
            .topics
            .get(topic)
            .ok_or_else(|| ControllerError::UnknownTopic { topic: topic.to_string() })?
            .clone();

        let issued = self.issue(
            client,
            &Command::SetTopicKey { fingerprint: Fingerprint::of(topic), key },
        )?;
        self.record_mut(client)?.topics.insert(topic.to_string());
        Ok(issued)
    }

    /// Issue `RemoveTopic` for `topic` to `client`.
    ///
    /// The topic does not have to exist on this controller: removing a
    /// fingerprint the client does not hold is harmless.
    pub fn remove_topic(
        &mut self,
        client: &ClientId,
        topic: &str,
    ) -> Result<Issued, ControllerError> {
        let issued = self.issue(client, &Command::RemoveTopic(Fingerprint::of(topic)))?;
        self.record_mut(client)?.topics.remove(topic);
        Ok(issued)
    }

    /// Issue `ResetTopics` to `client`.
    pub fn reset_topics(&mut self, client: &ClientId) -> Result<Issued, ControllerError> {
        let issued = self.issue(client, &Command::ResetTopics)?;
        self.record_mut(client)?.topics.clear();
        Ok(issued)
    }

    /// Issue `SetIdKey` with a fresh random root key to `client`.
    ///
    /// The command is protected under the old key, then the registry
    /// switches to the new one.
    pub fn rotate_root_key(&mut self, client: &ClientId) -> Result<Issued, ControllerError> {
        let new_key = SymmetricKey::from_bytes(self.env.random_array::<KEY_LEN>());
        let issued = self.issue(client, &Command::SetIdKey(new_key.clone()))?;
        self.record_mut(client)?.root_key = new_key;
        Ok(issued)
    }

    fn issue(&self, client: &ClientId, command: &Command) -> Result<Issued, ControllerError> {
        let record = self.record(client)?;
        let opcode = command.opcode();
        let payload = issue_command(command, &record.root_key, self.env.wall_clock_secs())?;
        let topic = self.control_topic(client);

        tracing::debug!(client = %client, %opcode, "issued command");
        self.events.publish(&ControllerEvent::CommandIssued {
            client: *client,
            opcode,
            control_topic: topic.clone(),
        });

        Ok(Issued { topic, payload, opcode })
    }

    fn record(&self, id: &ClientId) -> Result<&ClientRecord, ControllerError> {
        self.clients.get(id).ok_or(ControllerError::UnknownClient { id: *id })
    }

    fn record_mut(&mut self, id: &ClientId) -> Result<&mut ClientRecord, ControllerError> {
        self.clients.get_mut(id).ok_or(ControllerError::UnknownClient { id: *id })
    }
}
