//! Client key store.
//!
//! Holds the client's identity, its root key and one key per topic
//! fingerprint. All mutation goes through four operations that mirror the
//! control commands. The store never persists by itself: callers decide when
//! a mutation is committed and call [`KeyStore::save`].

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use keyfleet_crypto::{
    ClientId, FINGERPRINT_LEN, Fingerprint, ID_LEN, KEY_LEN, SymmetricKey, protect_at, unix_now,
    unprotect_at,
};
use keyfleet_proto::{Opcode, control_topic};

use crate::{
    env::Environment,
    error::KeyStoreError,
    processor::CommandProcessor,
    snapshot::{self, KeyStoreSnapshot, SNAPSHOT_VERSION, TopicKeyEntry},
};

/// A client's security state.
///
/// # Invariants
///
/// - `id` never changes after construction
/// - Every map key is a 32-byte fingerprint and every value a 64-byte key
///   (enforced by the types)
/// - An empty topic map is valid (fresh client)
pub struct KeyStore {
    /// Client identity.
    id: ClientId,

    /// Key protecting the control channel.
    root_key: SymmetricKey,

    /// Topic fingerprint -> topic key.
    topic_keys: HashMap<Fingerprint, SymmetricKey>,

    /// Where snapshots are saved.
    location: PathBuf,
}

impl KeyStore {
    /// Create a fresh store.
    ///
    /// A missing `id` is replaced by 32 random bytes and a missing
    /// `root_key` by 64 random bytes drawn from `env`. Nothing is written
    /// to `location` until [`save`](Self::save) is called.
    pub fn create<E: Environment>(
        env: &E,
        id: Option<ClientId>,
        root_key: Option<SymmetricKey>,
        location: impl Into<PathBuf>,
    ) -> Self {
        let id = id.unwrap_or_else(|| ClientId::from_bytes(env.random_array::<ID_LEN>()));
        let root_key =
            root_key.unwrap_or_else(|| SymmetricKey::from_bytes(env.random_array::<KEY_LEN>()));

        Self { id, root_key, topic_keys: HashMap::new(), location: location.into() }
    }

    /// Create a fresh store whose id is the fingerprint of `alias`.
    pub fn from_alias<E: Environment>(
        env: &E,
        alias: &str,
        root_key: Option<SymmetricKey>,
        location: impl Into<PathBuf>,
    ) -> Self {
        Self::create(env, Some(ClientId::from_alias(alias)), root_key, location)
    }

    /// Load the snapshot stored at `location`.
    ///
    /// The returned store saves back to `location`, whatever location was
    /// recorded inside the snapshot.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the snapshot cannot be read
    /// - `Corrupt`: it does not decode or has wrong field lengths
    pub fn load(location: impl Into<PathBuf>) -> Result<Self, KeyStoreError> {
        let location = location.into();
        let snapshot = snapshot::read_snapshot(&location)?;
        let store = Self::from_snapshot(&snapshot, location)?;

        tracing::debug!(
            id = %store.id,
            topics = store.topic_keys.len(),
            location = %store.location.display(),
            "loaded key store"
        );

        Ok(store)
    }

    /// Save the whole store to its location, replacing the previous snapshot.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable`: the snapshot cannot be written
    pub fn save(&self) -> Result<(), KeyStoreError> {
        snapshot::write_snapshot(&self.location, &self.snapshot())?;

        tracing::debug!(
            id = %self.id,
            topics = self.topic_keys.len(),
            location = %self.location.display(),
            "saved key store"
        );

        Ok(())
    }

    /// Serializable copy of the whole store.
    pub fn snapshot(&self) -> KeyStoreSnapshot {
        let mut topic_keys: Vec<TopicKeyEntry> = self
            .topic_keys
            .iter()
            .map(|(fingerprint, key)| TopicKeyEntry {
                fingerprint: fingerprint.as_bytes().to_vec(),
                key: key.as_bytes().to_vec(),
            })
            .collect();
        topic_keys.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));

        KeyStoreSnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id.as_bytes().to_vec(),
            root_key: self.root_key.as_bytes().to_vec(),
            topic_keys,
            location: self.location.display().to_string(),
        }
    }

    /// Rebuild a store from a snapshot, saving to `location`.
    ///
    /// # Errors
    ///
    /// - `Corrupt`: any field has the wrong length, or a fingerprint repeats
    pub fn from_snapshot(
        snapshot: &KeyStoreSnapshot,
        location: impl Into<PathBuf>,
    ) -> Result<Self, KeyStoreError> {
        let corrupt = |field: &str, expected: usize, actual: usize| KeyStoreError::Corrupt {
            reason: format!("{field} is {actual} bytes, expected {expected}"),
        };

        let id = ClientId::from_slice(&snapshot.id)
            .ok_or_else(|| corrupt("id", ID_LEN, snapshot.id.len()))?;
        let root_key = SymmetricKey::from_slice(&snapshot.root_key)
            .ok_or_else(|| corrupt("root key", KEY_LEN, snapshot.root_key.len()))?;

        let mut topic_keys = HashMap::with_capacity(snapshot.topic_keys.len());
        for entry in &snapshot.topic_keys {
            let fingerprint = Fingerprint::from_slice(&entry.fingerprint)
                .ok_or_else(|| corrupt("fingerprint", FINGERPRINT_LEN, entry.fingerprint.len()))?;
            let key = SymmetricKey::from_slice(&entry.key)
                .ok_or_else(|| corrupt("topic key", KEY_LEN, entry.key.len()))?;

            if topic_keys.insert(fingerprint, key).is_some() {
                return Err(KeyStoreError::Corrupt {
                    reason: format!("duplicate topic fingerprint {fingerprint}"),
                });
            }
        }

        Ok(Self { id, root_key, topic_keys, location: location.into() })
    }

    /// Client identity.
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Current root key.
    pub fn root_key(&self) -> &SymmetricKey {
        &self.root_key
    }

    /// Snapshot location.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Number of stored topic keys.
    pub fn topic_count(&self) -> usize {
        self.topic_keys.len()
    }

    /// Key stored under `fingerprint`. `None` if absent.
    pub fn topic_key(&self, fingerprint: &Fingerprint) -> Option<&SymmetricKey> {
        self.topic_keys.get(fingerprint)
    }

    /// Check if a key is stored for the topic name.
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topic_keys.contains_key(&Fingerprint::of(topic))
    }

    /// Stored fingerprints, in no particular order.
    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        self.topic_keys.keys()
    }

    /// Name of this client's control topic.
    pub fn control_topic(&self, prefix: &str) -> String {
        control_topic(prefix, &self.id)
    }

    /// Remove the key for `fingerprint`. Returns whether a key was present.
    ///
    /// Absence is not an error.
    pub fn remove_topic(&mut self, fingerprint: &Fingerprint) -> bool {
        self.topic_keys.remove(fingerprint).is_some()
    }

    /// Remove the key for a fingerprint given as raw bytes.
    ///
    /// # Errors
    ///
    /// - `InvalidFingerprint`: `fingerprint` is not 32 bytes
    pub fn remove_topic_bytes(&mut self, fingerprint: &[u8]) -> Result<bool, KeyStoreError> {
        let fingerprint = Fingerprint::from_slice(fingerprint)
            .ok_or_else(|| KeyStoreError::invalid_fingerprint(fingerprint.len()))?;
        Ok(self.remove_topic(&fingerprint))
    }

    /// Remove every topic key.
    pub fn reset_topics(&mut self) {
        self.topic_keys.clear();
    }

    /// Replace the root key.
    ///
    /// Control envelopes protected under the old key stop verifying.
    pub fn set_root_key(&mut self, key: SymmetricKey) {
        self.root_key = key;
    }

    /// Store `key` under `fingerprint`, replacing any previous key.
    pub fn set_topic_key(&mut self, fingerprint: Fingerprint, key: SymmetricKey) {
        self.topic_keys.insert(fingerprint, key);
    }

    /// Protect `payload` for `topic`, stamped with the system clock.
    pub fn protect_for_topic(&self, topic: &str, payload: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
        self.protect_for_topic_at(topic, payload, unix_now())
    }

    /// Protect `payload` for `topic`, stamped with `now`.
    ///
    /// # Errors
    ///
    /// - `TopicKeyNotFound`: no key for `fingerprint(topic)`
    pub fn protect_for_topic_at(
        &self,
        topic: &str,
        payload: &[u8],
        now: u64,
    ) -> Result<Vec<u8>, KeyStoreError> {
        let key = self.lookup(topic)?;
        Ok(protect_at(payload, key.as_bytes(), now)?)
    }

    /// Unprotect bytes received on `topic`, checked against the system clock.
    pub fn unprotect_for_topic(
        &self,
        topic: &str,
        protected: &[u8],
    ) -> Result<Vec<u8>, KeyStoreError> {
        self.unprotect_for_topic_at(topic, protected, unix_now())
    }

    /// Unprotect bytes received on `topic`, checked against `now`.
    ///
    /// # Errors
    ///
    /// - `TopicKeyNotFound`: no key for `fingerprint(topic)`
    /// - `Envelope`: any envelope failure, see
    ///   [`unprotect_at`](keyfleet_crypto::unprotect_at)
    pub fn unprotect_for_topic_at(
        &self,
        topic: &str,
        protected: &[u8],
        now: u64,
    ) -> Result<Vec<u8>, KeyStoreError> {
        let key = self.lookup(topic)?;
        Ok(unprotect_at(protected, key.as_bytes(), now)?)
    }

    /// Protect a payload under the root key, stamped with `now`.
    ///
    /// This is what a controller does with a command plaintext; it is exposed
    /// here so a client can answer on its own control channel.
    pub fn protect_control_at(&self, payload: &[u8], now: u64) -> Result<Vec<u8>, KeyStoreError> {
        Ok(protect_at(payload, self.root_key.as_bytes(), now)?)
    }

    /// Unprotect a control-channel envelope under the root key.
    pub fn unprotect_control_at(
        &self,
        protected: &[u8],
        now: u64,
    ) -> Result<Vec<u8>, KeyStoreError> {
        Ok(unprotect_at(protected, self.root_key.as_bytes(), now)?)
    }

    /// Unprotect a control-channel envelope and apply the command inside.
    ///
    /// Either the command is fully applied or the store is left untouched.
    ///
    /// # Errors
    ///
    /// - `Envelope`: the envelope is not valid under the current root key
    /// - `Command`: the plaintext is not a valid command
    pub fn apply_control_message_at(
        &mut self,
        protected: &[u8],
        now: u64,
    ) -> Result<Opcode, KeyStoreError> {
        let plaintext = self.unprotect_control_at(protected, now)?;
        Ok(CommandProcessor::process(self, &plaintext)?)
    }

    fn lookup(&self, topic: &str) -> Result<&SymmetricKey, KeyStoreError> {
        let fingerprint = Fingerprint::of(topic);
        self.topic_keys.get(&fingerprint).ok_or(KeyStoreError::TopicKeyNotFound { fingerprint })
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("id", &self.id)
            .field("topics", &self.topic_keys.len())
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}
