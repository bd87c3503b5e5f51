//! Thread-safe key store handle.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use keyfleet_crypto::{ClientId, SymmetricKey};
use keyfleet_proto::Opcode;

use crate::{error::KeyStoreError, key_store::KeyStore, snapshot};

/// Cloneable handle to one [`KeyStore`] shared between threads.
///
/// A single lock covers the root key and the topic map together, so a
/// command is decoded, validated and applied under one write guard and
/// readers never observe a half-applied command.
///
/// A poisoned lock is recovered rather than propagated: every mutation on
/// the store is a single map or field assignment, so a panicking holder
/// cannot leave it inconsistent.
#[derive(Clone)]
pub struct SharedKeyStore {
    inner: Arc<RwLock<KeyStore>>,
    /// Serializes saves so snapshots reach disk in the order they were taken
    save_lock: Arc<Mutex<()>>,
}

impl SharedKeyStore {
    /// Wrap a store.
    pub fn new(store: KeyStore) -> Self {
        Self { inner: Arc::new(RwLock::new(store)), save_lock: Arc::new(Mutex::new(())) }
    }

    /// Shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, KeyStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, KeyStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Client identity.
    pub fn id(&self) -> ClientId {
        *self.read().id()
    }

    /// Copy of the current root key.
    pub fn root_key(&self) -> SymmetricKey {
        self.read().root_key().clone()
    }

    /// Protect `payload` for `topic` at time `now`.
    pub fn protect_for_topic_at(
        &self,
        topic: &str,
        payload: &[u8],
        now: u64,
    ) -> Result<Vec<u8>, KeyStoreError> {
        self.read().protect_for_topic_at(topic, payload, now)
    }

    /// Unprotect bytes received on `topic` at time `now`.
    pub fn unprotect_for_topic_at(
        &self,
        topic: &str,
        protected: &[u8],
        now: u64,
    ) -> Result<Vec<u8>, KeyStoreError> {
        self.read().unprotect_for_topic_at(topic, protected, now)
    }

    /// Unprotect a control envelope and apply its command under one write
    /// lock.
    pub fn apply_control_message_at(
        &self,
        protected: &[u8],
        now: u64,
    ) -> Result<Opcode, KeyStoreError> {
        self.write().apply_control_message_at(protected, now)
    }

    /// Persist the store.
    ///
    /// The snapshot is taken under a read lock and written after that lock is
    /// released, so slow storage never blocks message processing. Concurrent
    /// saves are serialized by a separate save lock held across snapshot and
    /// write; an older snapshot can never replace a newer one on disk.
    pub fn save(&self) -> Result<(), KeyStoreError> {
        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (location, snapshot): (PathBuf, _) = {
            let store = self.read();
            (store.location().to_path_buf(), store.snapshot())
        };

        snapshot::write_snapshot(&location, &snapshot)?;
        tracing::debug!(location = %location.display(), "saved shared key store");
        Ok(())
    }
}

impl From<KeyStore> for SharedKeyStore {
    fn from(store: KeyStore) -> Self {
        Self::new(store)
    }
}

impl std::fmt::Debug for SharedKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedKeyStore").field(&*self.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use keyfleet_crypto::{Fingerprint, ID_LEN, KEY_LEN};
    use keyfleet_proto::Command;

    use super::*;
    use crate::env::SimEnv;

    const NOW: u64 = 1_700_000_000;

    fn shared() -> SharedKeyStore {
        SharedKeyStore::new(KeyStore::create(
            &SimEnv::new(0, NOW),
            Some(ClientId::from_bytes([0; ID_LEN])),
            Some(SymmetricKey::from_bytes([0; KEY_LEN])),
            "unused",
        ))
    }

    #[test]
    fn clones_share_state() {
        let a = shared();
        let b = a.clone();

        a.write().set_topic_key(Fingerprint::of("t"), SymmetricKey::from_bytes([1; KEY_LEN]));
        assert!(b.read().has_topic("t"));
    }

    #[test]
    fn apply_control_message() {
        let store = shared();
        let command = Command::SetTopicKey {
            fingerprint: Fingerprint::of("topicA"),
            key: SymmetricKey::from_bytes([1; KEY_LEN]),
        };
        let protected = store.read().protect_control_at(&command.encode(), NOW).unwrap();

        assert_eq!(store.apply_control_message_at(&protected, NOW), Ok(Opcode::SetTopicKey));
        assert!(store.read().has_topic("topicA"));
    }

    #[test]
    fn concurrent_readers_and_writer() {
        let store = shared();
        store.write().set_topic_key(Fingerprint::of("t"), SymmetricKey::from_bytes([1; KEY_LEN]));
        let protected = store.protect_for_topic_at("t", b"payload", NOW).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let protected = protected.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let plaintext = store.unprotect_for_topic_at("t", &protected, NOW).unwrap();
                        assert_eq!(plaintext, b"payload");
                    }
                })
            })
            .collect();

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..50u8 {
                    store
                        .write()
                        .set_topic_key(Fingerprint::of(format!("other-{i}")), SymmetricKey::from_bytes([i; KEY_LEN]));
                }
            })
        };

        for reader in readers {
            reader.join().unwrap();
        }
        writer.join().unwrap();

        assert_eq!(store.read().topic_count(), 51);
    }
}
