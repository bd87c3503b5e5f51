//! Command processor.
//!
//! Turns an authenticated control plaintext into exactly one key store
//! mutation. The command is fully decoded and validated before the store is
//! touched, so a rejected command leaves the store unchanged.

use keyfleet_proto::{Command, Opcode};

use crate::{error::KeyStoreError, key_store::KeyStore};

/// Applies control commands to a [`KeyStore`].
///
/// Stateless. The plaintext must already have been unprotected under the
/// store's root key; this type does no authentication of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProcessor;

impl CommandProcessor {
    /// Decode `plaintext` and apply it to `store`.
    ///
    /// Returns the opcode of the applied command.
    ///
    /// # Errors
    ///
    /// - `Command(EmptyCommand)`: empty plaintext
    /// - `Command(UnknownCommand)`: opcode outside 0..=3
    /// - `Command(InvalidCommandLength)`: length does not match the opcode
    pub fn process(store: &mut KeyStore, plaintext: &[u8]) -> Result<Opcode, KeyStoreError> {
        let command = match Command::decode(plaintext) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(
                    id = %store.id(),
                    len = plaintext.len(),
                    error = %e,
                    "undecodable control command"
                );
                return Err(e.into());
            },
        };

        Ok(Self::apply(store, command))
    }

    /// Apply an already decoded command. Infallible: every command variant
    /// carries arguments of the right size.
    pub fn apply(store: &mut KeyStore, command: Command) -> Opcode {
        let opcode = command.opcode();

        match command {
            Command::RemoveTopic(fingerprint) => {
                let removed = store.remove_topic(&fingerprint);
                tracing::debug!(id = %store.id(), %fingerprint, removed, "removed topic key");
            },
            Command::ResetTopics => {
                let cleared = store.topic_count();
                store.reset_topics();
                tracing::debug!(id = %store.id(), cleared, "reset topic keys");
            },
            Command::SetIdKey(key) => {
                store.set_root_key(key);
                tracing::debug!(id = %store.id(), "replaced root key");
            },
            Command::SetTopicKey { fingerprint, key } => {
                store.set_topic_key(fingerprint, key);
                tracing::debug!(id = %store.id(), %fingerprint, "stored topic key");
            },
        }

        opcode
    }
}

#[cfg(test)]
mod tests {
    use keyfleet_crypto::{ClientId, Fingerprint, ID_LEN, KEY_LEN, SymmetricKey};
    use keyfleet_proto::CommandError;

    use super::*;
    use crate::env::SimEnv;

    fn empty_store() -> KeyStore {
        KeyStore::create(
            &SimEnv::new(0, 0),
            Some(ClientId::from_bytes([0; ID_LEN])),
            Some(SymmetricKey::from_bytes([0; KEY_LEN])),
            "unused",
        )
    }

    fn set_topic_key_plaintext(topic: &str, key_byte: u8) -> Vec<u8> {
        let mut plaintext = vec![Opcode::SetTopicKey.to_u8()];
        plaintext.extend_from_slice(Fingerprint::of(topic).as_bytes());
        plaintext.extend_from_slice(&[key_byte; KEY_LEN]);
        plaintext
    }

    #[test]
    fn set_topic_key_uses_table_order() {
        let mut store = empty_store();

        let opcode =
            CommandProcessor::process(&mut store, &set_topic_key_plaintext("topicA", 1)).unwrap();

        assert_eq!(opcode, Opcode::SetTopicKey);
        assert_eq!(
            store.topic_key(&Fingerprint::of("topicA")),
            Some(&SymmetricKey::from_bytes([1; KEY_LEN]))
        );
    }

    #[test]
    fn remove_topic_command() {
        let mut store = empty_store();
        CommandProcessor::process(&mut store, &set_topic_key_plaintext("topicA", 1)).unwrap();

        let mut plaintext = vec![Opcode::RemoveTopic.to_u8()];
        plaintext.extend_from_slice(Fingerprint::of("topicA").as_bytes());

        assert_eq!(CommandProcessor::process(&mut store, &plaintext), Ok(Opcode::RemoveTopic));
        assert_eq!(store.topic_count(), 0);
    }

    #[test]
    fn reset_topics_command() {
        let mut store = empty_store();
        CommandProcessor::process(&mut store, &set_topic_key_plaintext("a", 1)).unwrap();
        CommandProcessor::process(&mut store, &set_topic_key_plaintext("b", 2)).unwrap();

        assert_eq!(CommandProcessor::process(&mut store, &[1]), Ok(Opcode::ResetTopics));
        assert_eq!(store.topic_count(), 0);
    }

    #[test]
    fn set_id_key_command() {
        let mut store = empty_store();
        let mut plaintext = vec![Opcode::SetIdKey.to_u8()];
        plaintext.extend_from_slice(&[7; KEY_LEN]);

        assert_eq!(CommandProcessor::process(&mut store, &plaintext), Ok(Opcode::SetIdKey));
        assert_eq!(store.root_key(), &SymmetricKey::from_bytes([7; KEY_LEN]));
    }

    #[test]
    fn empty_plaintext_is_rejected() {
        let mut store = empty_store();
        assert_eq!(
            CommandProcessor::process(&mut store, &[]),
            Err(KeyStoreError::Command(CommandError::EmptyCommand))
        );
    }

    #[test]
    fn rejected_command_leaves_store_unchanged() {
        let mut store = empty_store();
        CommandProcessor::process(&mut store, &set_topic_key_plaintext("topicA", 1)).unwrap();
        let before = store.snapshot();

        // SetIdKey one byte short
        let mut short = vec![Opcode::SetIdKey.to_u8()];
        short.extend_from_slice(&[9; KEY_LEN - 1]);
        let result = CommandProcessor::process(&mut store, &short);

        assert!(result.as_ref().is_err_and(KeyStoreError::is_command_rejection));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let mut store = empty_store();
        assert_eq!(
            CommandProcessor::process(&mut store, &[4, 0, 0]),
            Err(KeyStoreError::Command(CommandError::UnknownCommand(4)))
        );
    }
}
