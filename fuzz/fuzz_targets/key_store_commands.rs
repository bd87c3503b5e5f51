//! Fuzz target for command processing against a key store
//!
//! # Strategy
//!
//! - Sequences of raw plaintexts fed to the command processor
//! - Mix of well-formed commands and arbitrary bytes
//!
//! # Invariants
//!
//! - Processing NEVER panics
//! - A rejected command leaves the store byte-for-byte unchanged
//! - An accepted command changes at most one topic or the root key

#![no_main]

use arbitrary::Arbitrary;
use keyfleet_core::{CommandProcessor, KeyStore, SimEnv};
use keyfleet_crypto::{Fingerprint, SymmetricKey};
use keyfleet_proto::{Command, Opcode};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    RemoveTopic([u8; 32]),
    ResetTopics,
    SetIdKey([u8; 64]),
    SetTopicKey([u8; 32], [u8; 64]),
}

impl Input {
    fn plaintext(&self) -> Vec<u8> {
        match self {
            Self::Raw(bytes) => bytes.clone(),
            Self::RemoveTopic(fp) => Command::RemoveTopic(Fingerprint::from_bytes(*fp)).encode(),
            Self::ResetTopics => Command::ResetTopics.encode(),
            Self::SetIdKey(key) => Command::SetIdKey(SymmetricKey::from_bytes(*key)).encode(),
            Self::SetTopicKey(fp, key) => Command::SetTopicKey {
                fingerprint: Fingerprint::from_bytes(*fp),
                key: SymmetricKey::from_bytes(*key),
            }
            .encode(),
        }
    }
}

fuzz_target!(|inputs: Vec<Input>| {
    let mut store = KeyStore::create(&SimEnv::new(0, 0), None, None, "fuzz");

    for input in inputs.iter().take(64) {
        let before = store.snapshot();
        let topics_before = store.topic_count();

        match CommandProcessor::process(&mut store, &input.plaintext()) {
            Ok(Opcode::RemoveTopic) => assert!(store.topic_count() + 1 >= topics_before),
            Ok(Opcode::ResetTopics) => assert_eq!(store.topic_count(), 0),
            Ok(Opcode::SetIdKey) => assert_eq!(store.topic_count(), topics_before),
            Ok(Opcode::SetTopicKey) => assert!(store.topic_count() <= topics_before + 1),
            Err(_) => assert_eq!(store.snapshot(), before, "rejected command mutated store"),
        }
    }
});
