//! Subcommand definitions and their execution.

use std::{
    io::{Read, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use keyfleet_controller::issue_command;
use keyfleet_core::{ClientConfig, Environment, KeyStore, SystemEnv};
use keyfleet_crypto::{ClientId, Fingerprint, ID_LEN, KEY_LEN, SymmetricKey};
use keyfleet_proto::{Command, DEFAULT_CONTROL_PREFIX};

use crate::error::CliError;

/// Keyfleet key store and command tool
#[derive(Parser, Debug)]
#[command(name = "keyfleet")]
#[command(about = "Manage Keyfleet client key stores and issue control commands")]
#[command(version)]
pub struct Cli {
    /// Key store snapshot file
    #[arg(short, long, global = true, default_value = "keyfleet.cbor")]
    pub store: PathBuf,

    /// Control topic prefix
    #[arg(long, global = true, default_value = DEFAULT_CONTROL_PREFIX)]
    pub control_prefix: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Subcommand
    #[command(subcommand)]
    pub command: Action,
}

/// Client-side subcommands.
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Create a new key store
    Init {
        /// Derive the client id from this alias instead of generating one
        #[arg(long, conflicts_with = "id")]
        alias: Option<String>,

        /// Client id (32 bytes hex)
        #[arg(long)]
        id: Option<String>,

        /// Root key (64 bytes hex); generated if omitted
        #[arg(long)]
        root_key: Option<String>,

        /// Replace an existing store
        #[arg(long)]
        force: bool,
    },

    /// Print id, control topic and stored fingerprints
    Show {
        /// Also print the root key
        #[arg(long)]
        reveal: bool,
    },

    /// Store a topic key
    SetTopicKey {
        /// Topic name
        topic: String,
        /// Topic key (64 bytes hex)
        key: String,
    },

    /// Remove a topic key
    RemoveTopic {
        /// Topic name
        topic: String,
    },

    /// Remove every topic key
    ResetTopics,

    /// Protect stdin for a topic, printing hex
    Protect {
        /// Topic name
        topic: String,
    },

    /// Unprotect a hex message received on a topic, writing the plaintext
    Unprotect {
        /// Topic name
        topic: String,
        /// Protected message (hex)
        message: String,
    },

    /// Apply a protected control message
    Apply {
        /// Protected control message (hex)
        message: String,
    },

    /// Build and protect a control command (controller side)
    Issue {
        /// Target client's root key (64 bytes hex)
        #[arg(long)]
        root_key: String,

        /// Command to issue
        #[command(subcommand)]
        command: IssueAction,
    },
}

/// Commands the `issue` subcommand can build.
#[derive(Subcommand, Debug)]
pub enum IssueAction {
    /// Opcode 0
    RemoveTopic {
        /// Topic name
        topic: String,
    },
    /// Opcode 1
    ResetTopics,
    /// Opcode 2
    SetIdKey {
        /// New root key (64 bytes hex)
        key: String,
    },
    /// Opcode 3
    SetTopicKey {
        /// Topic name
        topic: String,
        /// Topic key (64 bytes hex)
        key: String,
    },
}

/// Execute `cli`, reading `protect` input from `input` and writing results to
/// `output`.
pub fn run(cli: Cli, input: &mut impl Read, output: &mut impl Write) -> Result<(), CliError> {
    let env = SystemEnv::new();
    let config = ClientConfig { control_prefix: cli.control_prefix };

    match cli.command {
        Action::Init { alias, id, root_key, force } => {
            if cli.store.exists() && !force {
                return Err(CliError::StoreExists { path: cli.store });
            }

            let root_key = root_key.as_deref().map(parse_key).transpose()?;
            let store = match (alias, id) {
                (Some(alias), _) => KeyStore::from_alias(&env, &alias, root_key, &cli.store),
                (None, id) => {
                    let id = id.as_deref().map(parse_id).transpose()?;
                    KeyStore::create(&env, id, root_key, &cli.store)
                },
            };
            store.save()?;

            tracing::info!(id = %store.id(), location = %cli.store.display(), "initialized key store");
            writeln!(output, "{}", store.id())?;
        },

        Action::Show { reveal } => {
            let store = KeyStore::load(&cli.store)?;
            writeln!(output, "id:            {}", store.id())?;
            writeln!(output, "control topic: {}", store.control_topic(&config.control_prefix))?;
            if reveal {
                writeln!(output, "root key:      {}", hex::encode(store.root_key().as_bytes()))?;
            }
            writeln!(output, "topics:        {}", store.topic_count())?;

            let mut fingerprints: Vec<_> = store.fingerprints().collect();
            fingerprints.sort();
            for fingerprint in fingerprints {
                writeln!(output, "  {fingerprint}")?;
            }
        },

        Action::SetTopicKey { topic, key } => {
            let key = parse_key(&key)?;
            let mut store = KeyStore::load(&cli.store)?;
            store.set_topic_key(Fingerprint::of(&topic), key);
            store.save()?;
        },

        Action::RemoveTopic { topic } => {
            let mut store = KeyStore::load(&cli.store)?;
            if !store.remove_topic(&Fingerprint::of(&topic)) {
                tracing::warn!(%topic, "no key stored for topic");
            }
            store.save()?;
        },

        Action::ResetTopics => {
            let mut store = KeyStore::load(&cli.store)?;
            store.reset_topics();
            store.save()?;
        },

        Action::Protect { topic } => {
            let store = KeyStore::load(&cli.store)?;
            let mut plaintext = Vec::new();
            input.read_to_end(&mut plaintext)?;

            let protected =
                store.protect_for_topic_at(&topic, &plaintext, env.wall_clock_secs())?;
            writeln!(output, "{}", hex::encode(protected))?;
        },

        Action::Unprotect { topic, message } => {
            let store = KeyStore::load(&cli.store)?;
            let protected = decode_hex("message", &message)?;

            let plaintext =
                store.unprotect_for_topic_at(&topic, &protected, env.wall_clock_secs())?;
            output.write_all(&plaintext)?;
        },

        Action::Apply { message } => {
            let mut store = KeyStore::load(&cli.store)?;
            let protected = decode_hex("message", &message)?;

            let opcode = store.apply_control_message_at(&protected, env.wall_clock_secs())?;
            store.save()?;
            writeln!(output, "{opcode}")?;
        },

        Action::Issue { root_key, command } => {
            let root_key = parse_key(&root_key)?;
            let command = match command {
                IssueAction::RemoveTopic { topic } => Command::RemoveTopic(Fingerprint::of(&topic)),
                IssueAction::ResetTopics => Command::ResetTopics,
                IssueAction::SetIdKey { key } => Command::SetIdKey(parse_key(&key)?),
                IssueAction::SetTopicKey { topic, key } => {
                    Command::SetTopicKey { fingerprint: Fingerprint::of(&topic), key: parse_key(&key)? }
                },
            };

            let payload = issue_command(&command, &root_key, env.wall_clock_secs())?;
            writeln!(output, "{}", hex::encode(payload))?;
        },
    }

    Ok(())
}

fn decode_hex(what: &'static str, value: &str) -> Result<Vec<u8>, CliError> {
    hex::decode(value.trim()).map_err(|source| CliError::Hex { what, source })
}

fn parse_key(value: &str) -> Result<SymmetricKey, CliError> {
    let bytes = decode_hex("key", value)?;
    SymmetricKey::from_slice(&bytes).ok_or(CliError::Length {
        what: "key",
        expected: KEY_LEN,
        actual: bytes.len(),
    })
}

fn parse_id(value: &str) -> Result<ClientId, CliError> {
    let bytes = decode_hex("id", value)?;
    ClientId::from_slice(&bytes).ok_or(CliError::Length {
        what: "id",
        expected: ID_LEN,
        actual: bytes.len(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use clap::CommandFactory;

    use super::*;

    fn cli(store: &Path, args: &[&str]) -> Cli {
        let mut argv = vec!["keyfleet", "--store", store.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn exec(store: &Path, args: &[&str], input: &[u8]) -> Result<String, CliError> {
        let mut output = Vec::new();
        run(cli(store, args), &mut &input[..], &mut output)?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn init_with_alias_prints_derived_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("s.cbor");

        let out = exec(&store, &["init", "--alias", "sensor-1"], b"").unwrap();
        assert_eq!(out.trim(), ClientId::from_alias("sensor-1").to_hex());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("s.cbor");
        exec(&store, &["init"], b"").unwrap();

        assert!(matches!(exec(&store, &["init"], b""), Err(CliError::StoreExists { .. })));
        assert!(exec(&store, &["init", "--force"], b"").is_ok());
    }

    #[test]
    fn failure_reaches_main_as_boxed_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("missing.cbor");

        let err: Box<dyn std::error::Error> = exec(&store, &["show"], b"").unwrap_err().into();
        assert!(err.to_string().contains("missing.cbor"), "{err}");
    }

    #[test]
    fn short_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("s.cbor");

        let result = exec(&store, &["init", "--root-key", "00ff"], b"");
        assert!(matches!(result, Err(CliError::Length { expected: 64, actual: 2, .. })));
    }

    #[test]
    fn issue_apply_protect_unprotect() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("s.cbor");
        let root = "00".repeat(KEY_LEN);
        let topic_key = "01".repeat(KEY_LEN);

        exec(&store, &["init", "--root-key", &root], b"").unwrap();

        let issued = exec(
            &store,
            &["issue", "--root-key", &root, "set-topic-key", "topicA", &topic_key],
            b"",
        )
        .unwrap();
        let applied = exec(&store, &["apply", issued.trim()], b"").unwrap();
        assert_eq!(applied.trim(), "SetTopicKey");

        let protected = exec(&store, &["protect", "topicA"], b"hello").unwrap();
        let plaintext = exec(&store, &["unprotect", "topicA", protected.trim()], b"").unwrap();
        assert_eq!(plaintext, "hello");
    }

    #[test]
    fn mutations_are_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("s.cbor");
        exec(&store, &["init"], b"").unwrap();

        exec(&store, &["set-topic-key", "a", &"02".repeat(KEY_LEN)], b"").unwrap();
        assert_eq!(KeyStore::load(&store).unwrap().topic_count(), 1);

        exec(&store, &["remove-topic", "a"], b"").unwrap();
        assert_eq!(KeyStore::load(&store).unwrap().topic_count(), 0);

        exec(&store, &["set-topic-key", "b", &"03".repeat(KEY_LEN)], b"").unwrap();
        exec(&store, &["reset-topics"], b"").unwrap();
        assert_eq!(KeyStore::load(&store).unwrap().topic_count(), 0);
    }

    #[test]
    fn show_lists_fingerprints_without_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("s.cbor");
        exec(&store, &["init", "--alias", "x"], b"").unwrap();
        exec(&store, &["set-topic-key", "a", &"02".repeat(KEY_LEN)], b"").unwrap();

        let out = exec(&store, &["show"], b"").unwrap();
        assert!(out.contains(&Fingerprint::of("a").to_hex()));
        assert!(out.contains("control/"));
        assert!(!out.contains(&"02".repeat(KEY_LEN)));
        assert!(!out.contains("root key"));
    }

    #[test]
    fn apply_garbage_is_rejected_and_store_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("s.cbor");
        exec(&store, &["init"], b"").unwrap();

        assert!(exec(&store, &["apply", "zz"], b"").is_err());
        assert!(exec(&store, &["apply", &"00".repeat(30)], b"").is_err());
        assert!(KeyStore::load(&store).is_ok());
    }
}
