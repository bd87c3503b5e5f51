//! Control command encoding and decoding.
//!
//! Decoding is strict: the opcode selects a fixed total length and anything
//! else is rejected before a single argument byte is interpreted.

use keyfleet_crypto::{FINGERPRINT_LEN, Fingerprint, SymmetricKey};

use crate::{
    Opcode,
    errors::{CommandError, Result},
};

/// A decoded control command.
///
/// Key material inside a command is zeroized when the command is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Remove the key stored under this fingerprint
    RemoveTopic(Fingerprint),
    /// Remove all topic keys
    ResetTopics,
    /// Replace the root key
    SetIdKey(SymmetricKey),
    /// Store `key` under `fingerprint`, replacing any previous key
    SetTopicKey {
        /// Fingerprint of the topic name (first 32 argument bytes)
        fingerprint: Fingerprint,
        /// Topic key (last 64 argument bytes)
        key: SymmetricKey,
    },
}

impl Command {
    /// Opcode corresponding to this command.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::RemoveTopic(_) => Opcode::RemoveTopic,
            Self::ResetTopics => Opcode::ResetTopics,
            Self::SetIdKey(_) => Opcode::SetIdKey,
            Self::SetTopicKey { .. } => Opcode::SetTopicKey,
        }
    }

    /// Decode a command plaintext.
    ///
    /// # Errors
    ///
    /// - `EmptyCommand`: no opcode byte
    /// - `UnknownCommand`: opcode outside 0..=3
    /// - `InvalidCommandLength`: total length differs from the opcode's layout
    pub fn decode(plaintext: &[u8]) -> Result<Self> {
        let (&opcode_byte, argument) =
            plaintext.split_first().ok_or(CommandError::EmptyCommand)?;

        let opcode = Opcode::from_u8(opcode_byte).ok_or(CommandError::UnknownCommand(opcode_byte))?;

        let expected = opcode.command_len();
        if plaintext.len() != expected {
            return Err(CommandError::InvalidCommandLength {
                opcode,
                expected,
                actual: plaintext.len(),
            });
        }

        // Lengths are validated above, the slice conversions below cannot fail
        let invalid = || CommandError::InvalidCommandLength {
            opcode,
            expected,
            actual: plaintext.len(),
        };

        let command = match opcode {
            Opcode::RemoveTopic => {
                Self::RemoveTopic(Fingerprint::from_slice(argument).ok_or_else(invalid)?)
            },
            Opcode::ResetTopics => Self::ResetTopics,
            Opcode::SetIdKey => Self::SetIdKey(SymmetricKey::from_slice(argument).ok_or_else(invalid)?),
            Opcode::SetTopicKey => {
                let (fingerprint, key) = argument.split_at(FINGERPRINT_LEN);
                Self::SetTopicKey {
                    fingerprint: Fingerprint::from_slice(fingerprint).ok_or_else(invalid)?,
                    key: SymmetricKey::from_slice(key).ok_or_else(invalid)?,
                }
            },
        };

        Ok(command)
    }

    /// Encode this command into its plaintext wire form.
    ///
    /// Used on the issuing side; the result still has to be protected under
    /// the target client's root key before it is sent.
    pub fn encode(&self) -> Vec<u8> {
        let opcode = self.opcode();
        let mut buf = Vec::with_capacity(opcode.command_len());
        buf.push(opcode.to_u8());

        match self {
            Self::RemoveTopic(fingerprint) => buf.extend_from_slice(fingerprint.as_bytes()),
            Self::ResetTopics => {},
            Self::SetIdKey(key) => buf.extend_from_slice(key.as_bytes()),
            Self::SetTopicKey { fingerprint, key } => {
                buf.extend_from_slice(fingerprint.as_bytes());
                buf.extend_from_slice(key.as_bytes());
            },
        }

        debug_assert_eq!(buf.len(), opcode.command_len());
        buf
    }
}
