//! Command parsing errors.

use thiserror::Error;

use crate::Opcode;

/// Result alias for command decoding
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors from decoding a control command.
///
/// A command that fails to decode is dropped as a whole; nothing of it is
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Plaintext has no opcode byte
    #[error("empty command")]
    EmptyCommand,

    /// Opcode byte is not a known command
    #[error("unknown command opcode {0:#04x}")]
    UnknownCommand(u8),

    /// Total length does not match the opcode's fixed layout
    #[error("invalid length for {opcode}: expected {expected} bytes, got {actual}")]
    InvalidCommandLength {
        /// Opcode that was parsed
        opcode: Opcode,
        /// Required total length
        expected: usize,
        /// Length that was received
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CommandError::InvalidCommandLength {
            opcode: Opcode::SetTopicKey,
            expected: 97,
            actual: 96,
        };
        assert_eq!(err.to_string(), "invalid length for SetTopicKey: expected 97 bytes, got 96");

        assert_eq!(CommandError::UnknownCommand(7).to_string(), "unknown command opcode 0x07");
    }
}
