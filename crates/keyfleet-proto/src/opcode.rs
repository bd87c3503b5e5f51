//! Command opcodes.

use std::fmt;

use keyfleet_crypto::{FINGERPRINT_LEN, KEY_LEN};

/// Control command opcode (first plaintext byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Drop the key for one topic fingerprint
    RemoveTopic = 0,
    /// Drop every topic key
    ResetTopics = 1,
    /// Replace the root key
    SetIdKey = 2,
    /// Install or overwrite one topic key
    SetTopicKey = 3,
}

impl Opcode {
    /// Every opcode, in wire order.
    pub const ALL: [Self; 4] =
        [Self::RemoveTopic, Self::ResetTopics, Self::SetIdKey, Self::SetTopicKey];

    /// Parse an opcode byte. `None` for values outside 0..=3.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::RemoveTopic),
            1 => Some(Self::ResetTopics),
            2 => Some(Self::SetIdKey),
            3 => Some(Self::SetTopicKey),
            _ => None,
        }
    }

    /// Wire value of this opcode.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Exact plaintext length (opcode byte included) for this command.
    pub const fn command_len(self) -> usize {
        1 + match self {
            Self::RemoveTopic => FINGERPRINT_LEN,
            Self::ResetTopics => 0,
            Self::SetIdKey => KEY_LEN,
            Self::SetTopicKey => FINGERPRINT_LEN + KEY_LEN,
        }
    }

    /// Human-readable name used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::RemoveTopic => "RemoveTopic",
            Self::ResetTopics => "ResetTopics",
            Self::SetIdKey => "SetIdKey",
            Self::SetTopicKey => "SetTopicKey",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
