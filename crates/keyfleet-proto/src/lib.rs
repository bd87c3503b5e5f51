//! Keyfleet control protocol
//!
//! Wire format for management commands carried on a client's private control
//! channel. A command is the plaintext of an envelope protected under the
//! client's root key:
//!
//! ```text
//! ┌────────────┬──────────────────────────────────────────┐
//! │ opcode (1) │ argument (fixed length per opcode)       │
//! └────────────┴──────────────────────────────────────────┘
//! ```
//!
//! | Opcode        | Value | Argument                      | Total |
//! |---------------|-------|-------------------------------|-------|
//! | `RemoveTopic` | 0     | fingerprint (32)              | 33    |
//! | `ResetTopics` | 1     | none                          | 1     |
//! | `SetIdKey`    | 2     | root key (64)                 | 65    |
//! | `SetTopicKey` | 3     | fingerprint (32), key (64)    | 97    |
//!
//! There are no length prefixes. The total length is implied by the opcode
//! and checked exactly before the argument is read.
//!
//! # Invariants
//!
//! - Each [`Command`] variant maps to exactly one [`Opcode`]
//! - `Command::decode(&cmd.encode()) == Ok(cmd)` for every command
//! - Decoding never reads past the validated length

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod control;
mod errors;
mod opcode;

pub use command::Command;
pub use control::{DEFAULT_CONTROL_PREFIX, control_topic};
pub use errors::{CommandError, Result};
pub use opcode::Opcode;
