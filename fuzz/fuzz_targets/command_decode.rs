//! Fuzz target for Command::decode
//!
//! # Invariants
//!
//! - Decoding arbitrary bytes NEVER panics
//! - A decoded command has exactly the length its opcode requires
//! - Re-encoding a decoded command reproduces the input bytes

#![no_main]

use keyfleet_proto::Command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(command) = Command::decode(data) else {
        return;
    };

    assert_eq!(data.len(), command.opcode().command_len(), "accepted wrong length");
    assert_eq!(command.encode(), data, "decode/encode mismatch");
});
