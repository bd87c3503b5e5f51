//! CLI errors.

use std::{io, path::PathBuf};

use keyfleet_controller::ControllerError;
use keyfleet_core::KeyStoreError;
use thiserror::Error;

/// Anything a subcommand can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument was not valid hex
    #[error("invalid hex in {what}: {source}")]
    Hex {
        /// Which argument
        what: &'static str,
        /// Decoder error
        source: hex::FromHexError,
    },

    /// Decoded argument has the wrong length
    #[error("{what} must be {expected} bytes, got {actual}")]
    Length {
        /// Which argument
        what: &'static str,
        /// Required length
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// `init` would overwrite an existing store
    #[error("store already exists at {}; pass --force to replace it", path.display())]
    StoreExists {
        /// Existing store
        path: PathBuf,
    },

    /// Key store failure
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    /// Command issuance failure
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Reading input or writing output failed
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
