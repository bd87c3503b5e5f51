//! Keyfleet command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Create a store for a client named by alias
//! keyfleet --store sensor.cbor init --alias sensor-1
//!
//! # Controller side: build a protected command for that client
//! keyfleet issue --root-key <HEX> set-topic-key telemetry <KEYHEX>
//!
//! # Client side: apply it, then protect a message
//! keyfleet --store sensor.cbor apply <HEX>
//! echo -n 42 | keyfleet --store sensor.cbor protect telemetry
//! ```

mod commands;
mod error;

use std::io;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    commands::run(cli, &mut stdin.lock(), &mut stdout.lock()).inspect_err(|e| {
        tracing::error!(error = %e, "command failed");
    })?;

    Ok(())
}
