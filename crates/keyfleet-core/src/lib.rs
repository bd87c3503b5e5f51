//! Keyfleet client core
//!
//! The client side of the key-distribution protocol: a [`KeyStore`] holding
//! the client's id, root key and topic keys, the [`CommandProcessor`] that
//! applies authenticated control commands to it, and a Sans-IO [`Client`]
//! driver that routes transport messages.
//!
//! # Architecture
//!
//! ```text
//!   transport ──MessageReceived──► Client ──► SharedKeyStore (RwLock)
//!                                    │           │
//!                                    │           ├─ control topic: unprotect(root key)
//!                                    │           │      └─► CommandProcessor ─► one mutation
//!                                    │           └─ data topic: unprotect(topic key)
//!                                    ▼
//!                              ClientAction (Deliver, Publish, Persist, ...)
//! ```
//!
//! Persistence is explicit. The store writes a CBOR snapshot on
//! [`KeyStore::save`] and never on its own; the client emits
//! [`ClientAction::Persist`] after each applied command so the caller picks
//! the cadence.
//!
//! # Determinism
//!
//! Wall clock and randomness come from an [`Environment`]. Production code
//! uses [`SystemEnv`]; tests drive [`SimEnv`] with a manual clock and a
//! seeded RNG.

mod client;
pub mod env;
mod error;
mod event;
mod key_store;
mod processor;
mod shared;
pub mod snapshot;

pub use client::{Client, ClientConfig};
pub use env::{Environment, SimEnv, SystemEnv};
pub use error::{ClientError, KeyStoreError};
pub use event::{ClientAction, ClientEvent};
pub use key_store::KeyStore;
pub use processor::CommandProcessor;
pub use shared::SharedKeyStore;
pub use snapshot::{KeyStoreSnapshot, SNAPSHOT_VERSION, TopicKeyEntry};
