//! Keyfleet controller
//!
//! The issuing side of the protocol. A [`Controller`] registers clients with
//! their root keys, creates topic keys, and turns intents ("give client X the
//! key for topic T") into control envelopes protected under the client's root
//! key. Every issuance is also broadcast on an [`EventHub`] so observers
//! (audit log, delivery workers) can follow along without polling.

mod controller;
mod error;
mod event;
mod hub;

pub use controller::{ClientRecord, Controller, ControllerConfig, Issued, issue_command};
pub use error::ControllerError;
pub use event::ControllerEvent;
pub use hub::{DEFAULT_QUEUE_CAPACITY, EventHub, HubConfig, Subscription};
