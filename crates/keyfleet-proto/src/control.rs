//! Control channel naming.
//!
//! Each client listens for commands on a private topic derived from its id.
//! The transport only has to deliver this topic distinctly from data topics.

use keyfleet_crypto::ClientId;

/// Prefix used for control topics unless configured otherwise
pub const DEFAULT_CONTROL_PREFIX: &str = "control/";

/// Control topic for a client: `prefix` followed by the lowercase hex id.
pub fn control_topic(prefix: &str, id: &ClientId) -> String {
    let mut topic = String::with_capacity(prefix.len() + 2 * id.as_bytes().len());
    topic.push_str(prefix);
    topic.push_str(&id.to_hex());
    topic
}
