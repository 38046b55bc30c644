//! Network-facing types: request descriptors, response snapshots, the
//! request classifier, and the reqwest transport.

pub mod classify;
pub mod client;
pub mod types;
