//! Shared skeleton for the Actual Reader model-server bridges.
//!
//! A bridge is a long-lived process that loads one expensive inference model
//! at startup, then serves requests as JSON objects, one per line on stdin,
//! answering with one JSON object per line on stdout. Diagnostics go to
//! stderr and are never mixed into the protocol stream.
//!
//! The pieces here are model-agnostic: the line codec and wire types
//! ([`protocol`]), the dispatch loop ([`bridge`]), engine failure
//! classification ([`error`]), the process-owned artifact directory
//! ([`workdir`]), device resolution ([`device`]) and stderr logging setup
//! ([`logging`]). Each bridge binary supplies the request validator and the
//! model capability by implementing [`bridge::BridgeService`].

pub mod bridge;
pub mod device;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod workdir;
