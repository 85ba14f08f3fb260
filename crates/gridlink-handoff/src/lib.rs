//! Cross-region hand-off for Gridlink.
//!
//! [`SimulationClient`] moves agents and objects between regions. Every
//! operation first looks for the destination among the regions hosted by
//! this process and calls its [`SceneHost`](gridlink_core::SceneHost)
//! directly; only when the destination lives elsewhere does it go over the
//! network. Remote failures never escape to the caller: they are logged and
//! reported as `false` or `None`.
//!
//! Destinations whose agent update endpoint stops answering are put on an
//! [`EndpointBlacklist`] for a cool-down period so that a dead neighbor
//! does not stall every movement update.

pub mod blacklist;
pub mod client;
pub mod error;

pub use blacklist::EndpointBlacklist;
pub use client::{CreateAgentOutcome, SimulationClient};
pub use error::HandoffError;
