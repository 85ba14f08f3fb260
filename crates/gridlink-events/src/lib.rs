//! Viewer event delivery for Gridlink.
//!
//! Events raised for an agent in some region are POSTed to the agent's
//! event queue endpoints. When a delivery fails the batch is kept and sent
//! again, ahead of the next event, the next time anything is queued for
//! the same agent and region.
//!
//! - [`caps`] -- [`CapsRegistry`]: where an agent's event queues live and
//!   which regions it holds capabilities in.
//! - [`queue`] -- [`EventQueueClient`]: buffering, batching and delivery.

pub mod caps;
pub mod queue;

pub use caps::{AgentCapsTable, CapsRegistry};
pub use queue::{DeliveryError, EventQueueClient};
