//! Shared application state for the ingress server.

use std::sync::Arc;

use gridlink_core::{NeighborDirectory, RegionRegistry};
use gridlink_events::EventQueueClient;

/// Components the handlers need, shared across requests.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Regions hosted by this process.
    pub registry: Arc<RegionRegistry>,
    /// Neighbor sets of those regions.
    pub neighbors: Arc<NeighborDirectory>,
    /// Viewer event delivery, cleared when an agent leaves a region.
    pub events: EventQueueClient,
}

impl AppState {
    /// Bundle the components. The directory must share `registry`.
    pub const fn new(
        registry: Arc<RegionRegistry>,
        neighbors: Arc<NeighborDirectory>,
        events: EventQueueClient,
    ) -> Self {
        Self {
            registry,
            neighbors,
            events,
        }
    }
}
