//! Per-agent capability state consulted by the event queue.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use gridlink_types::{AgentId, RegionHandle};
use tokio::sync::RwLock;

/// Lookup of an agent's event queue endpoints and region capabilities.
#[async_trait]
pub trait CapsRegistry: Send + Sync {
    /// URLs that accept event batches for `agent_id`. Empty when unknown.
    async fn event_queue_urls(&self, agent_id: AgentId) -> Vec<String>;

    /// Drop the agent's capabilities for one region. Returns whether the
    /// agent had any there.
    async fn remove_region(&self, agent_id: AgentId, handle: RegionHandle) -> bool;
}

#[derive(Debug, Default)]
struct AgentCaps {
    event_queue_urls: Vec<String>,
    regions: BTreeSet<RegionHandle>,
}

/// In-memory [`CapsRegistry`].
#[derive(Debug, Default)]
pub struct AgentCapsTable {
    agents: RwLock<HashMap<AgentId, AgentCaps>>,
}

impl AgentCapsTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event queue endpoint for an agent. Duplicates are ignored.
    pub async fn add_event_queue_url(&self, agent_id: AgentId, url: impl Into<String>) {
        let url = url.into();
        let mut agents = self.agents.write().await;
        let caps = agents.entry(agent_id).or_default();
        if !caps.event_queue_urls.contains(&url) {
            caps.event_queue_urls.push(url);
        }
    }

    /// Record that the agent holds capabilities in a region.
    pub async fn add_region(&self, agent_id: AgentId, handle: RegionHandle) {
        self.agents
            .write()
            .await
            .entry(agent_id)
            .or_default()
            .regions
            .insert(handle);
    }

    /// Regions the agent holds capabilities in.
    pub async fn regions(&self, agent_id: AgentId) -> Vec<RegionHandle> {
        self.agents
            .read()
            .await
            .get(&agent_id)
            .map(|caps| caps.regions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Forget everything about an agent.
    pub async fn remove_agent(&self, agent_id: AgentId) -> bool {
        self.agents.write().await.remove(&agent_id).is_some()
    }
}

#[async_trait]
impl CapsRegistry for AgentCapsTable {
    async fn event_queue_urls(&self, agent_id: AgentId) -> Vec<String> {
        self.agents
            .read()
            .await
            .get(&agent_id)
            .map(|caps| caps.event_queue_urls.clone())
            .unwrap_or_default()
    }

    async fn remove_region(&self, agent_id: AgentId, handle: RegionHandle) -> bool {
        self.agents
            .write()
            .await
            .get_mut(&agent_id)
            .is_some_and(|caps| caps.regions.remove(&handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn urls_are_deduplicated() {
        let table = AgentCapsTable::new();
        let agent = AgentId::new();
        table.add_event_queue_url(agent, "http://viewer/eq").await;
        table.add_event_queue_url(agent, "http://viewer/eq").await;
        table.add_event_queue_url(agent, "http://mirror/eq").await;

        assert_eq!(
            table.event_queue_urls(agent).await,
            vec!["http://viewer/eq".to_owned(), "http://mirror/eq".to_owned()]
        );
        assert!(table.event_queue_urls(AgentId::new()).await.is_empty());
    }

    #[tokio::test]
    async fn remove_region_reports_presence() {
        let table = AgentCapsTable::new();
        let agent = AgentId::new();
        let here = RegionHandle::from_position(256_000, 256_000);
        let there = RegionHandle::from_position(256_256, 256_000);
        table.add_region(agent, here).await;
        table.add_region(agent, there).await;

        assert!(table.remove_region(agent, here).await);
        assert!(!table.remove_region(agent, here).await);
        assert_eq!(table.regions(agent).await, vec![there]);
        assert!(!table.remove_region(AgentId::new(), there).await);

        assert!(table.remove_agent(agent).await);
        assert!(table.regions(agent).await.is_empty());
    }
}
