//! In-memory scene for regions served by the standalone binary.
//!
//! [`MemoryScene`] keeps the agents and objects handed to it and the
//! neighbors it has been told about. It has no simulation of its own.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use gridlink_core::SceneHost;
use gridlink_types::{
    AgentCircuitData, AgentData, AgentId, AgentUpdate, CreatedAgentPayload, ObjectId,
    RegionDescriptor, RegionId, SceneObjectData, TeleportFlags,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// An agent present in the region.
#[derive(Debug, Clone)]
struct PresentAgent {
    circuit: AgentCircuitData,
    data: Option<AgentData>,
}

/// A [`SceneHost`] that only records what it is given.
#[derive(Debug)]
pub struct MemoryScene {
    descriptor: RegionDescriptor,
    udp_port: u16,
    agents: RwLock<HashMap<AgentId, PresentAgent>>,
    objects: RwLock<HashMap<ObjectId, SceneObjectData>>,
    neighbors: Mutex<BTreeMap<RegionId, RegionDescriptor>>,
}

impl MemoryScene {
    /// Create an empty scene for a region. `udp_port` is handed to
    /// arriving agents.
    pub fn new(descriptor: RegionDescriptor, udp_port: u16) -> Self {
        Self {
            descriptor,
            udp_port,
            agents: RwLock::new(HashMap::new()),
            objects: RwLock::new(HashMap::new()),
            neighbors: Mutex::new(BTreeMap::new()),
        }
    }

    /// The region this scene serves.
    pub const fn descriptor(&self) -> &RegionDescriptor {
        &self.descriptor
    }

    /// Whether an agent is present.
    pub async fn has_agent(&self, agent_id: AgentId) -> bool {
        self.agents.read().await.contains_key(&agent_id)
    }

    /// Whether a present agent arrived as a child agent.
    pub async fn is_child(&self, agent_id: AgentId) -> Option<bool> {
        self.agents
            .read()
            .await
            .get(&agent_id)
            .map(|present| present.circuit.child)
    }

    /// Number of agents present.
    pub async fn agent_count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Number of objects received.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Neighbors this scene currently knows, by ID.
    pub fn neighbor_ids(&self) -> Vec<RegionId> {
        self.neighbors
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}

#[async_trait]
impl SceneHost for MemoryScene {
    fn on_region_up(&self, neighbor: &RegionDescriptor) {
        info!(
            region = %self.descriptor.name,
            neighbor = %neighbor.name,
            "neighbor region up"
        );
        self.neighbors
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(neighbor.region_id, neighbor.clone());
    }

    fn on_region_down(&self, neighbor: &RegionDescriptor) {
        info!(
            region = %self.descriptor.name,
            neighbor = %neighbor.name,
            "neighbor region down"
        );
        self.neighbors
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&neighbor.region_id);
    }

    async fn accept_agent(
        &self,
        circuit: AgentCircuitData,
        teleport_flags: TeleportFlags,
        agent: Option<AgentData>,
    ) -> Result<CreatedAgentPayload, String> {
        let agent_id = circuit.agent_id;
        if agent_id.is_nil() {
            return Err("agent id is nil".to_owned());
        }
        debug!(
            region = %self.descriptor.name,
            agent_id = %agent_id,
            child = circuit.child,
            teleport_flags = teleport_flags.0,
            "agent arriving"
        );
        self.agents.write().await.insert(
            agent_id,
            PresentAgent {
                circuit,
                data: agent,
            },
        );
        Ok(CreatedAgentPayload {
            agent_id,
            udp_port: self.udp_port,
            caps_urls: BTreeMap::new(),
        })
    }

    async fn update_agent(&self, update: AgentUpdate) -> bool {
        let mut agents = self.agents.write().await;
        let Some(present) = agents.get_mut(&update.agent_id()) else {
            return false;
        };
        match update {
            AgentUpdate::AgentData(data) => {
                // A full update promotes a child agent to root.
                present.circuit.child = false;
                present.data = Some(data);
            }
            AgentUpdate::AgentPosition(position) => {
                if let Some(data) = present.data.as_mut() {
                    data.position = position.position;
                    data.velocity = position.velocity;
                    data.draw_distance = position.draw_distance;
                }
            }
        }
        true
    }

    async fn retrieve_agent(&self, agent_id: AgentId) -> Option<AgentData> {
        self.agents
            .read()
            .await
            .get(&agent_id)
            .and_then(|present| present.data.clone())
    }

    async fn close_agent(&self, agent_id: AgentId) -> bool {
        self.agents.write().await.remove(&agent_id).is_some()
    }

    async fn accept_object(&self, object: SceneObjectData) -> bool {
        debug!(
            region = %self.descriptor.name,
            object_id = %object.object_id,
            name = %object.name,
            "object arriving"
        );
        self.objects.write().await.insert(object.object_id, object);
        true
    }
}
