//! Agent and scene object state carried across region boundaries.
//!
//! When an avatar crosses into or teleports to another region, the source
//! region hands the destination a [`AgentCircuitData`] (who is coming and
//! how to reach their viewer) followed by [`AgentData`] or the lighter
//! [`AgentPosition`] updates. Objects crossing a border travel as
//! [`SceneObjectData`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, ObjectId, RegionId, SessionId};

/// A position or velocity in region-local meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// East-west component.
    pub x: f32,
    /// North-south component.
    pub y: f32,
    /// Vertical component.
    pub z: f32,
}

impl Vector3 {
    /// Build a vector from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Bit set describing why and how an agent is being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeleportFlags(pub u32);

impl TeleportFlags {
    /// No special handling.
    pub const DEFAULT: Self = Self(0);
    /// Teleport initiated by a lure (invitation) from another user.
    pub const VIA_LURE: Self = Self(1 << 2);
    /// Teleport to the agent's home location.
    pub const VIA_HOME: Self = Self(1 << 4);
    /// Teleport to an explicit region position.
    pub const VIA_LOCATION: Self = Self(1 << 5);
    /// Initial placement at login.
    pub const VIA_LOGIN: Self = Self(1 << 7);
    /// Walking or flying across a region border.
    pub const VIA_REGION_CROSSING: Self = Self(1 << 8);

    /// Whether every bit in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Everything a destination region needs to accept a new agent circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCircuitData {
    /// The arriving agent.
    pub agent_id: AgentId,
    /// The agent's login session.
    pub session_id: SessionId,
    /// Circuit code the viewer will present when it connects.
    pub circuit_code: u32,
    /// Avatar first name.
    pub first_name: String,
    /// Avatar last name.
    pub last_name: String,
    /// Arrival position inside the destination region.
    pub start_position: Vector3,
    /// Whether the agent arrives as a child (presence-only) agent.
    pub child: bool,
    /// Seed capability path assigned for the destination.
    pub caps_path: String,
    /// Service URLs the agent's home grid advertises (inventory, assets, ...).
    #[serde(default)]
    pub service_urls: BTreeMap<String, String>,
}

/// Full state of a root agent, sent on crossing or teleport completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    /// The agent.
    pub agent_id: AgentId,
    /// The agent's login session.
    pub session_id: SessionId,
    /// Region the agent is leaving.
    pub region_id: RegionId,
    /// Position inside the destination region.
    pub position: Vector3,
    /// Current velocity.
    pub velocity: Vector3,
    /// Viewer draw distance in meters.
    pub draw_distance: f32,
    /// Movement control flags from the viewer.
    pub control_flags: u32,
    /// God level granted to the agent (0 = none).
    pub god_level: u8,
    /// Objects attached to the avatar.
    #[serde(default)]
    pub attachments: Vec<ObjectId>,
    /// Serialized appearance, passed through untouched.
    #[serde(default)]
    pub appearance: Option<serde_json::Value>,
}

/// Position-only refresh sent to regions holding a child agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentPosition {
    /// The agent.
    pub agent_id: AgentId,
    /// The agent's login session.
    pub session_id: SessionId,
    /// Absolute position in the agent's root region.
    pub position: Vector3,
    /// Current velocity.
    pub velocity: Vector3,
    /// Viewer draw distance in meters.
    pub draw_distance: f32,
}

/// Body of an agent update: either the full agent or only its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "data")]
pub enum AgentUpdate {
    /// Complete agent state.
    AgentData(AgentData),
    /// Position refresh for a child agent.
    AgentPosition(AgentPosition),
}

impl AgentUpdate {
    /// The agent the update is about.
    pub const fn agent_id(&self) -> AgentId {
        match self {
            Self::AgentData(data) => data.agent_id,
            Self::AgentPosition(position) => position.agent_id,
        }
    }
}

/// A scene object crossing into another region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObjectData {
    /// Root object of the linkset.
    pub object_id: ObjectId,
    /// Owner of the object.
    pub owner_id: AgentId,
    /// Object name.
    pub name: String,
    /// Position inside the destination region.
    pub position: Vector3,
    /// Pre-serialized linkset, passed through untouched.
    pub serialized: String,
}

/// Payload returned by a destination that accepted an agent.
///
/// The hand-off only counts as successful when this parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAgentPayload {
    /// The accepted agent.
    pub agent_id: AgentId,
    /// UDP port the viewer should connect to.
    pub udp_port: u16,
    /// Capability URLs granted by the destination, keyed by capability name.
    #[serde(default)]
    pub caps_urls: BTreeMap<String, String>,
}
