//! JSON bodies exchanged between region servers.
//!
//! Requests are flat maps carrying the destination's identity and position
//! next to a nested block of agent or object state. Every response carries a
//! boolean `success`; failures may add a `reason` for the caller's logs.
//!
//! | Call | Method | Path | Request | Response |
//! |------|--------|------|---------|----------|
//! | create agent | `POST` | `/agent/{agent_id}/` | [`CreateAgentRequest`] | [`HandoffResponse`] with payload |
//! | update agent | `PUT` | `/agent/{agent_id}/` | [`UpdateAgentRequest`] | [`HandoffResponse`] |
//! | retrieve agent | `GET` | `/agent/{agent_id}/{region_id}/` | -- | [`RetrieveAgentResponse`] |
//! | close agent | `DELETE` | `/agent/{agent_id}/{region_id}/` | -- | [`HandoffResponse`] |
//! | create object | `POST` | `/object/{object_id}/` | [`CreateObjectRequest`] | [`HandoffResponse`] |
//! | deliver events | `POST` | event queue URL | [`EventBatchRequest`] | [`EventBatchResponse`] |

use serde::{Deserialize, Serialize};

use crate::agent::{AgentCircuitData, AgentData, AgentUpdate, SceneObjectData, TeleportFlags};
use crate::event::EventPayload;
use crate::ids::{AgentId, RegionId};
use crate::region::{RegionDescriptor, RegionHandle};

/// Body of `POST /agent/{agent_id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    /// Destination region X in meters.
    pub destination_x: i32,
    /// Destination region Y in meters.
    pub destination_y: i32,
    /// Destination region name.
    pub destination_name: String,
    /// Destination region identity.
    pub destination_uuid: RegionId,
    /// Why the agent is moving.
    pub teleport_flags: TeleportFlags,
    /// Circuit block for the arriving agent.
    pub circuit: AgentCircuitData,
    /// Full agent state, when already known.
    #[serde(default)]
    pub agent: Option<AgentData>,
}

impl CreateAgentRequest {
    /// Build the request body for a destination.
    pub fn new(
        destination: &RegionDescriptor,
        circuit: AgentCircuitData,
        teleport_flags: TeleportFlags,
        agent: Option<AgentData>,
    ) -> Self {
        Self {
            destination_x: destination.loc_x,
            destination_y: destination.loc_y,
            destination_name: destination.name.clone(),
            destination_uuid: destination.region_id,
            teleport_flags,
            circuit,
            agent,
        }
    }
}

/// Body of `PUT /agent/{agent_id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAgentRequest {
    /// Destination region X in meters.
    pub destination_x: i32,
    /// Destination region Y in meters.
    pub destination_y: i32,
    /// Destination region name.
    pub destination_name: String,
    /// Destination region identity.
    pub destination_uuid: RegionId,
    /// The update itself.
    pub update: AgentUpdate,
}

impl UpdateAgentRequest {
    /// Build the request body for a destination.
    pub fn new(destination: &RegionDescriptor, update: AgentUpdate) -> Self {
        Self {
            destination_x: destination.loc_x,
            destination_y: destination.loc_y,
            destination_name: destination.name.clone(),
            destination_uuid: destination.region_id,
            update,
        }
    }
}

/// Body of `POST /object/{object_id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateObjectRequest {
    /// Destination region identity.
    pub destination_uuid: RegionId,
    /// Destination region name.
    pub destination_name: String,
    /// The object being transferred.
    pub object: SceneObjectData,
}

/// Response to every hand-off call except retrieve.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandoffResponse {
    /// Whether the destination accepted the call.
    pub success: bool,
    /// Diagnostic message from the destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Structured result (a `CreatedAgentPayload` for create agent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl HandoffResponse {
    /// A bare success.
    pub const fn ok() -> Self {
        Self {
            success: true,
            reason: None,
            payload: None,
        }
    }

    /// A failure with a reason.
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            payload: None,
        }
    }
}

/// Response to `GET /agent/{agent_id}/{region_id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieveAgentResponse {
    /// Whether the agent was found.
    pub success: bool,
    /// The agent's state when found.
    #[serde(default)]
    pub agent: Option<AgentData>,
}

/// A batch of events for one agent in one region, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatchRequest {
    /// The agent whose viewer receives the events.
    pub agent_id: AgentId,
    /// The region the events belong to.
    pub region_handle: RegionHandle,
    /// Ordered, pre-serialized events.
    pub events: Vec<EventPayload>,
}

/// Acknowledgement of an [`EventBatchRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventBatchResponse {
    /// Whether the whole batch was accepted.
    pub success: bool,
}
