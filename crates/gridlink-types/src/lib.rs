//! Shared type definitions for Gridlink.
//!
//! This crate is the single source of truth for the data that crosses crate
//! and process boundaries: region descriptors, agent hand-off payloads,
//! queued viewer events, and the JSON wire shapes exchanged between region
//! servers.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for regions, agents, scopes, objects
//! - [`region`] -- Region descriptors, handles, and view bounding boxes
//! - [`agent`] -- Circuit data, agent state, and scene object transfer data
//! - [`event`] -- Opaque pre-serialized event queue payloads
//! - [`wire`] -- Request/response bodies for the hand-off and event protocols

pub mod agent;
pub mod event;
pub mod ids;
pub mod region;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use agent::{
    AgentCircuitData, AgentData, AgentPosition, AgentUpdate, CreatedAgentPayload,
    SceneObjectData, TeleportFlags, Vector3,
};
pub use event::{DISABLE_SIMULATOR, EventPayload};
pub use ids::{AgentId, ObjectId, RegionId, ScopeId, SessionId};
pub use region::{RegionDescriptor, RegionHandle, ViewBounds};
pub use wire::{
    CreateAgentRequest, CreateObjectRequest, EventBatchRequest, EventBatchResponse,
    HandoffResponse, RetrieveAgentResponse, UpdateAgentRequest,
};
