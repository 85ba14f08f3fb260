//! Ingress endpoint handlers.
//!
//! Every handler resolves the destination among the regions hosted here
//! and forwards to its [`SceneHost`](gridlink_core::SceneHost). A
//! destination that is not hosted here yields 404.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use gridlink_core::registry::LocalRegion;
use gridlink_types::{
    AgentId, CreateAgentRequest, CreateObjectRequest, HandoffResponse, ObjectId,
    RegionDescriptor, RegionId, RetrieveAgentResponse, UpdateAgentRequest,
};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

async fn local_region(state: &AppState, region_id: RegionId) -> Result<LocalRegion, ApiError> {
    state
        .registry
        .get(region_id)
        .await
        .ok_or(ApiError::UnknownRegion(region_id))
}

fn check_agent(path: AgentId, body: AgentId) -> Result<(), ApiError> {
    if path == body {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "path agent {path} does not match body agent {body}"
        )))
    }
}

// ---------------------------------------------------------------------------
// POST /agent/{agent_id}/
// ---------------------------------------------------------------------------

/// Accept an arriving agent into the destination region.
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<AgentId>,
    Json(request): Json<CreateAgentRequest>,
) -> Result<Json<HandoffResponse>, ApiError> {
    check_agent(agent_id, request.circuit.agent_id)?;
    let region = local_region(&state, request.destination_uuid).await?;

    let response = match region
        .host
        .accept_agent(request.circuit, request.teleport_flags, request.agent)
        .await
    {
        Ok(payload) => {
            info!(
                agent_id = %agent_id,
                region = %region.descriptor.name,
                "agent accepted"
            );
            HandoffResponse {
                payload: Some(serde_json::to_value(payload)?),
                ..HandoffResponse::ok()
            }
        }
        Err(reason) => {
            info!(
                agent_id = %agent_id,
                region = %region.descriptor.name,
                reason = %reason,
                "agent refused"
            );
            HandoffResponse::refused(reason)
        }
    };
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// PUT /agent/{agent_id}/
// ---------------------------------------------------------------------------

/// Apply a full or position-only agent update.
pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<AgentId>,
    Json(request): Json<UpdateAgentRequest>,
) -> Result<Json<HandoffResponse>, ApiError> {
    check_agent(agent_id, request.update.agent_id())?;
    let region = local_region(&state, request.destination_uuid).await?;

    if region.host.update_agent(request.update).await {
        Ok(Json(HandoffResponse::ok()))
    } else {
        debug!(agent_id = %agent_id, region = %region.descriptor.name, "update for absent agent");
        Ok(Json(HandoffResponse::refused("agent not present")))
    }
}

// ---------------------------------------------------------------------------
// GET /agent/{agent_id}/{region_id}/
// ---------------------------------------------------------------------------

/// Return an agent's state.
pub async fn retrieve_agent(
    State(state): State<Arc<AppState>>,
    Path((agent_id, region_id)): Path<(AgentId, RegionId)>,
) -> Result<Json<RetrieveAgentResponse>, ApiError> {
    let region = local_region(&state, region_id).await?;
    let agent = region.host.retrieve_agent(agent_id).await;
    Ok(Json(RetrieveAgentResponse {
        success: agent.is_some(),
        agent,
    }))
}

// ---------------------------------------------------------------------------
// DELETE /agent/{agent_id}/{region_id}/
// ---------------------------------------------------------------------------

/// Drop an agent from a region and discard its pending viewer events
/// there.
pub async fn close_agent(
    State(state): State<Arc<AppState>>,
    Path((agent_id, region_id)): Path<(AgentId, RegionId)>,
) -> Result<Json<HandoffResponse>, ApiError> {
    let region = local_region(&state, region_id).await?;
    let closed = region.host.close_agent(agent_id).await;
    state
        .events
        .disable_simulator(agent_id, region.descriptor.handle(), false)
        .await;

    if closed {
        info!(agent_id = %agent_id, region = %region.descriptor.name, "agent closed");
        Ok(Json(HandoffResponse::ok()))
    } else {
        Ok(Json(HandoffResponse::refused("agent not present")))
    }
}

// ---------------------------------------------------------------------------
// POST /object/{object_id}/
// ---------------------------------------------------------------------------

/// Accept a scene object into the destination region.
pub async fn create_object(
    State(state): State<Arc<AppState>>,
    Path(object_id): Path<ObjectId>,
    Json(request): Json<CreateObjectRequest>,
) -> Result<Json<HandoffResponse>, ApiError> {
    if request.object.object_id != object_id {
        return Err(ApiError::BadRequest(format!(
            "path object {object_id} does not match body object {}",
            request.object.object_id
        )));
    }
    let region = local_region(&state, request.destination_uuid).await?;

    if region.host.accept_object(request.object).await {
        Ok(Json(HandoffResponse::ok()))
    } else {
        Ok(Json(HandoffResponse::refused("object refused")))
    }
}

// ---------------------------------------------------------------------------
// GET /neighbors/{region_id}
// ---------------------------------------------------------------------------

/// The neighbor set of a local region.
pub async fn neighbors(
    State(state): State<Arc<AppState>>,
    Path(region_id): Path<RegionId>,
) -> Result<Json<Vec<RegionDescriptor>>, ApiError> {
    let region = local_region(&state, region_id).await?;
    Ok(Json(state.neighbors.neighbors(&region.descriptor).await))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness plus the number of hosted regions.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "regions": state.registry.len().await,
    }))
}
