//! Axum router construction for the ingress server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// See the crate docs for the route table.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/agent/{agent_id}/",
            post(handlers::create_agent).put(handlers::update_agent),
        )
        .route(
            "/agent/{agent_id}/{region_id}/",
            get(handlers::retrieve_agent).delete(handlers::close_agent),
        )
        .route("/object/{object_id}/", post(handlers::create_object))
        .route("/neighbors/{region_id}", get(handlers::neighbors))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
