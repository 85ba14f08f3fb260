//! Hand-off ingress server for Gridlink.
//!
//! This crate provides the receiving side of region-to-region traffic: an
//! Axum HTTP server that accepts agents, agent updates, and objects for
//! the regions hosted by this process, and answers neighbor queries about
//! them. It also ships [`MemoryScene`], a self-contained [`SceneHost`]
//! used by the `gridlink-server` binary.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/agent/{agent_id}/` | Accept an arriving agent |
//! | `PUT` | `/agent/{agent_id}/` | Apply an agent update |
//! | `GET` | `/agent/{agent_id}/{region_id}/` | Return an agent's state |
//! | `DELETE` | `/agent/{agent_id}/{region_id}/` | Drop an agent |
//! | `POST` | `/object/{object_id}/` | Accept a scene object |
//! | `GET` | `/neighbors/{region_id}` | Neighbor set of a local region |
//! | `GET` | `/health` | Liveness |
//!
//! [`SceneHost`]: gridlink_core::SceneHost

pub mod error;
pub mod handlers;
pub mod router;
pub mod scene;
pub mod server;
pub mod state;

pub use router::build_router;
pub use scene::MemoryScene;
pub use server::{ServerError, serve, start_server};
pub use state::AppState;
