//! Region coordination core for Gridlink.
//!
//! This crate owns the pieces shared by every Gridlink service: how the
//! process is configured, how it talks HTTP, how it learns where other
//! regions are, which regions it hosts itself, and which regions each of
//! those can see.
//!
//! # Modules
//!
//! - [`clock`] -- Injectable wall clock ([`SystemClock`], [`ManualClock`]).
//! - [`config`] -- Configuration loading from `gridlink.yaml` into
//!   strongly-typed structs.
//! - [`dispatch`] -- Bounded fire-and-forget worker pool.
//! - [`grid`] -- [`GridDirectory`] trait with in-memory and HTTP backends.
//! - [`neighbors`] -- [`NeighborDirectory`]: neighbor computation, caching,
//!   and region up/down propagation.
//! - [`registry`] -- [`RegionRegistry`] of locally hosted regions and the
//!   [`SceneHost`] trait they implement.
//! - [`transport`] -- [`Transport`] trait and the `reqwest` implementation.
//!
//! [`SystemClock`]: clock::SystemClock
//! [`ManualClock`]: clock::ManualClock
//! [`GridDirectory`]: grid::GridDirectory
//! [`NeighborDirectory`]: neighbors::NeighborDirectory
//! [`RegionRegistry`]: registry::RegionRegistry
//! [`SceneHost`]: registry::SceneHost
//! [`Transport`]: transport::Transport

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod grid;
pub mod neighbors;
pub mod registry;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GridlinkConfig};
pub use dispatch::Dispatcher;
pub use grid::{GridDirectory, GridError, HttpGridDirectory, InMemoryGridDirectory};
pub use neighbors::NeighborDirectory;
pub use registry::{RegionRegistry, SceneHost};
pub use transport::{HttpTransport, Method, Transport, TransportError, TransportRequest};
