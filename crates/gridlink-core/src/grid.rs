//! Grid directory: where every region on the grid lives.
//!
//! The directory is owned by the grid, not by this process. Gridlink only
//! queries it, through [`GridDirectory`]. [`InMemoryGridDirectory`] serves
//! tests and single-process deployments; [`HttpGridDirectory`] talks to a
//! remote directory service over any [`Transport`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use gridlink_types::{RegionDescriptor, RegionId, ScopeId, ViewBounds};
use tokio::sync::RwLock;

use crate::transport::{Method, Transport, TransportError, TransportRequest, join_url};

/// Errors returned by a grid directory.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// The directory service could not be reached.
    #[error("grid directory transport error: {0}")]
    Transport(#[from] TransportError),

    /// The directory answered with an unexpected shape.
    #[error("grid directory returned an unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read access to the grid's region directory.
#[async_trait]
pub trait GridDirectory: Send + Sync {
    /// All regions in `scope` whose footprint intersects the inclusive box.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the directory cannot be queried.
    async fn get_region_range(
        &self,
        scope: ScopeId,
        bounds: ViewBounds,
    ) -> Result<Vec<RegionDescriptor>, GridError>;

    /// The region covering a world point, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the directory cannot be queried.
    async fn get_region_by_position(
        &self,
        scope: ScopeId,
        x: i32,
        y: i32,
    ) -> Result<Option<RegionDescriptor>, GridError>;

    /// A region by identity, if known.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the directory cannot be queried.
    async fn get_region_by_id(
        &self,
        scope: ScopeId,
        region_id: RegionId,
    ) -> Result<Option<RegionDescriptor>, GridError>;
}

/// A directory held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryGridDirectory {
    regions: RwLock<BTreeMap<RegionId, RegionDescriptor>>,
}

impl InMemoryGridDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding the given regions.
    pub fn with_regions(regions: impl IntoIterator<Item = RegionDescriptor>) -> Self {
        Self {
            regions: RwLock::new(
                regions
                    .into_iter()
                    .map(|region| (region.region_id, region))
                    .collect(),
            ),
        }
    }

    /// Add or replace a region.
    pub async fn insert(&self, region: RegionDescriptor) {
        self.regions.write().await.insert(region.region_id, region);
    }

    /// Remove a region, returning it if present.
    pub async fn remove(&self, region_id: RegionId) -> Option<RegionDescriptor> {
        self.regions.write().await.remove(&region_id)
    }

    /// Number of regions known.
    pub async fn len(&self) -> usize {
        self.regions.read().await.len()
    }

    /// Whether the directory is empty.
    pub async fn is_empty(&self) -> bool {
        self.regions.read().await.is_empty()
    }
}

#[async_trait]
impl GridDirectory for InMemoryGridDirectory {
    async fn get_region_range(
        &self,
        scope: ScopeId,
        bounds: ViewBounds,
    ) -> Result<Vec<RegionDescriptor>, GridError> {
        Ok(self
            .regions
            .read()
            .await
            .values()
            .filter(|region| region.scope_id == scope && region.intersects(&bounds))
            .cloned()
            .collect())
    }

    async fn get_region_by_position(
        &self,
        scope: ScopeId,
        x: i32,
        y: i32,
    ) -> Result<Option<RegionDescriptor>, GridError> {
        Ok(self
            .regions
            .read()
            .await
            .values()
            .find(|region| region.scope_id == scope && region.contains_point(x, y))
            .cloned())
    }

    async fn get_region_by_id(
        &self,
        scope: ScopeId,
        region_id: RegionId,
    ) -> Result<Option<RegionDescriptor>, GridError> {
        Ok(self
            .regions
            .read()
            .await
            .get(&region_id)
            .filter(|region| region.scope_id == scope)
            .cloned())
    }
}

/// A remote directory service reached over a [`Transport`].
///
/// | Query | Request |
/// |-------|---------|
/// | range | `GET {base}/regions/range?scope=..&min_x=..&max_x=..&min_y=..&max_y=..` |
/// | position | `GET {base}/regions/position?scope=..&x=..&y=..` |
/// | id | `GET {base}/regions/{id}?scope=..` |
///
/// Range answers are a JSON array; point lookups answer a descriptor or `null`.
#[derive(Clone)]
pub struct HttpGridDirectory {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl HttpGridDirectory {
    /// Create a client for the directory at `base_url`.
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, GridError> {
        let url = join_url(&self.base_url, path);
        Ok(self
            .transport
            .send(TransportRequest::new(Method::Get, url))
            .await?)
    }
}

impl std::fmt::Debug for HttpGridDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGridDirectory")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GridDirectory for HttpGridDirectory {
    async fn get_region_range(
        &self,
        scope: ScopeId,
        bounds: ViewBounds,
    ) -> Result<Vec<RegionDescriptor>, GridError> {
        let path = format!(
            "regions/range?scope={scope}&min_x={}&max_x={}&min_y={}&max_y={}",
            bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y
        );
        let value = self.get(&path).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn get_region_by_position(
        &self,
        scope: ScopeId,
        x: i32,
        y: i32,
    ) -> Result<Option<RegionDescriptor>, GridError> {
        let value = self
            .get(&format!("regions/position?scope={scope}&x={x}&y={y}"))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_region_by_id(
        &self,
        scope: ScopeId,
        region_id: RegionId,
    ) -> Result<Option<RegionDescriptor>, GridError> {
        let value = self
            .get(&format!("regions/{region_id}?scope={scope}"))
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}
