//! Neighbor directory: which regions each hosted region can see.
//!
//! For every region the directory caches the set of other regions inside
//! its view box, as reported by the grid directory. When a region comes up
//! it tells the locally hosted regions that can see it, and when a region
//! goes down it tells the ones that knew it. Regions hosted by other
//! processes are told by their own host.
//!
//! # Locking
//!
//! The cache is one [`Mutex`] around the whole map. It is never held
//! across a grid directory call or a scene notification.

use std::collections::BTreeMap;
use std::sync::Arc;

use gridlink_types::{RegionDescriptor, RegionId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::NeighborConfig;
use crate::dispatch::Dispatcher;
use crate::grid::GridDirectory;
use crate::registry::RegionRegistry;

/// Neighbors of one region, keyed by ID so duplicates collapse.
type NeighborSet = BTreeMap<RegionId, RegionDescriptor>;

fn into_set(regions: Vec<RegionDescriptor>) -> NeighborSet {
    regions
        .into_iter()
        .map(|region| (region.region_id, region))
        .collect()
}

/// Result of one neighbor query. `complete` is false when the grid
/// directory did not answer and only local regions are included.
struct Lookup {
    found: NeighborSet,
    complete: bool,
}

impl Lookup {
    fn regions(&self) -> Vec<RegionDescriptor> {
        self.found.values().cloned().collect()
    }
}

/// Computes, caches, and propagates region neighbor sets.
pub struct NeighborDirectory {
    config: NeighborConfig,
    grid: Arc<dyn GridDirectory>,
    registry: Arc<RegionRegistry>,
    dispatcher: Dispatcher,
    known: Mutex<BTreeMap<RegionId, NeighborSet>>,
}

impl NeighborDirectory {
    /// Create a directory over the given grid and local registry.
    pub fn new(
        config: NeighborConfig,
        grid: Arc<dyn GridDirectory>,
        registry: Arc<RegionRegistry>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            config,
            grid,
            registry,
            dispatcher,
            known: Mutex::new(BTreeMap::new()),
        }
    }

    /// The region registry this directory notifies.
    pub const fn registry(&self) -> &Arc<RegionRegistry> {
        &self.registry
    }

    /// Query the grid for every region within the configured view of
    /// `region`, excluding the region itself.
    ///
    /// When co-hosted regions are not isolated, every locally hosted region
    /// is included as well. A grid directory failure yields only the local
    /// part of the answer.
    pub async fn compute_neighbors(&self, region: &RegionDescriptor) -> Vec<RegionDescriptor> {
        self.lookup(region).await.regions()
    }

    async fn lookup(&self, region: &RegionDescriptor) -> Lookup {
        let view_x = self.config.view_distance(region.size_x);
        let view_y = self.config.view_distance(region.size_y);
        self.query(region, view_x, view_y).await
    }

    async fn query(&self, region: &RegionDescriptor, view_x: i32, view_y: i32) -> Lookup {
        let bounds = region.view_bounds(view_x, view_y);
        let (mut found, complete) =
            match self.grid.get_region_range(region.scope_id, bounds).await {
                Ok(regions) => (into_set(regions), true),
                Err(e) => {
                    warn!(
                        region_id = %region.region_id,
                        error = %e,
                        "grid directory query failed, treating as no remote neighbors"
                    );
                    (NeighborSet::new(), false)
                }
            };

        if self.config.see_into_all_local_regions {
            for local in self.registry.local_descriptors().await {
                found.entry(local.region_id).or_insert(local);
            }
        }

        found.remove(&region.region_id);
        Lookup { found, complete }
    }

    /// Neighbors of `region`, from the cache or computed and cached.
    ///
    /// An answer degraded by a grid directory failure is returned but not
    /// cached, so the next call asks the grid again.
    pub async fn neighbors(&self, region: &RegionDescriptor) -> Vec<RegionDescriptor> {
        if let Some(cached) = self.cached_neighbors(region.region_id).await {
            return cached;
        }
        let lookup = self.lookup(region).await;
        if !lookup.complete {
            return lookup.regions();
        }
        let mut known = self.known.lock().await;
        known
            .entry(region.region_id)
            .or_insert(lookup.found)
            .values()
            .cloned()
            .collect()
    }

    /// Neighbors of `region` as seen by an agent with the given draw
    /// distance in meters.
    ///
    /// With variable sight enabled and a nonzero draw distance, the query
    /// radius is the draw distance capped at the configured maximum and the
    /// cache is bypassed. Otherwise this is [`neighbors`](Self::neighbors).
    pub async fn neighbors_with_draw_distance(
        &self,
        region: &RegionDescriptor,
        draw_distance: u32,
    ) -> Vec<RegionDescriptor> {
        let sight = &self.config.variable_sight;
        if !sight.enabled || draw_distance == 0 {
            return self.neighbors(region).await;
        }
        let radius = i32::try_from(draw_distance)
            .unwrap_or(i32::MAX)
            .min(sight.max_distance);
        debug!(
            region_id = %region.region_id,
            draw_distance,
            radius,
            "variable sight neighbor query"
        );
        self.query(region, radius, radius).await.regions()
    }

    /// The cached neighbor set of a region, if one exists.
    pub async fn cached_neighbors(&self, region_id: RegionId) -> Option<Vec<RegionDescriptor>> {
        self.known
            .lock()
            .await
            .get(&region_id)
            .map(|set| set.values().cloned().collect())
    }

    /// A region came up: cache its neighbors and tell every locally hosted
    /// region that can see it.
    ///
    /// Returns the locally hosted regions that were informed.
    pub async fn region_came_up(&self, region: &RegionDescriptor) -> Vec<RegionDescriptor> {
        let lookup = self.lookup(region).await;
        let neighbors = lookup.regions();
        if lookup.complete {
            self.known.lock().await.insert(region.region_id, lookup.found);
        }

        let mut informed = Vec::new();
        let mut hosted_elsewhere = 0_usize;
        for neighbor in &neighbors {
            let Some(local) = self.registry.get(neighbor.region_id).await else {
                hosted_elsewhere = hosted_elsewhere.saturating_add(1);
                continue;
            };

            // View boxes scale with region size, so visibility is not
            // symmetric for regions of different sizes.
            let their_view = local.descriptor.view_bounds(
                self.config.view_distance(local.descriptor.size_x),
                self.config.view_distance(local.descriptor.size_y),
            );
            if !region.intersects(&their_view) && !self.config.see_into_all_local_regions {
                continue;
            }

            self.add_known_neighbor(&local.descriptor, region).await;
            local.host.on_region_up(region);
            informed.push(local.descriptor);
        }

        info!(
            region_id = %region.region_id,
            name = %region.name,
            neighbors = neighbors.len(),
            informed = informed.len(),
            "region came up"
        );
        if hosted_elsewhere > 0 {
            debug!(
                region_id = %region.region_id,
                count = hosted_elsewhere,
                "neighbors hosted by other processes are informed by their own host"
            );
        }
        informed
    }

    /// Make sure `neighbor` is in `local`'s cached set, computing the set
    /// first when `local` has none yet.
    async fn add_known_neighbor(&self, local: &RegionDescriptor, neighbor: &RegionDescriptor) {
        {
            let mut known = self.known.lock().await;
            if let Some(set) = known.get_mut(&local.region_id) {
                set.insert(neighbor.region_id, neighbor.clone());
                return;
            }
        }
        let lookup = self.lookup(local).await;
        if !lookup.complete {
            debug!(
                region_id = %local.region_id,
                "neighbor set left uncached until the grid directory answers"
            );
            return;
        }
        self.known
            .lock()
            .await
            .entry(local.region_id)
            .or_insert(lookup.found)
            .insert(neighbor.region_id, neighbor.clone());
    }

    /// A region went down: drop its cached neighbors and tell every
    /// locally hosted (or formerly hosted) region that knew it.
    ///
    /// Closing notifications run in the background. Returns the regions
    /// that were informed, each at most once.
    pub async fn region_went_down(&self, region: &RegionDescriptor) -> Vec<RegionDescriptor> {
        let cached = {
            let mut known = self.known.lock().await;
            let cached = known.remove(&region.region_id);
            for set in known.values_mut() {
                set.remove(&region.region_id);
            }
            cached
        };
        let neighbors = match cached {
            Some(set) => set.into_values().collect(),
            None => self.compute_neighbors(region).await,
        };

        let mut informed = Vec::new();
        for neighbor in neighbors {
            let target = match self.registry.get(neighbor.region_id).await {
                Some(local) => local,
                None => match self.registry.take_former(neighbor.region_id).await {
                    Some(former) => former,
                    None => continue,
                },
            };

            let host = Arc::clone(&target.host);
            let closing = region.clone();
            self.dispatcher.spawn("closing-neighbor", async move {
                host.on_region_down(&closing);
            });
            informed.push(target.descriptor);
        }

        info!(
            region_id = %region.region_id,
            name = %region.name,
            informed = informed.len(),
            "region went down"
        );
        informed
    }

    /// Whether moving between two world positions leaves the view range.
    ///
    /// True when either axis moves further than the view distance, unless
    /// co-hosted regions see each other and the destination is hosted here.
    pub async fn is_outside_view(&self, old_x: i32, new_x: i32, old_y: i32, new_y: i32) -> bool {
        if self.config.see_into_all_local_regions
            && self.registry.find_by_position(new_x, new_y).await.is_some()
        {
            return false;
        }
        let threshold = u32::try_from(self.config.view_distance(self.config.default_region_size))
            .unwrap_or(0);
        old_x.abs_diff(new_x) > threshold || old_y.abs_diff(new_y) > threshold
    }
}

impl std::fmt::Debug for NeighborDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborDirectory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
