//! Regions hosted by this process.
//!
//! The [`RegionRegistry`] is where the host simulator registers each scene
//! it runs, together with the [`SceneHost`] callbacks Gridlink uses to
//! reach into that scene: neighbor notifications and the in-process side of
//! agent and object hand-off.
//!
//! A region that stops being hosted is remembered as a *former* region
//! until its closure has been reported once, so neighbors that went down
//! afterwards can still tell it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use gridlink_types::{
    AgentCircuitData, AgentData, AgentId, AgentUpdate, CreatedAgentPayload, RegionDescriptor,
    RegionHandle, RegionId, SceneObjectData, TeleportFlags,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A scene running in this process.
///
/// Notification methods are synchronous and must not block; they are the
/// host's cue to update caches and avatar visibility. Hand-off methods are
/// the local fast path of the hand-off client and the target of the HTTP
/// ingress.
#[async_trait]
pub trait SceneHost: Send + Sync {
    /// A neighbor region came up within view.
    fn on_region_up(&self, neighbor: &RegionDescriptor);

    /// A neighbor region went down.
    fn on_region_down(&self, neighbor: &RegionDescriptor);

    /// Admit an arriving agent.
    ///
    /// # Errors
    ///
    /// Returns the refusal reason when the scene will not take the agent.
    async fn accept_agent(
        &self,
        circuit: AgentCircuitData,
        teleport_flags: TeleportFlags,
        agent: Option<AgentData>,
    ) -> Result<CreatedAgentPayload, String>;

    /// Apply an agent update. Returns whether the scene knew the agent.
    async fn update_agent(&self, update: AgentUpdate) -> bool;

    /// Current state of an agent, if present.
    async fn retrieve_agent(&self, agent_id: AgentId) -> Option<AgentData>;

    /// Drop an agent. Returns whether the agent was present.
    async fn close_agent(&self, agent_id: AgentId) -> bool;

    /// Rez an object crossing into the scene.
    async fn accept_object(&self, object: SceneObjectData) -> bool;
}

/// A registered region and its scene.
#[derive(Clone)]
pub struct LocalRegion {
    /// Where the region is.
    pub descriptor: RegionDescriptor,
    /// The scene behind it.
    pub host: Arc<dyn SceneHost>,
}

impl std::fmt::Debug for LocalRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRegion")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Regions {
    active: BTreeMap<RegionId, LocalRegion>,
    former: BTreeMap<RegionId, LocalRegion>,
}

/// Locally hosted regions, current and former.
#[derive(Default)]
pub struct RegionRegistry {
    regions: RwLock<Regions>,
}

impl RegionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start hosting a region. Replaces any previous registration of the
    /// same ID and forgets it as a former region.
    pub async fn register(&self, descriptor: RegionDescriptor, host: Arc<dyn SceneHost>) {
        let region_id = descriptor.region_id;
        info!(
            region_id = %region_id,
            name = descriptor.name,
            loc_x = descriptor.loc_x,
            loc_y = descriptor.loc_y,
            "region registered"
        );
        let mut regions = self.regions.write().await;
        regions.former.remove(&region_id);
        regions
            .active
            .insert(region_id, LocalRegion { descriptor, host });
    }

    /// Stop hosting a region. It is kept as a former region.
    pub async fn unregister(&self, region_id: RegionId) -> Option<RegionDescriptor> {
        let mut regions = self.regions.write().await;
        let removed = regions.active.remove(&region_id)?;
        let descriptor = removed.descriptor.clone();
        regions.former.insert(region_id, removed);
        info!(region_id = %region_id, "region unregistered");
        Some(descriptor)
    }

    /// A hosted region by ID.
    pub async fn get(&self, region_id: RegionId) -> Option<LocalRegion> {
        self.regions.read().await.active.get(&region_id).cloned()
    }

    /// Whether a region is hosted here.
    pub async fn is_local(&self, region_id: RegionId) -> bool {
        self.regions.read().await.active.contains_key(&region_id)
    }

    /// A hosted region by packed handle.
    pub async fn find_by_handle(&self, handle: RegionHandle) -> Option<LocalRegion> {
        self.regions
            .read()
            .await
            .active
            .values()
            .find(|region| region.descriptor.handle() == handle)
            .cloned()
    }

    /// The hosted region covering a world point.
    pub async fn find_by_position(&self, x: i32, y: i32) -> Option<LocalRegion> {
        self.regions
            .read()
            .await
            .active
            .values()
            .find(|region| region.descriptor.contains_point(x, y))
            .cloned()
    }

    /// Descriptors of every hosted region.
    pub async fn local_descriptors(&self) -> Vec<RegionDescriptor> {
        self.regions
            .read()
            .await
            .active
            .values()
            .map(|region| region.descriptor.clone())
            .collect()
    }

    /// Every hosted region.
    pub async fn local_regions(&self) -> Vec<LocalRegion> {
        self.regions.read().await.active.values().cloned().collect()
    }

    /// Take a former region so its closure is reported exactly once.
    pub async fn take_former(&self, region_id: RegionId) -> Option<LocalRegion> {
        let taken = self.regions.write().await.former.remove(&region_id);
        if taken.is_some() {
            debug!(region_id = %region_id, "former region claimed");
        }
        taken
    }

    /// Forget a former region without reporting it.
    pub async fn forget_former(&self, region_id: RegionId) -> bool {
        self.regions
            .write()
            .await
            .former
            .remove(&region_id)
            .is_some()
    }

    /// Number of hosted regions.
    pub async fn len(&self) -> usize {
        self.regions.read().await.active.len()
    }

    /// Whether no region is hosted.
    pub async fn is_empty(&self) -> bool {
        self.regions.read().await.active.is_empty()
    }
}

impl std::fmt::Debug for RegionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use gridlink_types::ScopeId;

    use super::*;

    /// Scene double recording neighbor notifications.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingScene {
        pub(crate) up: Mutex<Vec<RegionId>>,
        pub(crate) down: Mutex<Vec<RegionId>>,
    }

    impl RecordingScene {
        pub(crate) fn ups(&self) -> Vec<RegionId> {
            self.up
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }

        pub(crate) fn downs(&self) -> Vec<RegionId> {
            self.down
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl SceneHost for RecordingScene {
        fn on_region_up(&self, neighbor: &RegionDescriptor) {
            self.up
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(neighbor.region_id);
        }

        fn on_region_down(&self, neighbor: &RegionDescriptor) {
            self.down
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(neighbor.region_id);
        }

        async fn accept_agent(
            &self,
            circuit: AgentCircuitData,
            _teleport_flags: TeleportFlags,
            _agent: Option<AgentData>,
        ) -> Result<CreatedAgentPayload, String> {
            Ok(CreatedAgentPayload {
                agent_id: circuit.agent_id,
                udp_port: 9000,
                caps_urls: BTreeMap::new(),
            })
        }

        async fn update_agent(&self, _update: AgentUpdate) -> bool {
            true
        }

        async fn retrieve_agent(&self, _agent_id: AgentId) -> Option<AgentData> {
            None
        }

        async fn close_agent(&self, _agent_id: AgentId) -> bool {
            true
        }

        async fn accept_object(&self, _object: SceneObjectData) -> bool {
            true
        }
    }

    pub(crate) fn region(x: i32, y: i32, size: i32) -> RegionDescriptor {
        RegionDescriptor {
            region_id: RegionId::new(),
            name: format!("r{x}_{y}"),
            loc_x: x,
            loc_y: y,
            size_x: size,
            size_y: size,
            scope_id: ScopeId::nil(),
            server_uri: "http://sim-a:9000".to_owned(),
        }
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = RegionRegistry::new();
        let r = region(256, 512, 256);
        registry
            .register(r.clone(), Arc::new(RecordingScene::default()))
            .await;

        assert!(registry.is_local(r.region_id).await);
        assert_eq!(registry.len().await, 1);
        let by_handle = registry.find_by_handle(r.handle()).await;
        assert_eq!(by_handle.map(|l| l.descriptor.region_id), Some(r.region_id));
        let by_pos = registry.find_by_position(300, 600).await;
        assert_eq!(by_pos.map(|l| l.descriptor.region_id), Some(r.region_id));
        assert!(registry.find_by_position(600, 600).await.is_none());
    }

    #[tokio::test]
    async fn unregistered_region_is_former_until_taken() {
        let registry = RegionRegistry::new();
        let r = region(0, 0, 256);
        registry
            .register(r.clone(), Arc::new(RecordingScene::default()))
            .await;

        assert_eq!(registry.unregister(r.region_id).await, Some(r.clone()));
        assert!(registry.is_empty().await);
        assert!(registry.take_former(r.region_id).await.is_some());
        assert!(registry.take_former(r.region_id).await.is_none());
    }

    #[tokio::test]
    async fn reregistering_clears_former_entry() {
        let registry = RegionRegistry::new();
        let r = region(0, 0, 256);
        let scene: Arc<dyn SceneHost> = Arc::new(RecordingScene::default());
        registry.register(r.clone(), Arc::clone(&scene)).await;
        registry.unregister(r.region_id).await;
        registry.register(r.clone(), scene).await;

        assert!(!registry.forget_former(r.region_id).await);
        assert!(registry.is_local(r.region_id).await);
    }
}
