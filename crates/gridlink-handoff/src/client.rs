//! The hand-off client.
//!
//! Remote endpoints, relative to the destination's `server_uri`:
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | [`create_agent`](SimulationClient::create_agent) | `POST` | `agent/{agent_id}/` |
//! | [`update_agent`](SimulationClient::update_agent) | `PUT` | `agent/{agent_id}/` |
//! | [`retrieve_agent`](SimulationClient::retrieve_agent) | `GET` | `agent/{agent_id}/{region_id}/` |
//! | [`close_agent`](SimulationClient::close_agent) | `DELETE` | `agent/{agent_id}/{region_id}/` |
//! | [`create_object`](SimulationClient::create_object) | `POST` | `object/{object_id}/` |

use std::sync::Arc;

use gridlink_core::config::HandoffConfig;
use gridlink_core::registry::LocalRegion;
use gridlink_core::transport::join_url;
use gridlink_core::{
    Clock, Dispatcher, Method, RegionRegistry, Transport, TransportRequest,
};
use gridlink_types::{
    AgentCircuitData, AgentData, AgentId, AgentUpdate, CreateAgentRequest, CreateObjectRequest,
    CreatedAgentPayload, HandoffResponse, RegionDescriptor, RetrieveAgentResponse,
    SceneObjectData, TeleportFlags, UpdateAgentRequest,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::blacklist::EndpointBlacklist;
use crate::error::HandoffError;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of [`SimulationClient::create_agent`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateAgentOutcome {
    /// Whether the destination accepted the agent.
    pub success: bool,
    /// Diagnostic reason on failure.
    pub reason: Option<String>,
    /// What the destination granted the agent, on success.
    pub payload: Option<CreatedAgentPayload>,
}

impl CreateAgentOutcome {
    const fn accepted(payload: CreatedAgentPayload) -> Self {
        Self {
            success: true,
            reason: None,
            payload: Some(payload),
        }
    }

    const fn failed(reason: String) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            payload: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Transfers agents and objects to other regions, local or remote.
pub struct SimulationClient {
    config: HandoffConfig,
    registry: Arc<RegionRegistry>,
    transport: Arc<dyn Transport>,
    blacklist: EndpointBlacklist,
    dispatcher: Dispatcher,
}

impl SimulationClient {
    /// Create a client. The clock drives blacklist expiry.
    pub fn new(
        config: HandoffConfig,
        registry: Arc<RegionRegistry>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        dispatcher: Dispatcher,
    ) -> Self {
        let blacklist = EndpointBlacklist::new(clock, config.blacklist_cooldown());
        Self {
            config,
            registry,
            transport,
            blacklist,
            dispatcher,
        }
    }

    /// The endpoint blacklist used by [`update_agent`](Self::update_agent).
    pub const fn blacklist(&self) -> &EndpointBlacklist {
        &self.blacklist
    }

    async fn local(&self, destination: &RegionDescriptor) -> Option<LocalRegion> {
        self.registry.find_by_handle(destination.handle()).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: TransportRequest,
    ) -> Result<T, HandoffError> {
        let request = request.with_timeout(self.config.request_timeout());
        let value = self.transport.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn call_handoff(&self, request: TransportRequest) -> Result<HandoffResponse, HandoffError> {
        let response: HandoffResponse = self.call(request).await?;
        if response.success {
            Ok(response)
        } else {
            Err(HandoffError::Refused {
                reason: response.reason.unwrap_or_default(),
            })
        }
    }

    // -- create agent --------------------------------------------------------

    /// Ask `destination` to accept an arriving agent.
    ///
    /// Succeeds only when the destination says so and its payload parses
    /// as a [`CreatedAgentPayload`]. The destination's reason is carried in
    /// the outcome on refusal.
    pub async fn create_agent(
        &self,
        destination: &RegionDescriptor,
        circuit: AgentCircuitData,
        teleport_flags: TeleportFlags,
        agent: Option<AgentData>,
    ) -> CreateAgentOutcome {
        let agent_id = circuit.agent_id;
        let result = match self.local(destination).await {
            Some(local) => local
                .host
                .accept_agent(circuit, teleport_flags, agent)
                .await
                .map_err(|reason| HandoffError::Refused { reason }),
            None => {
                self.remote_create_agent(destination, circuit, teleport_flags, agent)
                    .await
            }
        };

        match result {
            Ok(payload) => {
                debug!(
                    agent_id = %agent_id,
                    destination = %destination.name,
                    udp_port = payload.udp_port,
                    "agent accepted"
                );
                CreateAgentOutcome::accepted(payload)
            }
            Err(e) => {
                warn!(
                    agent_id = %agent_id,
                    destination = %destination.name,
                    error = %e,
                    "create agent failed"
                );
                CreateAgentOutcome::failed(e.into_reason())
            }
        }
    }

    async fn remote_create_agent(
        &self,
        destination: &RegionDescriptor,
        circuit: AgentCircuitData,
        teleport_flags: TeleportFlags,
        agent: Option<AgentData>,
    ) -> Result<CreatedAgentPayload, HandoffError> {
        let url = join_url(
            &destination.server_uri,
            &format!("agent/{}/", circuit.agent_id),
        );
        let body = serde_json::to_value(CreateAgentRequest::new(
            destination,
            circuit,
            teleport_flags,
            agent,
        ))?;
        let response = self
            .call_handoff(TransportRequest::new(Method::Post, url).with_body(body))
            .await?;
        let payload = response.payload.ok_or(HandoffError::MissingPayload)?;
        Ok(serde_json::from_value(payload)?)
    }

    // -- update agent --------------------------------------------------------

    /// Push an agent update to `destination`.
    ///
    /// A destination whose endpoint failed at the transport level within
    /// the cool-down is skipped without a network call.
    pub async fn update_agent(&self, destination: &RegionDescriptor, update: AgentUpdate) -> bool {
        if let Some(local) = self.local(destination).await {
            return local.host.update_agent(update).await;
        }

        let endpoint = destination.server_uri.as_str();
        let agent_id = update.agent_id();
        if let Some(until) = self.blacklist.blocked_until(endpoint).await {
            let skipped = HandoffError::Blacklisted {
                endpoint: endpoint.to_owned(),
                until,
            };
            debug!(agent_id = %agent_id, error = %skipped, "update agent skipped");
            return false;
        }

        let url = join_url(endpoint, &format!("agent/{agent_id}/"));
        let result = match serde_json::to_value(UpdateAgentRequest::new(destination, update)) {
            Ok(body) => self
                .call_handoff(TransportRequest::new(Method::Put, url).with_body(body))
                .await
                .map(|_| ()),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => {
                if self.blacklist.clear(endpoint).await {
                    debug!(endpoint, "endpoint recovered, blacklist entry cleared");
                }
                true
            }
            Err(e) if e.is_transport() => {
                let until = self.blacklist.block(endpoint).await;
                warn!(
                    agent_id = %agent_id,
                    endpoint,
                    until = %until,
                    error = %e,
                    "update agent failed, endpoint blacklisted"
                );
                false
            }
            Err(e) => {
                warn!(agent_id = %agent_id, endpoint, error = %e, "update agent failed");
                false
            }
        }
    }

    // -- retrieve agent ------------------------------------------------------

    /// Fetch an agent's state back from `destination`.
    pub async fn retrieve_agent(
        &self,
        destination: &RegionDescriptor,
        agent_id: AgentId,
    ) -> Option<AgentData> {
        if let Some(local) = self.local(destination).await {
            return local.host.retrieve_agent(agent_id).await;
        }

        let url = join_url(
            &destination.server_uri,
            &format!("agent/{agent_id}/{}/", destination.region_id),
        );
        match self
            .call::<RetrieveAgentResponse>(TransportRequest::new(Method::Get, url))
            .await
        {
            Ok(RetrieveAgentResponse {
                success: true,
                agent,
            }) => agent,
            Ok(_) => {
                debug!(agent_id = %agent_id, destination = %destination.name, "agent not found");
                None
            }
            Err(e) => {
                warn!(
                    agent_id = %agent_id,
                    destination = %destination.name,
                    error = %e,
                    "retrieve agent failed"
                );
                None
            }
        }
    }

    // -- close agent ---------------------------------------------------------

    /// Tell `destination` to drop an agent.
    ///
    /// The remote call runs in the background and this returns `true` as
    /// soon as it is dispatched; its real outcome is only logged.
    pub async fn close_agent(&self, destination: &RegionDescriptor, agent_id: AgentId) -> bool {
        if let Some(local) = self.local(destination).await {
            return local.host.close_agent(agent_id).await;
        }

        let url = join_url(
            &destination.server_uri,
            &format!("agent/{agent_id}/{}/", destination.region_id),
        );
        let request =
            TransportRequest::new(Method::Delete, url).with_timeout(Some(self.config.close_timeout()));
        let transport = Arc::clone(&self.transport);
        let region_id = destination.region_id;
        self.dispatcher.spawn("close-agent", async move {
            match transport.send(request).await {
                Ok(value) if value.get("success") == Some(&serde_json::Value::Bool(false)) => {
                    warn!(agent_id = %agent_id, region_id = %region_id, "remote close refused");
                }
                Ok(_) => debug!(agent_id = %agent_id, region_id = %region_id, "remote close done"),
                Err(e) => {
                    warn!(agent_id = %agent_id, region_id = %region_id, error = %e, "remote close failed");
                }
            }
        });
        true
    }

    // -- create object -------------------------------------------------------

    /// Transfer a scene object into `destination`.
    pub async fn create_object(&self, destination: &RegionDescriptor, object: SceneObjectData) -> bool {
        if let Some(local) = self.local(destination).await {
            return local.host.accept_object(object).await;
        }

        let object_id = object.object_id;
        let url = join_url(&destination.server_uri, &format!("object/{object_id}/"));
        let request = CreateObjectRequest {
            destination_uuid: destination.region_id,
            destination_name: destination.name.clone(),
            object,
        };
        let result = match serde_json::to_value(request) {
            Ok(body) => self
                .call_handoff(TransportRequest::new(Method::Post, url).with_body(body))
                .await
                .map(|_| ()),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    object_id = %object_id,
                    destination = %destination.name,
                    error = %e,
                    "create object failed"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for SimulationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationClient")
            .field("config", &self.config)
            .field("blacklist", &self.blacklist)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use gridlink_core::{ManualClock, SceneHost, TransportError};
    use gridlink_types::{AgentPosition, ObjectId, RegionId, ScopeId, SessionId, Vector3};
    use serde_json::{Value, json};

    use super::*;

    // -- doubles -------------------------------------------------------------

    #[derive(Default)]
    struct ScriptedTransport {
        requests: Mutex<Vec<TransportRequest>>,
        replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    }

    impl ScriptedTransport {
        fn reply(&self, reply: Result<Value, TransportError>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        fn requests(&self) -> Vec<TransportRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: TransportRequest) -> Result<Value, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({ "success": true })))
        }
    }

    #[derive(Default)]
    struct LocalScene {
        accepted: Mutex<Vec<AgentId>>,
        closed: Mutex<Vec<AgentId>>,
    }

    #[async_trait]
    impl SceneHost for LocalScene {
        fn on_region_up(&self, _neighbor: &RegionDescriptor) {}

        fn on_region_down(&self, _neighbor: &RegionDescriptor) {}

        async fn accept_agent(
            &self,
            circuit: AgentCircuitData,
            _teleport_flags: TeleportFlags,
            _agent: Option<AgentData>,
        ) -> Result<CreatedAgentPayload, String> {
            self.accepted.lock().unwrap().push(circuit.agent_id);
            Ok(CreatedAgentPayload {
                agent_id: circuit.agent_id,
                udp_port: 9001,
                caps_urls: BTreeMap::new(),
            })
        }

        async fn update_agent(&self, _update: AgentUpdate) -> bool {
            true
        }

        async fn retrieve_agent(&self, _agent_id: AgentId) -> Option<AgentData> {
            None
        }

        async fn close_agent(&self, agent_id: AgentId) -> bool {
            self.closed.lock().unwrap().push(agent_id);
            true
        }

        async fn accept_object(&self, _object: SceneObjectData) -> bool {
            true
        }
    }

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        clock: Arc<ManualClock>,
        registry: Arc<RegionRegistry>,
        dispatcher: Dispatcher,
        client: SimulationClient,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(ScriptedTransport::default());
        let clock = Arc::new(ManualClock::default());
        let registry = Arc::new(RegionRegistry::new());
        let dispatcher = Dispatcher::new(2);
        let client = SimulationClient::new(
            HandoffConfig::default(),
            Arc::clone(&registry),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            dispatcher.clone(),
        );
        Fixture {
            transport,
            clock,
            registry,
            dispatcher,
            client,
        }
    }

    fn destination(x: i32) -> RegionDescriptor {
        RegionDescriptor {
            region_id: RegionId::new(),
            name: format!("dest-{x}"),
            loc_x: x,
            loc_y: 0,
            size_x: 256,
            size_y: 256,
            scope_id: ScopeId::nil(),
            server_uri: "http://dest:9000/".to_owned(),
        }
    }

    fn circuit() -> AgentCircuitData {
        AgentCircuitData {
            agent_id: AgentId::new(),
            session_id: SessionId::new(),
            circuit_code: 7,
            first_name: "Ada".to_owned(),
            last_name: "Resident".to_owned(),
            start_position: Vector3::new(128.0, 128.0, 22.0),
            child: true,
            caps_path: "seed-0001".to_owned(),
            service_urls: BTreeMap::new(),
        }
    }

    fn position_update(agent_id: AgentId) -> AgentUpdate {
        AgentUpdate::AgentPosition(AgentPosition {
            agent_id,
            session_id: SessionId::new(),
            position: Vector3::new(10.0, 20.0, 30.0),
            velocity: Vector3::default(),
            draw_distance: 64.0,
        })
    }

    fn unreachable() -> TransportError {
        TransportError::Unreachable {
            url: "http://dest:9000/agent/x/".to_owned(),
            message: "connection refused".to_owned(),
        }
    }

    // -- create --------------------------------------------------------------

    #[tokio::test]
    async fn create_agent_prefers_local_region() {
        let fx = fixture();
        let dest = destination(0);
        let scene = Arc::new(LocalScene::default());
        fx.registry
            .register(dest.clone(), Arc::clone(&scene) as Arc<dyn SceneHost>)
            .await;
        let circuit = circuit();
        let agent_id = circuit.agent_id;

        let outcome = fx
            .client
            .create_agent(&dest, circuit, TeleportFlags::VIA_LOCATION, None)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.payload.unwrap().udp_port, 9001);
        assert_eq!(*scene.accepted.lock().unwrap(), vec![agent_id]);
        assert!(fx.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn create_agent_posts_to_remote_destination() {
        let fx = fixture();
        let dest = destination(512);
        let circuit = circuit();
        let agent_id = circuit.agent_id;
        fx.transport.reply(Ok(json!({
            "success": true,
            "payload": { "agent_id": agent_id, "udp_port": 9010 },
        })));

        let outcome = fx
            .client
            .create_agent(&dest, circuit, TeleportFlags::VIA_LOGIN, None)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.payload.unwrap().udp_port, 9010);
        let requests = fx.transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, format!("http://dest:9000/agent/{agent_id}/"));
        let body = request.body.clone().unwrap();
        assert_eq!(body["destination_uuid"], json!(dest.region_id));
        assert_eq!(body["destination_x"], 512);
        assert_eq!(body["circuit"]["circuit_code"], 7);
    }

    #[tokio::test]
    async fn create_agent_with_unparseable_payload_fails() {
        let fx = fixture();
        fx.transport.reply(Ok(json!({
            "success": true,
            "payload": { "udp_port": "not a port" },
        })));

        let outcome = fx
            .client
            .create_agent(&destination(512), circuit(), TeleportFlags::DEFAULT, None)
            .await;

        assert!(!outcome.success);
        assert!(outcome.payload.is_none());
        assert!(outcome.reason.is_some());
    }

    #[tokio::test]
    async fn create_agent_without_payload_fails() {
        let fx = fixture();
        fx.transport.reply(Ok(json!({ "success": true })));

        let outcome = fx
            .client
            .create_agent(&destination(512), circuit(), TeleportFlags::DEFAULT, None)
            .await;

        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn create_agent_propagates_remote_reason() {
        let fx = fixture();
        fx.transport
            .reply(Ok(json!({ "success": false, "reason": "banned from region" })));

        let outcome = fx
            .client
            .create_agent(&destination(512), circuit(), TeleportFlags::DEFAULT, None)
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.reason.as_deref(), Some("banned from region"));
    }

    #[tokio::test]
    async fn create_agent_transport_failure_is_reported_not_raised() {
        let fx = fixture();
        fx.transport.reply(Err(unreachable()));

        let outcome = fx
            .client
            .create_agent(&destination(512), circuit(), TeleportFlags::DEFAULT, None)
            .await;

        assert!(!outcome.success);
        assert!(outcome.reason.unwrap().contains("connection refused"));
    }

    // -- update --------------------------------------------------------------

    #[tokio::test]
    async fn failed_update_blacklists_endpoint_for_cooldown() {
        let fx = fixture();
        let dest = destination(512);
        let agent_id = AgentId::new();
        fx.transport.reply(Err(unreachable()));

        assert!(!fx.client.update_agent(&dest, position_update(agent_id)).await);
        assert_eq!(fx.transport.requests().len(), 1);

        // Within the window: no network call at all.
        fx.clock.advance(Duration::from_secs(30));
        assert!(!fx.client.update_agent(&dest, position_update(agent_id)).await);
        assert_eq!(fx.transport.requests().len(), 1);

        // After the window the endpoint is tried again, and success clears it.
        fx.clock.advance(Duration::from_secs(31));
        assert!(fx.client.update_agent(&dest, position_update(agent_id)).await);
        let requests = fx.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::Put);
        assert_eq!(requests[1].url, format!("http://dest:9000/agent/{agent_id}/"));
        assert!(fx.client.blacklist().is_empty().await);
    }

    #[tokio::test]
    async fn refused_update_does_not_blacklist() {
        let fx = fixture();
        let dest = destination(512);
        fx.transport
            .reply(Ok(json!({ "success": false, "reason": "unknown agent" })));

        assert!(!fx.client.update_agent(&dest, position_update(AgentId::new())).await);
        assert!(fx.client.update_agent(&dest, position_update(AgentId::new())).await);
        assert_eq!(fx.transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn update_body_carries_tagged_update() {
        let fx = fixture();
        let dest = destination(512);
        assert!(fx.client.update_agent(&dest, position_update(AgentId::new())).await);

        let body = fx.transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["update"]["message_type"], "AgentPosition");
        assert_eq!(body["destination_name"], "dest-512");
    }

    // -- retrieve / close / object ---------------------------------------------

    #[tokio::test]
    async fn retrieve_agent_gets_from_remote() {
        let fx = fixture();
        let dest = destination(512);
        let agent_id = AgentId::new();
        let agent = AgentData {
            agent_id,
            session_id: SessionId::new(),
            region_id: dest.region_id,
            position: Vector3::new(1.0, 2.0, 3.0),
            velocity: Vector3::default(),
            draw_distance: 128.0,
            control_flags: 0,
            god_level: 0,
            attachments: vec![ObjectId::new()],
            appearance: None,
        };
        fx.transport
            .reply(Ok(json!({ "success": true, "agent": agent.clone() })));

        let fetched = fx.client.retrieve_agent(&dest, agent_id).await;

        assert_eq!(fetched, Some(agent));
        let request = &fx.transport.requests()[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.url,
            format!("http://dest:9000/agent/{agent_id}/{}/", dest.region_id)
        );
    }

    #[tokio::test]
    async fn retrieve_agent_failure_is_none() {
        let fx = fixture();
        fx.transport.reply(Ok(json!({ "success": false })));
        fx.transport.reply(Err(unreachable()));
        let dest = destination(512);

        assert!(fx.client.retrieve_agent(&dest, AgentId::new()).await.is_none());
        assert!(fx.client.retrieve_agent(&dest, AgentId::new()).await.is_none());
    }

    #[tokio::test]
    async fn close_agent_is_fire_and_forget() {
        let fx = fixture();
        let dest = destination(512);
        let agent_id = AgentId::new();
        fx.transport.reply(Err(unreachable()));

        assert!(fx.client.close_agent(&dest, agent_id).await);
        fx.dispatcher.wait_idle().await;

        let requests = fx.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Delete);
        assert_eq!(requests[0].timeout, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn close_agent_local_uses_scene() {
        let fx = fixture();
        let dest = destination(0);
        let scene = Arc::new(LocalScene::default());
        fx.registry
            .register(dest.clone(), Arc::clone(&scene) as Arc<dyn SceneHost>)
            .await;
        let agent_id = AgentId::new();

        assert!(fx.client.close_agent(&dest, agent_id).await);
        assert_eq!(*scene.closed.lock().unwrap(), vec![agent_id]);
        assert!(fx.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn create_object_posts_to_object_endpoint() {
        let fx = fixture();
        let dest = destination(512);
        let object = SceneObjectData {
            object_id: ObjectId::new(),
            owner_id: AgentId::new(),
            name: "crate".to_owned(),
            position: Vector3::new(5.0, 5.0, 21.0),
            serialized: "<linkset/>".to_owned(),
        };
        let object_id = object.object_id;

        assert!(fx.client.create_object(&dest, object).await);
        let request = &fx.transport.requests()[0];
        assert_eq!(request.url, format!("http://dest:9000/object/{object_id}/"));
        assert_eq!(request.body.clone().unwrap()["object"]["name"], "crate");

        fx.transport.reply(Ok(json!({ "success": false })));
        let refused = SceneObjectData {
            object_id: ObjectId::new(),
            owner_id: AgentId::new(),
            name: "crate".to_owned(),
            position: Vector3::default(),
            serialized: String::new(),
        };
        assert!(!fx.client.create_object(&dest, refused).await);
    }
}
