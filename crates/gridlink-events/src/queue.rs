//! Event delivery with per-agent, per-region retry buffers.
//!
//! Each agent and region pair has a lane: a buffer of undelivered events
//! behind its own async lock. A delivery holds the lane for the whole POST,
//! so batches for the same pair never overtake each other. The map of lanes
//! sits behind one short-lived lock.
//!
//! A delivery drains the lane, drops any stale `DisableSimulator` event it
//! finds there, appends the new event, and POSTs the batch to every event
//! queue endpoint of the agent. If any endpoint fails, the whole batch goes
//! back into the lane, trimmed to the configured cap by dropping the oldest
//! events. A lane emptied by a successful delivery is removed from the map
//! when no other delivery holds it.
//!
//! Lock order is map then lane only through `try_lock`; a delivery holding
//! its lane may take the map lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::future::join_all;
use gridlink_core::{Dispatcher, Method, Transport, TransportError, TransportRequest};
use gridlink_types::{AgentId, EventBatchRequest, EventBatchResponse, EventPayload, RegionHandle};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::caps::CapsRegistry;

/// Why a batch was not delivered.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The agent has no event queue endpoints.
    #[error("agent {agent_id} has no event queue endpoints")]
    NoEndpoints {
        /// The agent.
        agent_id: AgentId,
    },

    /// An endpoint could not be reached or answered badly.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A batch or acknowledgement did not match its schema.
    #[error("malformed event batch body: {0}")]
    Decode(#[from] serde_json::Error),

    /// An endpoint answered `success: false`.
    #[error("{url} rejected the batch")]
    Rejected {
        /// The rejecting endpoint.
        url: String,
    },
}

type LaneKey = (AgentId, RegionHandle);
type Lane = Arc<Mutex<VecDeque<EventPayload>>>;

struct Inner {
    transport: Arc<dyn Transport>,
    caps: Arc<dyn CapsRegistry>,
    dispatcher: Dispatcher,
    max_pending: usize,
    lanes: Mutex<HashMap<LaneKey, Lane>>,
}

/// Queues viewer events for delivery and retries failed batches.
///
/// Cheap to clone; clones share buffers.
#[derive(Clone)]
pub struct EventQueueClient {
    inner: Arc<Inner>,
}

impl EventQueueClient {
    /// Create a client keeping at most `max_pending` undelivered events per
    /// agent and region.
    pub fn new(
        transport: Arc<dyn Transport>,
        caps: Arc<dyn CapsRegistry>,
        dispatcher: Dispatcher,
        max_pending: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                caps,
                dispatcher,
                max_pending,
                lanes: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Queue an event for background delivery. Always returns `true`;
    /// delivery is not guaranteed.
    pub fn enqueue(&self, event: EventPayload, agent_id: AgentId, handle: RegionHandle) -> bool {
        let this = self.clone();
        self.inner.dispatcher.spawn("event-delivery", async move {
            if let Err(e) = this.deliver(event, agent_id, handle).await {
                warn!(agent_id = %agent_id, handle = %handle, error = %e, "event delivery failed, buffered");
            }
        });
        true
    }

    /// Deliver an event now and report whether the batch carrying it was
    /// accepted.
    pub async fn try_enqueue(
        &self,
        event: EventPayload,
        agent_id: AgentId,
        handle: RegionHandle,
    ) -> bool {
        match self.deliver(event, agent_id, handle).await {
            Ok(count) => {
                debug!(agent_id = %agent_id, handle = %handle, count, "event batch delivered");
                true
            }
            Err(e) => {
                warn!(agent_id = %agent_id, handle = %handle, error = %e, "event delivery failed, buffered");
                false
            }
        }
    }

    /// Tell the viewer to drop a region and forget the agent's state there.
    ///
    /// With `forward_to_client` the `DisableSimulator` event is delivered
    /// immediately. Either way the agent's capabilities in the region are
    /// removed and its buffered events for the region are discarded.
    pub async fn disable_simulator(
        &self,
        agent_id: AgentId,
        handle: RegionHandle,
        forward_to_client: bool,
    ) {
        if forward_to_client {
            let event = EventPayload::disable_simulator(handle);
            if let Err(e) = self.deliver(event, agent_id, handle).await {
                warn!(agent_id = %agent_id, handle = %handle, error = %e, "disable simulator not delivered");
            }
        }
        if !self.inner.caps.remove_region(agent_id, handle).await {
            debug!(agent_id = %agent_id, handle = %handle, "no capabilities to remove");
        }
        let removed = self.inner.lanes.lock().await.remove(&(agent_id, handle));
        if let Some(lane) = removed {
            let dropped = lane.lock().await.len();
            if dropped > 0 {
                debug!(agent_id = %agent_id, handle = %handle, dropped, "discarded buffered events");
            }
        }
    }

    /// Undelivered events for an agent in a region, oldest first.
    pub async fn pending(&self, agent_id: AgentId, handle: RegionHandle) -> Vec<EventPayload> {
        let lane = self.inner.lanes.lock().await.get(&(agent_id, handle)).cloned();
        match lane {
            Some(lane) => lane.lock().await.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Drop every buffer of an agent, e.g. on logout. Returns how many
    /// regions had one.
    pub async fn clear_agent(&self, agent_id: AgentId) -> usize {
        let mut lanes = self.inner.lanes.lock().await;
        let before = lanes.len();
        lanes.retain(|(agent, _), _| *agent != agent_id);
        before.saturating_sub(lanes.len())
    }

    async fn lane(&self, key: LaneKey) -> Lane {
        Arc::clone(self.inner.lanes.lock().await.entry(key).or_default())
    }

    /// Whether `lane` is still the one mapped to `key`.
    async fn is_current(&self, key: LaneKey, lane: &Lane) -> bool {
        self.inner
            .lanes
            .lock()
            .await
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, lane))
    }

    /// Remove an empty lane that only the map and the caller hold.
    async fn prune(&self, key: LaneKey, lane: &Lane) {
        let mut lanes = self.inner.lanes.lock().await;
        let owned = lanes
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, lane));
        // New holders clone under the map lock, so the count cannot grow here.
        if !owned || Arc::strong_count(lane) > 2 {
            return;
        }
        if lane.try_lock().is_ok_and(|buffered| buffered.is_empty()) {
            lanes.remove(&key);
        }
    }

    /// Send buffered events plus `event` as one batch. Returns the batch
    /// size on success.
    async fn deliver(
        &self,
        event: EventPayload,
        agent_id: AgentId,
        handle: RegionHandle,
    ) -> Result<usize, DeliveryError> {
        let key = (agent_id, handle);
        let lane = self.lane(key).await;
        let mut buffered = lane.lock().await;

        let mut batch: Vec<EventPayload> = buffered
            .drain(..)
            .filter(|old| {
                let stale = old.is_disable_simulator();
                if stale {
                    debug!(agent_id = %agent_id, handle = %handle, "dropping buffered disable simulator");
                }
                !stale
            })
            .collect();
        batch.push(event);

        match self.post_batch(agent_id, handle, &batch).await {
            Ok(()) => {
                drop(buffered);
                self.prune(key, &lane).await;
                Ok(batch.len())
            }
            Err(e) => {
                if !self.is_current(key, &lane).await {
                    debug!(
                        agent_id = %agent_id,
                        handle = %handle,
                        count = batch.len(),
                        "lane discarded during delivery, failed batch dropped"
                    );
                    return Err(e);
                }
                buffered.extend(batch);
                let mut dropped = 0_usize;
                while buffered.len() > self.inner.max_pending {
                    buffered.pop_front();
                    dropped = dropped.saturating_add(1);
                }
                if dropped > 0 {
                    warn!(
                        agent_id = %agent_id,
                        handle = %handle,
                        dropped,
                        cap = self.inner.max_pending,
                        "event buffer full, oldest events dropped"
                    );
                }
                Err(e)
            }
        }
    }

    async fn post_batch(
        &self,
        agent_id: AgentId,
        handle: RegionHandle,
        batch: &[EventPayload],
    ) -> Result<(), DeliveryError> {
        let urls = self.inner.caps.event_queue_urls(agent_id).await;
        if urls.is_empty() {
            return Err(DeliveryError::NoEndpoints { agent_id });
        }

        let body = serde_json::to_value(EventBatchRequest {
            agent_id,
            region_handle: handle,
            events: batch.to_vec(),
        })?;

        let results = join_all(urls.iter().map(|url| self.post_one(url, body.clone()))).await;
        let mut outcome = Ok(());
        for (url, result) in urls.iter().zip(results) {
            if let Err(e) = result {
                debug!(url = %url, error = %e, "event queue endpoint failed");
                outcome = Err(e);
            }
        }
        outcome
    }

    async fn post_one(&self, url: &str, body: serde_json::Value) -> Result<(), DeliveryError> {
        let request = TransportRequest::new(Method::Post, url).with_body(body);
        let response = self.inner.transport.send(request).await?;
        let ack: EventBatchResponse = serde_json::from_value(response)?;
        if ack.success {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                url: url.to_owned(),
            })
        }
    }
}

impl std::fmt::Debug for EventQueueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueueClient")
            .field("max_pending", &self.inner.max_pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Notify;

    use super::*;
    use crate::caps::AgentCapsTable;

    #[derive(Default)]
    struct ScriptedTransport {
        requests: StdMutex<Vec<TransportRequest>>,
        replies: StdMutex<VecDeque<Result<Value, TransportError>>>,
    }

    impl ScriptedTransport {
        fn reply(&self, reply: Result<Value, TransportError>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        fn requests(&self) -> Vec<TransportRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn sent_events(&self, index: usize) -> Value {
            self.requests()[index].body.clone().unwrap()["events"].clone()
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

    fn down() -> TransportError {
        TransportError::Unreachable {
            url: "http://viewer/eq".to_owned(),
            message: "connection reset".to_owned(),
        }
    }

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        caps: Arc<AgentCapsTable>,
        dispatcher: Dispatcher,
        queue: EventQueueClient,
        agent: AgentId,
        handle: RegionHandle,
    }

    async fn fixture(max_pending: usize) -> Fixture {
        let transport = Arc::new(ScriptedTransport::default());
        let caps = Arc::new(AgentCapsTable::new());
        let dispatcher = Dispatcher::new(2);
        let agent = AgentId::new();
        let handle = RegionHandle::from_position(256_000, 256_000);
        caps.add_event_queue_url(agent, "http://viewer/eq").await;
        caps.add_region(agent, handle).await;
        let queue = EventQueueClient::new(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&caps) as Arc<dyn CapsRegistry>,
            dispatcher.clone(),
            max_pending,
        );
        Fixture {
            transport,
            caps,
            dispatcher,
            queue,
            agent,
            handle,
        }
    }

    fn event(kind: &str) -> EventPayload {
        EventPayload::new(kind, &json!({}))
    }

    async fn lane_count(queue: &EventQueueClient) -> usize {
        queue.inner.lanes.lock().await.len()
    }

    #[tokio::test]
    async fn failed_event_is_sent_ahead_of_the_next_one() {
        let fx = fixture(16).await;
        let a = event("EventA");
        let b = event("EventB");
        fx.transport.reply(Err(down()));

        assert!(!fx.queue.try_enqueue(a.clone(), fx.agent, fx.handle).await);
        assert_eq!(fx.queue.pending(fx.agent, fx.handle).await, vec![a.clone()]);

        assert!(fx.queue.try_enqueue(b.clone(), fx.agent, fx.handle).await);
        assert_eq!(fx.transport.sent_events(1), json!([a.as_str(), b.as_str()]));
        assert!(fx.queue.pending(fx.agent, fx.handle).await.is_empty());
    }

    #[tokio::test]
    async fn async_enqueue_reports_queued_and_retries_later() {
        let fx = fixture(16).await;
        let a = event("EventA");
        let b = event("EventB");
        fx.transport.reply(Err(down()));

        assert!(fx.queue.enqueue(a.clone(), fx.agent, fx.handle));
        fx.dispatcher.wait_idle().await;
        assert_eq!(fx.queue.pending(fx.agent, fx.handle).await, vec![a.clone()]);

        assert!(fx.queue.enqueue(b.clone(), fx.agent, fx.handle));
        fx.dispatcher.wait_idle().await;
        assert_eq!(fx.transport.sent_events(1), json!([a.as_str(), b.as_str()]));
        assert!(fx.queue.pending(fx.agent, fx.handle).await.is_empty());
    }

    #[tokio::test]
    async fn buffered_disable_simulator_is_never_replayed() {
        let fx = fixture(16).await;
        let disable = EventPayload::disable_simulator(fx.handle);
        let a = event("EventA");
        fx.transport.reply(Err(down()));
        fx.transport.reply(Err(down()));

        assert!(!fx.queue.try_enqueue(disable, fx.agent, fx.handle).await);
        assert!(!fx.queue.try_enqueue(a.clone(), fx.agent, fx.handle).await);
        assert_eq!(fx.transport.sent_events(1), json!([a.as_str()]));
        assert_eq!(fx.queue.pending(fx.agent, fx.handle).await, vec![a]);
    }

    #[tokio::test]
    async fn agent_without_endpoints_buffers() {
        let fx = fixture(16).await;
        let stranger = AgentId::new();
        let a = event("EventA");

        assert!(!fx.queue.try_enqueue(a.clone(), stranger, fx.handle).await);
        assert!(fx.transport.requests().is_empty());
        assert_eq!(fx.queue.pending(stranger, fx.handle).await, vec![a]);
    }

    #[tokio::test]
    async fn every_endpoint_must_accept() {
        let fx = fixture(16).await;
        fx.caps.add_event_queue_url(fx.agent, "http://mirror/eq").await;
        fx.transport.reply(Ok(json!({ "success": true })));
        fx.transport.reply(Ok(json!({ "success": false })));

        assert!(!fx.queue.try_enqueue(event("EventA"), fx.agent, fx.handle).await);
        let urls: Vec<String> = fx.transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["http://viewer/eq".to_owned(), "http://mirror/eq".to_owned()]);
        assert_eq!(fx.queue.pending(fx.agent, fx.handle).await.len(), 1);
    }

    #[tokio::test]
    async fn buffer_is_capped_dropping_oldest() {
        let fx = fixture(2).await;
        for _ in 0..3 {
            fx.transport.reply(Err(down()));
        }
        let events = [event("E1"), event("E2"), event("E3")];
        for e in &events {
            assert!(!fx.queue.try_enqueue(e.clone(), fx.agent, fx.handle).await);
        }

        assert_eq!(
            fx.queue.pending(fx.agent, fx.handle).await,
            vec![events[1].clone(), events[2].clone()]
        );
    }

    #[tokio::test]
    async fn buffers_are_per_region() {
        let fx = fixture(16).await;
        let other = RegionHandle::from_position(256_256, 256_000);
        fx.transport.reply(Err(down()));
        let a = event("EventA");

        assert!(!fx.queue.try_enqueue(a, fx.agent, fx.handle).await);
        let b = event("EventB");
        assert!(fx.queue.try_enqueue(b.clone(), fx.agent, other).await);

        assert_eq!(fx.transport.sent_events(1), json!([b.as_str()]));
        assert_eq!(fx.queue.pending(fx.agent, fx.handle).await.len(), 1);
    }

    #[tokio::test]
    async fn disable_simulator_delivers_then_forgets_region() {
        let fx = fixture(16).await;
        let a = event("EventA");
        fx.transport.reply(Err(down()));
        fx.transport.reply(Err(down()));
        assert!(!fx.queue.try_enqueue(a.clone(), fx.agent, fx.handle).await);

        fx.queue.disable_simulator(fx.agent, fx.handle, true).await;

        let disable = EventPayload::disable_simulator(fx.handle);
        assert_eq!(fx.transport.sent_events(1), json!([a.as_str(), disable.as_str()]));
        assert!(fx.queue.pending(fx.agent, fx.handle).await.is_empty());
        assert!(fx.caps.regions(fx.agent).await.is_empty());
    }

    #[tokio::test]
    async fn disable_simulator_without_forwarding_sends_nothing() {
        let fx = fixture(16).await;
        fx.transport.reply(Err(down()));
        assert!(!fx.queue.try_enqueue(event("EventA"), fx.agent, fx.handle).await);

        fx.queue.disable_simulator(fx.agent, fx.handle, false).await;

        assert_eq!(fx.transport.requests().len(), 1);
        assert!(fx.queue.pending(fx.agent, fx.handle).await.is_empty());
        assert!(fx.caps.regions(fx.agent).await.is_empty());
    }

    #[tokio::test]
    async fn clear_agent_drops_all_regions() {
        let fx = fixture(16).await;
        let other = RegionHandle::from_position(0, 0);
        fx.transport.reply(Err(down()));
        fx.transport.reply(Err(down()));
        assert!(!fx.queue.try_enqueue(event("EventA"), fx.agent, fx.handle).await);
        assert!(!fx.queue.try_enqueue(event("EventB"), fx.agent, other).await);

        assert_eq!(fx.queue.clear_agent(fx.agent).await, 2);
        assert!(fx.queue.pending(fx.agent, fx.handle).await.is_empty());
        assert!(fx.queue.pending(fx.agent, other).await.is_empty());
    }

    #[tokio::test]
    async fn delivered_lanes_are_released() {
        let fx = fixture(16).await;
        for x in (0..12_800_u32).step_by(256) {
            let handle = RegionHandle::from_position(x, 0);
            assert!(fx.queue.try_enqueue(event("EventA"), fx.agent, handle).await);
        }
        assert_eq!(lane_count(&fx.queue).await, 0);

        fx.transport.reply(Err(down()));
        assert!(!fx.queue.try_enqueue(event("EventB"), fx.agent, fx.handle).await);
        assert_eq!(lane_count(&fx.queue).await, 1);

        assert!(fx.queue.try_enqueue(event("EventC"), fx.agent, fx.handle).await);
        assert_eq!(lane_count(&fx.queue).await, 0);
    }

    #[tokio::test]
    async fn async_deliveries_release_their_lanes() {
        let fx = fixture(16).await;
        for _ in 0..10 {
            assert!(fx.queue.enqueue(event("EventA"), fx.agent, fx.handle));
        }
        fx.dispatcher.wait_idle().await;

        assert_eq!(fx.transport.requests().len(), 10);
        assert_eq!(lane_count(&fx.queue).await, 0);
    }

    /// Holds every POST until released, then fails it.
    #[derive(Default)]
    struct GatedTransport {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn send(&self, _request: TransportRequest) -> Result<Value, TransportError> {
            self.started.notify_one();
            self.release.notified().await;
            Err(down())
        }
    }

    #[tokio::test]
    async fn batch_failing_after_its_lane_was_cleared_is_not_rebuffered() {
        let transport = Arc::new(GatedTransport::default());
        let caps = Arc::new(AgentCapsTable::new());
        let agent = AgentId::new();
        let handle = RegionHandle::from_position(256_000, 256_000);
        caps.add_event_queue_url(agent, "http://viewer/eq").await;
        let queue = EventQueueClient::new(
            Arc::clone(&transport) as Arc<dyn Transport>,
            caps as Arc<dyn CapsRegistry>,
            Dispatcher::new(2),
            16,
        );

        let delivery = tokio::spawn({
            let queue = queue.clone();
            async move { queue.try_enqueue(event("EventA"), agent, handle).await }
        });
        transport.started.notified().await;
        assert_eq!(queue.clear_agent(agent).await, 1);
        transport.release.notify_one();

        assert!(!delivery.await.unwrap());
        assert_eq!(lane_count(&queue).await, 0);
        assert!(queue.pending(agent, handle).await.is_empty());
    }
}
