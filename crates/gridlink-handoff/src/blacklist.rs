//! Time-boxed denylist of unreachable hand-off endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gridlink_core::Clock;
use tokio::sync::Mutex;
use tracing::debug;

/// Endpoints that recently failed, keyed by destination server URI.
///
/// An entry blocks calls until its expiry. Expired entries are removed the
/// next time they are looked up; a successful call clears the entry early.
#[derive(Debug)]
pub struct EndpointBlacklist {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl EndpointBlacklist {
    /// Create an empty blacklist with the given cool-down.
    pub fn new(clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            cooldown,
        }
    }

    /// The expiry of an active entry for `endpoint`, if any.
    pub async fn blocked_until(&self, endpoint: &str) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let until = *entries.get(endpoint)?;
        if now >= until {
            entries.remove(endpoint);
            debug!(endpoint, "blacklist entry expired");
            return None;
        }
        Some(until)
    }

    /// Block `endpoint` for one cool-down from now and return the expiry.
    pub async fn block(&self, endpoint: &str) -> DateTime<Utc> {
        let delta = chrono::Duration::from_std(self.cooldown).unwrap_or(chrono::Duration::MAX);
        let until = self
            .clock
            .now()
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.lock().await.insert(endpoint.to_owned(), until);
        until
    }

    /// Remove any entry for `endpoint`. Returns whether one existed.
    pub async fn clear(&self, endpoint: &str) -> bool {
        self.entries.lock().await.remove(endpoint).is_some()
    }

    /// Number of entries, expired ones included until looked up.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether there are no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
