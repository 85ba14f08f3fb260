//! Viewer event queue payloads.
//!
//! Events are serialized once by whoever raises them and then travel as
//! opaque JSON text. The retry queue never looks inside a payload except to
//! read its `message` field, so it can recognise a `DisableSimulator`.

use serde::{Deserialize, Serialize};

use crate::region::RegionHandle;

/// Event kind telling the viewer to drop its connection to a region.
pub const DISABLE_SIMULATOR: &str = "DisableSimulator";

/// A pre-serialized event bound for an agent's viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload(String);

/// Only the field needed to classify an event.
#[derive(Deserialize)]
struct EventHeader {
    message: String,
}

impl EventPayload {
    /// Wrap already-serialized event text.
    pub const fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    /// Serialize an event of the given kind with its body.
    pub fn new(kind: &str, body: &serde_json::Value) -> Self {
        let value = serde_json::json!({ "message": kind, "body": body });
        Self(value.to_string())
    }

    /// The `DisableSimulator` event for a region.
    pub fn disable_simulator(handle: RegionHandle) -> Self {
        Self::new(DISABLE_SIMULATOR, &serde_json::json!({ "region_handle": handle }))
    }

    /// The raw serialized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The event kind, if the payload carries a readable `message` field.
    pub fn kind(&self) -> Option<String> {
        serde_json::from_str::<EventHeader>(&self.0)
            .ok()
            .map(|header| header.message)
    }

    /// Whether this is a `DisableSimulator` event.
    pub fn is_disable_simulator(&self) -> bool {
        self.kind().as_deref() == Some(DISABLE_SIMULATOR)
    }
}
