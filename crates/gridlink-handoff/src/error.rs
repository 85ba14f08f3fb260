//! Hand-off failure taxonomy.
//!
//! These errors stay inside the crate's call paths. The public operations
//! on [`SimulationClient`](crate::SimulationClient) turn them into boolean
//! or optional results after logging them.

use chrono::{DateTime, Utc};
use gridlink_core::TransportError;

/// Why a hand-off call did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    /// The destination could not be reached or answered badly.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The destination answered and said no.
    #[error("destination refused: {reason}")]
    Refused {
        /// The destination's explanation, possibly empty.
        reason: String,
    },

    /// A response or request body did not match its schema.
    #[error("malformed hand-off body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A successful create response carried no payload.
    #[error("destination accepted but returned no payload")]
    MissingPayload,

    /// The endpoint is cooling down after an earlier failure.
    #[error("{endpoint} is blacklisted until {until}")]
    Blacklisted {
        /// The blacklisted server URI.
        endpoint: String,
        /// When the entry expires.
        until: DateTime<Utc>,
    },
}

impl HandoffError {
    /// Human-readable reason for the caller, preferring the destination's
    /// own message when it gave one.
    pub fn into_reason(self) -> String {
        match self {
            Self::Refused { reason } if !reason.is_empty() => reason,
            other => other.to_string(),
        }
    }

    /// Whether the failure happened below the hand-off protocol, so the
    /// endpoint itself is suspect.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusal_reason_is_passed_through() {
        let err = HandoffError::Refused {
            reason: "region full".to_owned(),
        };
        assert_eq!(err.into_reason(), "region full");

        let empty = HandoffError::Refused {
            reason: String::new(),
        };
        assert_eq!(empty.into_reason(), "destination refused: ");
    }

    #[test]
    fn only_transport_failures_are_transport() {
        let timeout = HandoffError::Transport(TransportError::Timeout {
            url: "http://dest/agent/1/".to_owned(),
        });
        assert!(timeout.is_transport());
        assert!(!HandoffError::MissingPayload.is_transport());
    }
}
