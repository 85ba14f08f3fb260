//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Regions, agents, grid scopes and scene objects all carry UUID identity
//! on the wire. Wrapping each in its own newtype prevents accidentally
//! passing an agent ID where a region ID is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier (UUID v4).
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The all-zero identifier.
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Whether this is the all-zero identifier.
            pub const fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a region (one cell of world space).
    RegionId
}

define_id! {
    /// Unique identifier for an avatar agent.
    AgentId
}

define_id! {
    /// Multi-grid namespace. The nil scope is the default single grid.
    ScopeId
}

define_id! {
    /// Identifier of an agent's login session.
    SessionId
}

define_id! {
    /// Identifier of a scene object (linkset root) being transferred.
    ObjectId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_values() {
        let region = RegionId::new();
        let agent = AgentId::new();
        assert_ne!(region.into_inner(), Uuid::nil());
        assert_ne!(region.into_inner(), agent.into_inner());
    }

    #[test]
    fn id_serializes_as_plain_uuid_string() {
        let id = RegionId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn id_parses_from_display_form() {
        let id = AgentId::new();
        let parsed: Result<AgentId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
        assert!("not-a-uuid".parse::<AgentId>().is_err());
    }

    #[test]
    fn nil_scope_is_default_grid() {
        assert!(ScopeId::nil().is_nil());
        assert!(!ScopeId::new().is_nil());
    }
}
