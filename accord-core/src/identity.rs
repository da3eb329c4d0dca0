//! Identity types for ACCORD entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Discrete negotiation round counter, driven by the external round loop.
pub type Round = u64;

/// Name of an agent participating in a negotiation run.
///
/// Agents are a closed, trusted set of named peers (e.g. `"agent-a"`);
/// names are assigned by the run setup and never change mid-run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(String);

impl AgentName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a graph node (a constraint variable), e.g. `"h1"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A colour from the shared domain, e.g. `"red"`.
///
/// Colours are compared by name; the ordered domain lives on
/// [`crate::ConstraintProblem`], not on the colour itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Colour(String);

impl Colour {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Colour {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a conditional offer (or feasibility query) on the wire.
///
/// UUIDv7 embeds a Unix timestamp, so ids are globally unique per sender
/// and naturally sortable by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(Uuid);

impl OfferId {
    /// Generate a fresh timestamp-sortable offer id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OfferId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_ids_are_unique_and_sortable() {
        let a = OfferId::generate();
        let b = OfferId::generate();
        assert_ne!(a, b);
        // UUIDv7 is timestamp-prefixed, so later ids never sort before earlier ones.
        assert!(a <= b);
    }

    #[test]
    fn test_identity_serde_is_transparent() {
        let node = NodeId::new("h1");
        assert_eq!(serde_json::to_string(&node).unwrap(), "\"h1\"");
        let back: NodeId = serde_json::from_str("\"h1\"").unwrap();
        assert_eq!(back, node);

        let colour = Colour::new("red");
        assert_eq!(serde_json::to_string(&colour).unwrap(), "\"red\"");
    }

    #[test]
    fn test_display_matches_inner_name() {
        assert_eq!(AgentName::new("agent-a").to_string(), "agent-a");
        assert_eq!(NodeId::new("h4").to_string(), "h4");
        assert_eq!(Colour::new("green").to_string(), "green");
    }
}
