//! Wire units of the rule-based negotiation protocol.
//!
//! [`RbMove`] is a closed tagged sum type: every consumer pattern-matches
//! exhaustively over the five protocol moves instead of probing an opaque
//! payload. The JSON encoding is internally tagged on `"move"` and must
//! round-trip losslessly, including the distinction between absent and
//! present optional fields.

use crate::error::CodecError;
use crate::{AgentName, Colour, NodeId, OfferId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single "if you set this node to this colour" clause of an offer,
/// together with the agent expected to own that node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub node: NodeId,
    pub colour: Colour,
    pub owner: AgentName,
}

impl Condition {
    pub fn new(
        node: impl Into<NodeId>,
        colour: impl Into<Colour>,
        owner: impl Into<AgentName>,
    ) -> Self {
        Self {
            node: node.into(),
            colour: colour.into(),
            owner: owner.into(),
        }
    }

    /// The (node, colour) pair of this condition, without the owner.
    pub fn node_colour(&self) -> NodeColour {
        NodeColour {
            node: self.node.clone(),
            colour: self.colour.clone(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} (owner {})", self.node, self.colour, self.owner)
    }
}

/// A bare node/colour pair, used for offered assignments and for the
/// permanently-excluded conditions carried by rejections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeColour {
    pub node: NodeId,
    pub colour: Colour,
}

impl NodeColour {
    pub fn new(node: impl Into<NodeId>, colour: impl Into<Colour>) -> Self {
        Self {
            node: node.into(),
            colour: colour.into(),
        }
    }
}

impl fmt::Display for NodeColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.node, self.colour)
    }
}

/// "If you set your nodes to X, I will set mine to Y."
///
/// Empty `conditions` makes this an unconditional announcement of the
/// sender's boundary colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalOffer {
    pub offer_id: OfferId,
    /// What the recipient is asked to do; empty for announcements.
    pub conditions: Vec<Condition>,
    /// What the sender commits to in return.
    pub assignments: Vec<NodeColour>,
    /// Diagnostic tags, never semantically parsed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl ConditionalOffer {
    /// Create an offer with a fresh id.
    pub fn new(conditions: Vec<Condition>, assignments: Vec<NodeColour>) -> Self {
        Self {
            offer_id: OfferId::generate(),
            conditions,
            assignments,
            reasons: Vec::new(),
        }
    }

    /// Create an unconditional announcement of the sender's colours.
    pub fn announcement(assignments: Vec<NodeColour>) -> Self {
        Self::new(Vec::new(), assignments)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    /// True when the offer asks nothing of the recipient.
    pub fn is_announcement(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Commitment to a previously received conditional offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accept {
    pub refers_to: OfferId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// Refusal of a previously received conditional offer, optionally carrying
/// permanently-excluded single conditions and joint combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reject {
    pub refers_to: OfferId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    /// Single (node, colour) pairs the sender can never satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impossible_conditions: Option<Vec<NodeColour>>,
    /// Joint combinations the sender can never satisfy together.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impossible_combinations: Option<Vec<Vec<NodeColour>>>,
}

impl Reject {
    pub fn new(refers_to: OfferId) -> Self {
        Self {
            refers_to,
            reasons: Vec::new(),
            impossible_conditions: None,
            impossible_combinations: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    pub fn with_impossible_conditions(mut self, conditions: Vec<NodeColour>) -> Self {
        self.impossible_conditions = Some(conditions);
        self
    }

    pub fn with_impossible_combinations(mut self, combinations: Vec<Vec<NodeColour>>) -> Self {
        self.impossible_combinations = Some(combinations);
        self
    }
}

/// Read-only probe: "would this boundary configuration be feasible for you?"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityQuery {
    /// Id of the query, echoed back by the response's `refers_to`.
    pub offer_id: OfferId,
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl FeasibilityQuery {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self {
            offer_id: OfferId::generate(),
            conditions,
            reasons: Vec::new(),
        }
    }
}

/// Answer to a [`FeasibilityQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityResponse {
    pub refers_to: OfferId,
    pub feasible: bool,
    pub penalty: f64,
    pub details: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// The negotiation protocol's wire unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "move")]
pub enum RbMove {
    ConditionalOffer(ConditionalOffer),
    Accept(Accept),
    Reject(Reject),
    FeasibilityQuery(FeasibilityQuery),
    FeasibilityResponse(FeasibilityResponse),
}

impl RbMove {
    /// Variant name, for logging and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RbMove::ConditionalOffer(_) => "ConditionalOffer",
            RbMove::Accept(_) => "Accept",
            RbMove::Reject(_) => "Reject",
            RbMove::FeasibilityQuery(_) => "FeasibilityQuery",
            RbMove::FeasibilityResponse(_) => "FeasibilityResponse",
        }
    }

    /// Id carried by moves that open a dialogue (offers and queries).
    pub fn offer_id(&self) -> Option<OfferId> {
        match self {
            RbMove::ConditionalOffer(offer) => Some(offer.offer_id),
            RbMove::FeasibilityQuery(query) => Some(query.offer_id),
            _ => None,
        }
    }

    /// Id of the move this one responds to.
    pub fn refers_to(&self) -> Option<OfferId> {
        match self {
            RbMove::Accept(accept) => Some(accept.refers_to),
            RbMove::Reject(reject) => Some(reject.refers_to),
            RbMove::FeasibilityResponse(response) => Some(response.refers_to),
            _ => None,
        }
    }

    /// Encode to the tagged JSON wire form.
    pub fn to_wire(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Encode {
            reason: e.to_string(),
        })
    }

    /// Decode from the tagged JSON wire form. Unparseable payloads are a
    /// [`CodecError`], which callers treat as an ignorable non-protocol
    /// message rather than a fatal condition.
    pub fn from_wire(raw: &str) -> Result<Self, CodecError> {
        serde_json::from_str(raw).map_err(|e| CodecError::Decode {
            reason: e.to_string(),
        })
    }
}

impl From<ConditionalOffer> for RbMove {
    fn from(offer: ConditionalOffer) -> Self {
        RbMove::ConditionalOffer(offer)
    }
}

impl From<Accept> for RbMove {
    fn from(accept: Accept) -> Self {
        RbMove::Accept(accept)
    }
}

impl From<Reject> for RbMove {
    fn from(reject: Reject) -> Self {
        RbMove::Reject(reject)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(mv: &RbMove) -> RbMove {
        RbMove::from_wire(&mv.to_wire().unwrap()).unwrap()
    }

    #[test]
    fn test_offer_roundtrip_preserves_all_fields() {
        let offer = ConditionalOffer::new(
            vec![Condition::new("h4", "green", "agent-b")],
            vec![NodeColour::new("h1", "red")],
        )
        .with_reason("counterfactual");
        let mv = RbMove::from(offer);
        assert_eq!(roundtrip(&mv), mv);
    }

    #[test]
    fn test_announcement_roundtrip() {
        let mv = RbMove::from(ConditionalOffer::announcement(vec![
            NodeColour::new("h1", "red"),
            NodeColour::new("h2", "blue"),
        ]));
        let back = roundtrip(&mv);
        assert_eq!(back, mv);
        match back {
            RbMove::ConditionalOffer(offer) => assert!(offer.is_announcement()),
            other => panic!("expected offer, got {}", other.kind()),
        }
    }

    #[test]
    fn test_reject_roundtrip_distinguishes_absent_optionals() {
        let bare = RbMove::from(Reject::new(OfferId::generate()));
        let wire = bare.to_wire().unwrap();
        assert!(!wire.contains("impossible_conditions"));
        assert!(!wire.contains("impossible_combinations"));
        assert_eq!(roundtrip(&bare), bare);

        let full = RbMove::from(
            Reject::new(OfferId::generate())
                .with_reason("no-improvement")
                .with_impossible_conditions(vec![NodeColour::new("h4", "green")])
                .with_impossible_combinations(vec![vec![
                    NodeColour::new("h4", "green"),
                    NodeColour::new("h5", "red"),
                ]]),
        );
        assert_eq!(roundtrip(&full), full);
    }

    #[test]
    fn test_feasibility_roundtrip() {
        let query = FeasibilityQuery::new(vec![Condition::new("h2", "blue", "agent-a")]);
        let query_id = query.offer_id;
        let mv = RbMove::FeasibilityQuery(query);
        assert_eq!(roundtrip(&mv), mv);

        let response = RbMove::FeasibilityResponse(FeasibilityResponse {
            refers_to: query_id,
            feasible: true,
            penalty: 0.0,
            details: "no conflicts under queried conditions".to_string(),
            reasons: Vec::new(),
        });
        assert_eq!(roundtrip(&response), response);
    }

    #[test]
    fn test_wire_is_tagged_on_move() {
        let mv = RbMove::from(Accept {
            refers_to: OfferId::generate(),
            reasons: Vec::new(),
        });
        let wire = mv.to_wire().unwrap();
        assert!(wire.contains("\"move\":\"Accept\""));
        assert!(wire.contains("refers_to"));
    }

    #[test]
    fn test_from_wire_rejects_garbage() {
        assert!(RbMove::from_wire("not json").is_err());
        assert!(RbMove::from_wire("{\"move\":\"Surrender\"}").is_err());
    }

    #[test]
    fn test_offer_id_and_refers_to_accessors() {
        let offer = ConditionalOffer::announcement(Vec::new());
        let id = offer.offer_id;
        let mv = RbMove::from(offer);
        assert_eq!(mv.offer_id(), Some(id));
        assert_eq!(mv.refers_to(), None);

        let accept = RbMove::from(Accept {
            refers_to: id,
            reasons: Vec::new(),
        });
        assert_eq!(accept.refers_to(), Some(id));
        assert_eq!(accept.offer_id(), None);
    }
}
