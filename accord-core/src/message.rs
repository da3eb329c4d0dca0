//! Message envelope exchanged between named agents.
//!
//! The envelope is the only thing the transport layer sees: a sender, a
//! recipient, and an opaque content payload. Structured negotiation moves
//! travel as [`Payload::Move`]; anything else (free-form text produced by
//! an external formatter) travels as [`Payload::Text`] and is ignored by
//! the negotiation engine.

use crate::moves::RbMove;
use crate::AgentName;
use serde::{Deserialize, Serialize};

/// Content carried by an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// A structured negotiation move.
    Move(RbMove),
    /// Transport-specific free text; unparseable as a move and ignored
    /// for negotiation purposes.
    Text(String),
}

/// A directed message between two named agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: AgentName,
    pub recipient: AgentName,
    pub content: Payload,
}

impl Envelope {
    /// Wrap a negotiation move for delivery.
    pub fn negotiation(
        sender: impl Into<AgentName>,
        recipient: impl Into<AgentName>,
        mv: impl Into<RbMove>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content: Payload::Move(mv.into()),
        }
    }

    /// Wrap free-form text for delivery.
    pub fn text(
        sender: impl Into<AgentName>,
        recipient: impl Into<AgentName>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content: Payload::Text(text.into()),
        }
    }

    /// The structured move inside, if any.
    pub fn as_move(&self) -> Option<&RbMove> {
        match &self.content {
            Payload::Move(mv) => Some(mv),
            Payload::Text(_) => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
