//! ACCORD Transport - Collaborator Boundary
//!
//! Capability traits for message delivery and text formatting. Actual
//! transports (and any LLM-backed translation layer) are user-supplied;
//! this crate defines the interfaces the engine's consumers implement and
//! ships an in-memory pass-through used by the round drivers and tests.
//! Negotiation correctness never depends on anything here: the protocol
//! holds when the transport is a pure pass-through.

use accord_core::{AccordResult, AgentName, Envelope, RbMove};
use std::collections::VecDeque;
use tracing::trace;

/// Trait for message transports.
///
/// A transport accepts envelopes from stepping agents and hands them back
/// for delivery. The synchronous-round barrier is the driver's job: it
/// calls [`Transport::deliver`] exactly once per round, after every agent
/// has stepped.
pub trait Transport {
    /// Queue an envelope for delivery.
    fn send(&mut self, envelope: Envelope) -> AccordResult<()>;

    /// Drain every queued envelope, in the order they were sent.
    fn deliver(&mut self) -> Vec<Envelope>;
}

/// FIFO pass-through transport backed by an in-memory queue.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    queue: VecDeque<Envelope>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drain only the envelopes addressed to `recipient`, preserving the
    /// queue order of everything else.
    pub fn drain_for(&mut self, recipient: &AgentName) -> Vec<Envelope> {
        let mut delivered = Vec::new();
        let mut kept = VecDeque::with_capacity(self.queue.len());
        for envelope in self.queue.drain(..) {
            if envelope.recipient == *recipient {
                delivered.push(envelope);
            } else {
                kept.push_back(envelope);
            }
        }
        self.queue = kept;
        delivered
    }
}

impl Transport for InMemoryTransport {
    fn send(&mut self, envelope: Envelope) -> AccordResult<()> {
        trace!(from = %envelope.sender, to = %envelope.recipient, "queued");
        self.queue.push_back(envelope);
        Ok(())
    }

    fn deliver(&mut self) -> Vec<Envelope> {
        self.queue.drain(..).collect()
    }
}

/// Trait for move formatters: the seam where an external translation
/// layer (LLM-backed or heuristic) converts structured moves to and from
/// text. Implementations must be thread-safe (`Send + Sync`).
///
/// The engine never calls a formatter itself; a transport that carries
/// text instead of structured payloads uses one at its edges.
pub trait MoveFormatter: Send + Sync {
    /// Render a move as text.
    fn to_text(&self, mv: &RbMove) -> AccordResult<String>;

    /// Parse text back into a move. `None` means the text is not a
    /// structured move; such payloads reach the engine as free text and
    /// are ignored for negotiation purposes.
    fn from_text(&self, text: &str) -> Option<RbMove>;
}

/// Reference formatter over the tagged JSON wire encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMoveFormatter;

impl MoveFormatter for JsonMoveFormatter {
    fn to_text(&self, mv: &RbMove) -> AccordResult<String> {
        Ok(mv.to_wire()?)
    }

    fn from_text(&self, text: &str) -> Option<RbMove> {
        RbMove::from_wire(text).ok()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::{Accept, ConditionalOffer, NodeColour, OfferId};

    fn announcement(from: &str, to: &str, node: &str, colour: &str) -> Envelope {
        Envelope::negotiation(
            from,
            to,
            ConditionalOffer::announcement(vec![NodeColour::new(node, colour)]),
        )
    }

    #[test]
    fn test_deliver_preserves_send_order() {
        let mut transport = InMemoryTransport::new();
        let first = announcement("agent-a", "agent-b", "h1", "red");
        let second = announcement("agent-b", "agent-a", "h2", "green");
        transport.send(first.clone()).unwrap();
        transport.send(second.clone()).unwrap();
        assert_eq!(transport.len(), 2);

        let batch = transport.deliver();
        assert_eq!(batch, vec![first, second]);
        assert!(transport.is_empty());
    }

    #[test]
    fn test_drain_for_filters_by_recipient() {
        let mut transport = InMemoryTransport::new();
        let to_b = announcement("agent-a", "agent-b", "h1", "red");
        let to_c = announcement("agent-a", "agent-c", "h1", "red");
        let to_b_again = announcement("agent-c", "agent-b", "h3", "blue");
        transport.send(to_b.clone()).unwrap();
        transport.send(to_c.clone()).unwrap();
        transport.send(to_b_again.clone()).unwrap();

        let for_b = transport.drain_for(&AgentName::new("agent-b"));
        assert_eq!(for_b, vec![to_b, to_b_again]);
        // The rest stays queued for a later drain.
        assert_eq!(transport.deliver(), vec![to_c]);
    }

    #[test]
    fn test_json_formatter_roundtrip() {
        let formatter = JsonMoveFormatter;
        let mv = RbMove::from(Accept {
            refers_to: OfferId::generate(),
            reasons: vec!["penalty 1 -> 0".to_string()],
        });
        let text = formatter.to_text(&mv).unwrap();
        assert_eq!(formatter.from_text(&text), Some(mv));
    }

    #[test]
    fn test_json_formatter_rejects_free_text() {
        let formatter = JsonMoveFormatter;
        assert_eq!(formatter.from_text("I will probably pick red."), None);
        assert_eq!(formatter.from_text("{\"move\":\"Surrender\"}"), None);
    }
}
