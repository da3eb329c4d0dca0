//! Observer hooks on the negotiation engine.
//!
//! Logging and instrumentation attach here through dependency injection;
//! the engine itself never writes to anything but `tracing`.

use crate::state::Phase;
use accord_core::{AgentName, OfferId, RbMove};

/// Callback hooks invoked by [`crate::NegotiationEngine`] at its decision
/// points. Every hook has a no-op default, so implementations override
/// only what they observe.
pub trait NegotiationObserver {
    /// The engine changed phase.
    fn on_phase_change(&mut self, agent: &AgentName, phase: Phase) {
        let _ = (agent, phase);
    }

    /// A move was produced for a recipient.
    fn on_move_sent(&mut self, agent: &AgentName, recipient: &AgentName, mv: &RbMove) {
        let _ = (agent, recipient, mv);
    }

    /// A structured move arrived from a sender.
    fn on_move_received(&mut self, agent: &AgentName, sender: &AgentName, mv: &RbMove) {
        let _ = (agent, sender, mv);
    }

    /// An offer (sent or received) was resolved as accepted.
    fn on_offer_accepted(&mut self, agent: &AgentName, offer_id: OfferId) {
        let _ = (agent, offer_id);
    }

    /// An offer (sent or received) was resolved as rejected.
    fn on_offer_rejected(&mut self, agent: &AgentName, offer_id: OfferId) {
        let _ = (agent, offer_id);
    }

    /// A sent offer went unanswered past the expiry window and was
    /// unilaterally moved to rejected.
    fn on_offer_expired(&mut self, agent: &AgentName, offer_id: OfferId) {
        let _ = (agent, offer_id);
    }
}

/// Observer that observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl NegotiationObserver for NoopObserver {}
