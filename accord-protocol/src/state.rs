//! Per-agent negotiation bookkeeping.
//!
//! All of an agent's dialogue memory lives here: its own colouring, its
//! beliefs about neighbour colours, the offer book, what it last told
//! each neighbour, and the permanent negative memory accumulated from
//! rejections. The state is owned and mutated exclusively by the agent's
//! engine; nothing in it is shared.

use accord_core::{
    AgentName, Assignment, Colour, ConditionalOffer, NodeColour, NodeId, OfferId, Round,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Negotiation phase, driven externally by a phase-announce signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Compute and hold a local assignment; send nothing.
    Configure,
    /// Exchange announcements, offers, accepts and rejects.
    Bargain,
}

/// Direction of a tracked offer relative to this agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferDirection {
    /// Sent by this agent, awaiting the counterparty's answer.
    Outgoing,
    /// Received from the counterparty, awaiting this agent's answer.
    Incoming,
}

/// A conditional offer held in the offer book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedOffer {
    pub offer: ConditionalOffer,
    pub counterparty: AgentName,
    pub direction: OfferDirection,
    /// Round the offer entered the book, used for expiry.
    pub round_recorded: Round,
    /// Book-wide arrival sequence; higher means more recent.
    pub sequence: u64,
}

/// The canonical, order-independent form of an offer's condition set.
pub(crate) fn condition_set(offer: &ConditionalOffer) -> BTreeSet<NodeColour> {
    offer.conditions.iter().map(|c| c.node_colour()).collect()
}

/// Mutable negotiation memory of one agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NegotiationState {
    /// This agent's current colouring of its own nodes.
    pub assignments: Assignment,
    /// Believed colours of externally-owned nodes, updated only when a
    /// neighbour explicitly reports them.
    pub neighbour_assignments: Assignment,
    /// Unresolved offers, both directions.
    active_offers: BTreeMap<OfferId, TrackedOffer>,
    accepted_offers: BTreeSet<OfferId>,
    rejected_offers: BTreeSet<OfferId>,
    /// Last boundary state communicated to each neighbour.
    pub proposed_nodes: BTreeMap<AgentName, Assignment>,
    /// Exact condition sets each neighbour has rejected.
    rejected_condition_sets: BTreeMap<AgentName, BTreeSet<BTreeSet<NodeColour>>>,
    /// Single conditions each neighbour reported as permanently impossible.
    impossible_conditions: BTreeMap<AgentName, BTreeSet<NodeColour>>,
    /// Joint combinations each neighbour reported as permanently impossible.
    impossible_combinations: BTreeMap<AgentName, Vec<BTreeSet<NodeColour>>>,
    next_sequence: u64,
}

impl NegotiationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all per-round negotiation memory. Called on the phase
    /// transition into bargaining; assignments, beliefs and
    /// `proposed_nodes` survive (the transition broadcast overwrites the
    /// latter).
    pub fn reset_negotiation_memory(&mut self) {
        self.active_offers.clear();
        self.accepted_offers.clear();
        self.rejected_offers.clear();
        self.rejected_condition_sets.clear();
        self.impossible_conditions.clear();
        self.impossible_combinations.clear();
    }

    // ------------------------------------------------------------------
    // Offer book
    // ------------------------------------------------------------------

    /// Put an offer into the book as pending.
    pub fn record_offer(
        &mut self,
        offer: ConditionalOffer,
        counterparty: AgentName,
        direction: OfferDirection,
        round: Round,
    ) -> OfferId {
        let offer_id = offer.offer_id;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.active_offers.insert(
            offer_id,
            TrackedOffer {
                offer,
                counterparty,
                direction,
                round_recorded: round,
                sequence,
            },
        );
        offer_id
    }

    pub fn get_offer(&self, offer_id: &OfferId) -> Option<&TrackedOffer> {
        self.active_offers.get(offer_id)
    }

    pub fn is_pending(&self, offer_id: &OfferId) -> bool {
        self.active_offers.contains_key(offer_id)
    }

    pub fn is_accepted(&self, offer_id: &OfferId) -> bool {
        self.accepted_offers.contains(offer_id)
    }

    pub fn is_rejected(&self, offer_id: &OfferId) -> bool {
        self.rejected_offers.contains(offer_id)
    }

    /// Resolve a pending offer as accepted; returns the tracked offer.
    pub fn mark_accepted(&mut self, offer_id: &OfferId) -> Option<TrackedOffer> {
        let tracked = self.active_offers.remove(offer_id)?;
        self.accepted_offers.insert(*offer_id);
        Some(tracked)
    }

    /// Resolve a pending offer as rejected; returns the tracked offer.
    pub fn mark_rejected(&mut self, offer_id: &OfferId) -> Option<TrackedOffer> {
        let tracked = self.active_offers.remove(offer_id)?;
        self.rejected_offers.insert(*offer_id);
        Some(tracked)
    }

    /// Pending offers received from `sender`, oldest first.
    pub fn pending_incoming_from(&self, sender: &AgentName) -> Vec<&TrackedOffer> {
        let mut offers: Vec<&TrackedOffer> = self
            .active_offers
            .values()
            .filter(|t| t.direction == OfferDirection::Incoming && t.counterparty == *sender)
            .collect();
        offers.sort_by_key(|t| t.sequence);
        offers
    }

    /// Whether an offer this agent sent to `recipient` is still pending.
    pub fn has_pending_outgoing_to(&self, recipient: &AgentName) -> bool {
        self.active_offers
            .values()
            .any(|t| t.direction == OfferDirection::Outgoing && t.counterparty == *recipient)
    }

    /// Reject every pending offer this agent sent to `recipient`.
    /// A fresh offer from the counterparty implies ours went stale.
    pub fn supersede_outgoing_to(&mut self, recipient: &AgentName) -> Vec<OfferId> {
        let stale: Vec<OfferId> = self
            .active_offers
            .values()
            .filter(|t| t.direction == OfferDirection::Outgoing && t.counterparty == *recipient)
            .map(|t| t.offer.offer_id)
            .collect();
        for offer_id in &stale {
            self.mark_rejected(offer_id);
        }
        stale
    }

    /// Reject every outgoing offer pending for at least `expiry_rounds`
    /// rounds. Returns the expired offers.
    pub fn expire_outgoing(&mut self, now: Round, expiry_rounds: u64) -> Vec<TrackedOffer> {
        let stale: Vec<OfferId> = self
            .active_offers
            .values()
            .filter(|t| {
                t.direction == OfferDirection::Outgoing
                    && now.saturating_sub(t.round_recorded) >= expiry_rounds
            })
            .map(|t| t.offer.offer_id)
            .collect();
        stale
            .iter()
            .filter_map(|offer_id| {
                let tracked = self.active_offers.remove(offer_id)?;
                self.rejected_offers.insert(*offer_id);
                Some(tracked)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Permanent negative memory
    // ------------------------------------------------------------------

    /// Remember the exact condition set of an offer `counterparty` rejected.
    pub fn remember_rejected_condition_set(
        &mut self,
        counterparty: &AgentName,
        conditions: BTreeSet<NodeColour>,
    ) {
        if conditions.is_empty() {
            return;
        }
        self.rejected_condition_sets
            .entry(counterparty.clone())
            .or_default()
            .insert(conditions);
    }

    pub fn remember_impossible_conditions<I>(&mut self, counterparty: &AgentName, conditions: I)
    where
        I: IntoIterator<Item = NodeColour>,
    {
        self.impossible_conditions
            .entry(counterparty.clone())
            .or_default()
            .extend(conditions);
    }

    pub fn remember_impossible_combinations<I>(&mut self, counterparty: &AgentName, combinations: I)
    where
        I: IntoIterator<Item = BTreeSet<NodeColour>>,
    {
        let known = self
            .impossible_combinations
            .entry(counterparty.clone())
            .or_default();
        for combination in combinations {
            if !combination.is_empty() && !known.contains(&combination) {
                known.push(combination);
            }
        }
    }

    /// All condition sets `counterparty` has rejected so far.
    pub fn rejected_condition_sets_for(
        &self,
        counterparty: &AgentName,
    ) -> Option<&BTreeSet<BTreeSet<NodeColour>>> {
        self.rejected_condition_sets.get(counterparty)
    }

    pub fn is_condition_set_rejected(
        &self,
        counterparty: &AgentName,
        conditions: &BTreeSet<NodeColour>,
    ) -> bool {
        self.rejected_condition_sets
            .get(counterparty)
            .is_some_and(|sets| sets.contains(conditions))
    }

    /// Whether a candidate boundary configuration survives the negative
    /// memory for `counterparty`: it must contain no single impossible
    /// condition and must not cover any impossible combination.
    pub fn is_configuration_allowed(
        &self,
        counterparty: &AgentName,
        configuration: &BTreeMap<NodeId, Colour>,
    ) -> bool {
        if let Some(impossible) = self.impossible_conditions.get(counterparty) {
            for pair in impossible {
                if configuration.get(&pair.node) == Some(&pair.colour) {
                    return false;
                }
            }
        }
        if let Some(combinations) = self.impossible_combinations.get(counterparty) {
            for combination in combinations {
                let covered = combination
                    .iter()
                    .all(|pair| configuration.get(&pair.node) == Some(&pair.colour));
                if covered && !combination.is_empty() {
                    return false;
                }
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn active_offer_ids(&self) -> impl Iterator<Item = &OfferId> {
        self.active_offers.keys()
    }

    pub fn accepted_offer_ids(&self) -> &BTreeSet<OfferId> {
        &self.accepted_offers
    }

    pub fn rejected_offer_ids(&self) -> &BTreeSet<OfferId> {
        &self.rejected_offers
    }
}

// =============================================================================
// TESTS
// =============================================================================
