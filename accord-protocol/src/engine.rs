//! The rule-based conditional-offer negotiation engine.
//!
//! One engine drives one agent's side of the dialogue: it owns the
//! agent's cluster colouring, its beliefs about neighbour colours, and
//! the offer book, and it produces at most one move per neighbouring
//! agent per round, chosen by a strict priority ladder:
//!
//! 1. boundary-update announcement (a neighbour must never operate on
//!    stale beliefs about our colours),
//! 2. evaluation of the neighbour's pending offers (accept the best one
//!    that does not worsen the penalty, else explicitly reject the most
//!    recent),
//! 3. counterfactual conditional-offer generation (only while no own
//!    offer is pending with that neighbour),
//! 4. silence.
//!
//! All coordination is through message content; the engine never touches
//! another agent's state and never blocks.

use crate::diagnostics::Diagnostics;
use crate::observer::{NegotiationObserver, NoopObserver};
use crate::search::search_conditional_offer;
use crate::state::{condition_set, NegotiationState, OfferDirection, Phase, TrackedOffer};
use accord_core::{
    Accept, AccordResult, AgentName, Assignment, Colour, Condition, ConditionalOffer,
    ConstraintProblem, EngineConfig, Envelope, FeasibilityQuery, FeasibilityResponse, NodeColour,
    NodeId, Payload, ProtocolError, RbMove, Reject, Round, SolverError,
};
use accord_solver::{LocalClusterSolver, SearchStrategy};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Negotiation engine for one agent.
pub struct NegotiationEngine {
    name: AgentName,
    problem: Arc<ConstraintProblem>,
    /// Owner of every node this engine can ever reason about: the whole
    /// cluster plus all externally-owned adjacent nodes.
    owners: BTreeMap<NodeId, AgentName>,
    solver: LocalClusterSolver,
    config: EngineConfig,
    phase: Phase,
    round: Round,
    state: NegotiationState,
    last_feasibility: BTreeMap<AgentName, FeasibilityResponse>,
    diagnostics: Diagnostics,
    observer: Box<dyn NegotiationObserver>,
    rng: StdRng,
}

impl std::fmt::Debug for NegotiationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiationEngine")
            .field("name", &self.name)
            .field("problem", &self.problem)
            .field("owners", &self.owners)
            .field("solver", &self.solver)
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("round", &self.round)
            .field("state", &self.state)
            .field("last_feasibility", &self.last_feasibility)
            .field("diagnostics", &self.diagnostics)
            .field("rng", &self.rng)
            .finish_non_exhaustive()
    }
}

impl NegotiationEngine {
    /// Create an engine for `name` owning `cluster`.
    ///
    /// Fails fast on invalid configuration, on cluster nodes the problem
    /// does not know or that `owners` assigns to someone else, and on
    /// adjacent external nodes with no registered owner. Everything that
    /// can go wrong later degrades to an ignorable move instead.
    pub fn new(
        name: impl Into<AgentName>,
        cluster: Vec<NodeId>,
        problem: Arc<ConstraintProblem>,
        owners: BTreeMap<NodeId, AgentName>,
        strategy: SearchStrategy,
        config: EngineConfig,
        seed: u64,
    ) -> AccordResult<Self> {
        config.validate()?;
        let name = name.into();
        let solver = LocalClusterSolver::new(
            cluster,
            Arc::clone(&problem),
            strategy,
            config.exhaustive_cluster_limit,
        )?;

        for node in solver.nodes() {
            if owners.get(node) != Some(&name) {
                return Err(ProtocolError::ForeignClusterNode { node: node.clone() }.into());
            }
            for neighbour in problem.neighbours(node) {
                let external = !solver.nodes().contains(&neighbour);
                if external && !owners.contains_key(&neighbour) {
                    return Err(ProtocolError::MissingOwner { node: neighbour }.into());
                }
            }
        }

        let mut state = NegotiationState::new();
        state.assignments = solver.compute_assignment(&Assignment::new());

        Ok(Self {
            name,
            problem,
            owners,
            solver,
            config,
            phase: Phase::Configure,
            round: 0,
            state,
            last_feasibility: BTreeMap::new(),
            diagnostics: Diagnostics::default(),
            observer: Box::new(NoopObserver),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Attach an observer for the engine's decision points.
    pub fn with_observer(mut self, observer: Box<dyn NegotiationObserver>) -> Self {
        self.observer = observer;
        self
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn name(&self) -> &AgentName {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> Round {
        self.round
    }

    /// This agent's current colouring of its own nodes.
    pub fn assignments(&self) -> &Assignment {
        &self.state.assignments
    }

    /// Current beliefs about externally-owned nodes.
    pub fn neighbour_beliefs(&self) -> &Assignment {
        &self.state.neighbour_assignments
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Full negotiation bookkeeping, for inspection and tests.
    pub fn negotiation_state(&self) -> &NegotiationState {
        &self.state
    }

    /// Latest feasibility answer received from `sender`, if any.
    pub fn last_feasibility_from(&self, sender: &AgentName) -> Option<&FeasibilityResponse> {
        self.last_feasibility.get(sender)
    }

    /// Neighbouring agents: owners of external nodes adjacent to the
    /// cluster.
    pub fn neighbour_agents(&self) -> BTreeSet<AgentName> {
        let mut agents = BTreeSet::new();
        for node in self.solver.nodes() {
            for neighbour in self.problem.neighbours(node) {
                if !self.owns(&neighbour) {
                    if let Some(owner) = self.owners.get(&neighbour) {
                        agents.insert(owner.clone());
                    }
                }
            }
        }
        agents
    }

    /// Our nodes adjacent to at least one node owned by `recipient`.
    pub fn boundary_nodes_to(&self, recipient: &AgentName) -> Vec<NodeId> {
        self.solver
            .nodes()
            .iter()
            .filter(|node| {
                self.problem
                    .neighbours(node)
                    .iter()
                    .any(|n| self.owned_by(n, recipient))
            })
            .cloned()
            .collect()
    }

    /// `recipient`'s nodes adjacent to our cluster.
    pub fn their_boundary_nodes(&self, recipient: &AgentName) -> Vec<NodeId> {
        let mut nodes = BTreeSet::new();
        for node in self.solver.nodes() {
            for neighbour in self.problem.neighbours(node) {
                if self.owned_by(&neighbour, recipient) {
                    nodes.insert(neighbour);
                }
            }
        }
        nodes.into_iter().collect()
    }

    /// Penalty of the local view: own assignment merged over current
    /// beliefs.
    pub fn current_penalty(&self) -> f64 {
        self.problem.evaluate(&self.local_view())
    }

    /// Soft-convergence signal: conflict-free under current beliefs and
    /// every boundary node announced as currently coloured to every
    /// neighbour. Consumed by the external round driver.
    pub fn is_satisfied(&self) -> bool {
        if self.problem.conflict_count(&self.local_view()) > 0 {
            return false;
        }
        self.neighbour_agents().iter().all(|recipient| {
            let boundary = self.boundary_assignment_for(recipient);
            let proposed = self.state.proposed_nodes.get(recipient);
            boundary
                .iter()
                .all(|(node, colour)| proposed.and_then(|p| p.get(node)) == Some(colour))
        })
    }

    // ------------------------------------------------------------------
    // Phases and stepping
    // ------------------------------------------------------------------

    /// Externally driven phase signal. Entering [`Phase::Bargain`] clears
    /// all per-round negotiation memory, locks the local assignment and
    /// immediately broadcasts the boundary colours to every neighbour.
    /// Re-announcing the current phase is a no-op.
    pub fn announce_phase(&mut self, phase: Phase) -> Vec<Envelope> {
        if self.phase == phase {
            return Vec::new();
        }
        self.phase = phase;
        self.observer.on_phase_change(&self.name, phase);
        debug!(agent = %self.name, ?phase, "phase change");
        match phase {
            Phase::Configure => Vec::new(),
            Phase::Bargain => {
                self.state.reset_negotiation_memory();
                self.state.assignments = self
                    .solver
                    .compute_assignment(&self.state.neighbour_assignments);
                self.broadcast_boundary()
            }
        }
    }

    /// One synchronous round: expire stale offers, then either recompute
    /// the local assignment (Configure) or produce at most one move per
    /// neighbour (Bargain).
    pub fn step(&mut self) -> Vec<Envelope> {
        self.round += 1;
        for expired in self
            .state
            .expire_outgoing(self.round, self.config.offer_expiry_rounds)
        {
            self.diagnostics.offers_expired += 1;
            self.diagnostics
                .note(format!("offer {} expired unanswered", expired.offer.offer_id));
            self.observer
                .on_offer_expired(&self.name, expired.offer.offer_id);
            debug!(
                agent = %self.name,
                offer = %expired.offer.offer_id,
                counterparty = %expired.counterparty,
                "offer expired unanswered"
            );
        }

        match self.phase {
            Phase::Configure => {
                self.state.assignments = self
                    .solver
                    .compute_assignment(&self.state.neighbour_assignments);
                Vec::new()
            }
            Phase::Bargain => {
                let mut envelopes = Vec::new();
                for recipient in self.neighbour_agents() {
                    if let Some(mv) = self.move_for(&recipient) {
                        self.observer.on_move_sent(&self.name, &recipient, &mv);
                        trace!(agent = %self.name, to = %recipient, kind = mv.kind(), "move");
                        envelopes.push(Envelope {
                            sender: self.name.clone(),
                            recipient,
                            content: Payload::Move(mv),
                        });
                    }
                }
                envelopes
            }
        }
    }

    /// Handle a delivered message. Only feasibility queries produce an
    /// immediate reply; everything else mutates state silently. Messages
    /// addressed to someone else and non-protocol payloads are ignored.
    pub fn receive(&mut self, envelope: &Envelope) -> Vec<Envelope> {
        if envelope.recipient != self.name {
            warn!(agent = %self.name, recipient = %envelope.recipient, "misrouted envelope");
            return Vec::new();
        }
        let sender = envelope.sender.clone();
        let mv = match envelope.as_move() {
            Some(mv) => mv.clone(),
            None => {
                self.diagnostics.unparseable_payloads += 1;
                trace!(agent = %self.name, from = %sender, "non-protocol payload ignored");
                return Vec::new();
            }
        };
        self.observer.on_move_received(&self.name, &sender, &mv);

        match mv {
            RbMove::ConditionalOffer(offer) => {
                self.receive_offer(sender, offer);
                Vec::new()
            }
            RbMove::Accept(accept) => {
                self.receive_accept(sender, accept);
                Vec::new()
            }
            RbMove::Reject(reject) => {
                self.receive_reject(sender, reject);
                Vec::new()
            }
            RbMove::FeasibilityQuery(query) => self.answer_feasibility(sender, query),
            RbMove::FeasibilityResponse(response) => {
                self.last_feasibility.insert(sender, response);
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Move generation (the priority ladder)
    // ------------------------------------------------------------------

    fn move_for(&mut self, recipient: &AgentName) -> Option<RbMove> {
        if let Some(mv) = self.boundary_update_move(recipient) {
            return Some(mv);
        }
        if let Some(mv) = self.respond_to_pending_offers(recipient) {
            return Some(mv);
        }
        if !self.state.has_pending_outgoing_to(recipient) {
            if let Some(mv) = self.generate_conditional_offer(recipient) {
                return Some(mv);
            }
        }
        None
    }

    /// Priority 1: if any boundary colour differs from what this
    /// recipient was last told, announce the full boundary
    /// unconditionally, whatever the penalty.
    fn boundary_update_move(&mut self, recipient: &AgentName) -> Option<RbMove> {
        let boundary = self.boundary_assignment_for(recipient);
        if boundary.is_empty() {
            return None;
        }
        let proposed = self.state.proposed_nodes.get(recipient);
        let stale = boundary
            .iter()
            .any(|(node, colour)| proposed.and_then(|p| p.get(node)) != Some(colour));
        if !stale {
            return None;
        }

        let offer = ConditionalOffer::announcement(to_node_colours(&boundary))
            .with_reason("boundary-update");
        self.state.proposed_nodes.insert(recipient.clone(), boundary);
        self.diagnostics.announcements_sent += 1;
        Some(RbMove::from(offer))
    }

    /// Priority 2: evaluate every pending offer from this recipient.
    /// Accept the one with the lowest simulated penalty if it does not
    /// worsen the current penalty (ties accepted to avoid deadlock),
    /// committing its changes atomically. Otherwise explicitly reject
    /// the most recent pending offer - never silently ignore one.
    fn respond_to_pending_offers(&mut self, recipient: &AgentName) -> Option<RbMove> {
        let pending: Vec<TrackedOffer> = self
            .state
            .pending_incoming_from(recipient)
            .into_iter()
            .cloned()
            .collect();
        if pending.is_empty() {
            return None;
        }

        let current = self.current_penalty();
        let mut best: Option<(f64, &TrackedOffer, Assignment, Assignment)> = None;
        for tracked in &pending {
            if let Some((assignments, beliefs, penalty)) = self.simulate_offer(&tracked.offer) {
                if best.as_ref().is_none_or(|(p, ..)| penalty < *p) {
                    best = Some((penalty, tracked, assignments, beliefs));
                }
            }
        }

        if let Some((penalty, tracked, assignments, beliefs)) = best {
            if penalty <= current {
                let offer_id = tracked.offer.offer_id;
                self.state.assignments = assignments;
                self.state.neighbour_assignments = beliefs;
                self.state.mark_accepted(&offer_id);
                self.diagnostics.accepts_sent += 1;
                self.diagnostics
                    .note(format!("accepted {offer_id}: penalty {current} -> {penalty}"));
                self.observer.on_offer_accepted(&self.name, offer_id);
                return Some(RbMove::from(Accept {
                    refers_to: offer_id,
                    reasons: vec![format!("penalty {current} -> {penalty}")],
                }));
            }
        }

        // Nothing acceptable: reject the most recent pending offer and
        // tell the sender which of its conditions can never hold.
        let most_recent = pending
            .iter()
            .max_by_key(|tracked| tracked.sequence)
            .expect("pending is non-empty");
        let offer_id = most_recent.offer.offer_id;
        self.state.mark_rejected(&offer_id);
        let impossible = self.permanently_impossible_conditions(&most_recent.offer);
        let mut reject = Reject::new(offer_id).with_reason("no-improvement");
        if !impossible.is_empty() {
            reject = reject.with_impossible_conditions(impossible);
        }
        self.diagnostics.rejects_sent += 1;
        self.diagnostics.note(format!("rejected {offer_id}"));
        self.observer.on_offer_rejected(&self.name, offer_id);
        Some(RbMove::from(reject))
    }

    /// Priority 3: counterfactual search for a mutually beneficial
    /// boundary configuration to propose to this recipient.
    fn generate_conditional_offer(&mut self, recipient: &AgentName) -> Option<RbMove> {
        let their_boundary = self.their_boundary_nodes(recipient);
        if their_boundary.is_empty() {
            return None;
        }
        let current = self.current_penalty();
        let conflict_exists = self.problem.conflict_count(&self.local_view()) > 0;
        let proposal = search_conditional_offer(
            &self.problem,
            &self.solver,
            &self.state,
            recipient,
            &their_boundary,
            &self.config,
            current,
            conflict_exists,
            &mut self.rng,
        )?;

        let conditions: Vec<Condition> = proposal
            .conditions
            .iter()
            .map(|(node, colour)| Condition {
                node: node.clone(),
                colour: colour.clone(),
                owner: recipient.clone(),
            })
            .collect();

        // Commitments: the boundary this recipient can see, plus any
        // other node the response recolours.
        let mut offered: BTreeMap<NodeId, Colour> = self
            .boundary_nodes_to(recipient)
            .into_iter()
            .filter_map(|node| {
                proposal
                    .response
                    .get(&node)
                    .map(|colour| (node.clone(), colour.clone()))
            })
            .collect();
        for (node, colour) in &proposal.response {
            if self.state.assignments.get(node) != Some(colour) {
                offered.insert(node.clone(), colour.clone());
            }
        }

        let offer = ConditionalOffer::new(conditions, to_node_colours(&offered))
            .with_reason(format!("penalty {current} -> {}", proposal.penalty));
        self.state.record_offer(
            offer.clone(),
            recipient.clone(),
            OfferDirection::Outgoing,
            self.round,
        );
        self.diagnostics.offers_sent += 1;
        self.diagnostics.note(format!(
            "proposed {} to {recipient}: penalty {current} -> {}",
            offer.offer_id, proposal.penalty
        ));
        Some(RbMove::from(offer))
    }

    // ------------------------------------------------------------------
    // Receive handlers
    // ------------------------------------------------------------------

    fn receive_offer(&mut self, sender: AgentName, offer: ConditionalOffer) {
        // Their new offer implies anything we still have on the table
        // with them is stale.
        for stale in self.state.supersede_outgoing_to(&sender) {
            self.observer.on_offer_rejected(&self.name, stale);
            debug!(agent = %self.name, offer = %stale, "own offer superseded");
        }

        // Their committed colours become beliefs, whether or not the
        // offer is ever accepted. Nodes we cannot attribute to the sender
        // are malformed input and ignored.
        for reported in &offer.assignments {
            if self.owned_by(&reported.node, &sender) {
                self.state
                    .neighbour_assignments
                    .insert(reported.node.clone(), reported.colour.clone());
            } else {
                trace!(agent = %self.name, node = %reported.node, "unattributable node in offer");
            }
        }

        self.diagnostics.offers_received += 1;
        self.state
            .record_offer(offer, sender, OfferDirection::Incoming, self.round);
    }

    fn receive_accept(&mut self, sender: AgentName, accept: Accept) {
        let valid = self.state.get_offer(&accept.refers_to).is_some_and(|t| {
            t.direction == OfferDirection::Outgoing && t.counterparty == sender
        });
        if !valid {
            // Announcement confirmations and accepts of superseded or
            // expired offers land here.
            trace!(agent = %self.name, refers_to = %accept.refers_to, "accept without pending offer");
            return;
        }
        let Some(tracked) = self.state.mark_accepted(&accept.refers_to) else {
            return;
        };

        // Commit our side and their side of the deal atomically.
        for promised in &tracked.offer.assignments {
            if self.owns(&promised.node) {
                self.state
                    .assignments
                    .insert(promised.node.clone(), promised.colour.clone());
            }
        }
        for condition in &tracked.offer.conditions {
            if self.owned_by(&condition.node, &sender) {
                self.state
                    .neighbour_assignments
                    .insert(condition.node.clone(), condition.colour.clone());
            }
        }

        // The accepted offer told the sender our promised boundary
        // colours; no re-announcement needed for those nodes.
        let boundary: BTreeSet<NodeId> = self.boundary_nodes_to(&sender).into_iter().collect();
        let proposed = self.state.proposed_nodes.entry(sender.clone()).or_default();
        for promised in &tracked.offer.assignments {
            if boundary.contains(&promised.node) {
                proposed.insert(promised.node.clone(), promised.colour.clone());
            }
        }

        self.diagnostics.accepts_received += 1;
        self.diagnostics
            .note(format!("offer {} accepted by {sender}", accept.refers_to));
        self.observer.on_offer_accepted(&self.name, accept.refers_to);
    }

    fn receive_reject(&mut self, sender: AgentName, reject: Reject) {
        // Impossibility knowledge is permanent for this counterparty and
        // applies even when the referenced offer is already resolved.
        if let Some(conditions) = &reject.impossible_conditions {
            self.state
                .remember_impossible_conditions(&sender, conditions.iter().cloned());
        }
        if let Some(combinations) = &reject.impossible_combinations {
            self.state.remember_impossible_combinations(
                &sender,
                combinations
                    .iter()
                    .map(|combo| combo.iter().cloned().collect()),
            );
        }

        let valid = self.state.get_offer(&reject.refers_to).is_some_and(|t| {
            t.direction == OfferDirection::Outgoing && t.counterparty == sender
        });
        if valid {
            if let Some(tracked) = self.state.mark_rejected(&reject.refers_to) {
                self.state
                    .remember_rejected_condition_set(&sender, condition_set(&tracked.offer));
                self.observer.on_offer_rejected(&self.name, reject.refers_to);
            }
        }
        self.diagnostics.rejects_received += 1;
        self.diagnostics
            .note(format!("offer {} rejected by {sender}", reject.refers_to));
    }

    /// Read-only probe: answer what the exhaustive local search would
    /// yield under the queried conditions. Beliefs are shifted on a copy
    /// and never committed.
    fn answer_feasibility(&mut self, sender: AgentName, query: FeasibilityQuery) -> Vec<Envelope> {
        let mut shifted = self.state.neighbour_assignments.clone();
        for condition in &query.conditions {
            if !self.owns(&condition.node) {
                shifted.insert(condition.node.clone(), condition.colour.clone());
            }
        }

        let response = match self.exhaustive_probe(&shifted) {
            Ok(assignment) => {
                let mut merged = shifted;
                merged.extend(assignment);
                let penalty = self.problem.evaluate(&merged);
                FeasibilityResponse {
                    refers_to: query.offer_id,
                    feasible: self.problem.is_valid(&merged),
                    penalty,
                    details: format!(
                        "exhaustive probe over {} cluster nodes",
                        self.solver.nodes().len()
                    ),
                    reasons: Vec::new(),
                }
            }
            Err(err) => FeasibilityResponse {
                refers_to: query.offer_id,
                feasible: false,
                penalty: f64::MAX,
                details: err.to_string(),
                reasons: vec!["probe-failed".to_string()],
            },
        };

        self.diagnostics.feasibility_queries_answered += 1;
        let mv = RbMove::FeasibilityResponse(response);
        self.observer.on_move_sent(&self.name, &sender, &mv);
        vec![Envelope {
            sender: self.name.clone(),
            recipient: sender,
            content: Payload::Move(mv),
        }]
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn owns(&self, node: &NodeId) -> bool {
        self.solver.nodes().contains(node)
    }

    fn owned_by(&self, node: &NodeId, agent: &AgentName) -> bool {
        self.owners.get(node) == Some(agent)
    }

    fn local_view(&self) -> Assignment {
        let mut merged = self.state.neighbour_assignments.clone();
        merged.extend(self.state.assignments.clone());
        merged
    }

    fn boundary_assignment_for(&self, recipient: &AgentName) -> Assignment {
        self.boundary_nodes_to(recipient)
            .into_iter()
            .filter_map(|node| {
                self.state
                    .assignments
                    .get(&node)
                    .map(|colour| (node.clone(), colour.clone()))
            })
            .collect()
    }

    /// Simulate accepting an offer: returns the would-be assignments,
    /// beliefs and penalty, or `None` when the offer is infeasible
    /// (conditions on nodes we do not own, or contradicting a fixed
    /// colour).
    fn simulate_offer(&self, offer: &ConditionalOffer) -> Option<(Assignment, Assignment, f64)> {
        let mut assignments = self.state.assignments.clone();
        for condition in &offer.conditions {
            if !self.owns(&condition.node) {
                return None;
            }
            if self
                .problem
                .fixed_colour(&condition.node)
                .is_some_and(|fixed| *fixed != condition.colour)
            {
                return None;
            }
            assignments.insert(condition.node.clone(), condition.colour.clone());
        }

        let mut beliefs = self.state.neighbour_assignments.clone();
        for reported in &offer.assignments {
            if !self.owns(&reported.node) {
                beliefs.insert(reported.node.clone(), reported.colour.clone());
            }
        }

        let mut merged = beliefs.clone();
        merged.extend(assignments.clone());
        Some((assignments, beliefs, self.problem.evaluate(&merged)))
    }

    /// Conditions of an offer this agent can never satisfy: nodes outside
    /// the cluster and fixed-colour contradictions.
    fn permanently_impossible_conditions(&self, offer: &ConditionalOffer) -> Vec<NodeColour> {
        offer
            .conditions
            .iter()
            .filter(|condition| {
                !self.owns(&condition.node)
                    || self
                        .problem
                        .fixed_colour(&condition.node)
                        .is_some_and(|fixed| *fixed != condition.colour)
            })
            .map(|condition| condition.node_colour())
            .collect()
    }

    fn exhaustive_probe(&self, beliefs: &Assignment) -> Result<Assignment, SolverError> {
        match self.solver.strategy() {
            SearchStrategy::Exhaustive => Ok(self.solver.compute_assignment(beliefs)),
            SearchStrategy::Greedy => {
                let solver = LocalClusterSolver::new(
                    self.solver.nodes().to_vec(),
                    Arc::clone(&self.problem),
                    SearchStrategy::Exhaustive,
                    self.config.exhaustive_cluster_limit,
                )?;
                Ok(solver.compute_assignment(beliefs))
            }
        }
    }

    fn broadcast_boundary(&mut self) -> Vec<Envelope> {
        let mut envelopes = Vec::new();
        for recipient in self.neighbour_agents() {
            let boundary = self.boundary_assignment_for(&recipient);
            let offer = ConditionalOffer::announcement(to_node_colours(&boundary))
                .with_reason("bargain-opening");
            self.state
                .proposed_nodes
                .insert(recipient.clone(), boundary);
            self.diagnostics.announcements_sent += 1;
            let mv = RbMove::from(offer);
            self.observer.on_move_sent(&self.name, &recipient, &mv);
            envelopes.push(Envelope {
                sender: self.name.clone(),
                recipient,
                content: Payload::Move(mv),
            });
        }
        envelopes
    }
}

fn to_node_colours(map: &BTreeMap<NodeId, Colour>) -> Vec<NodeColour> {
    map.iter()
        .map(|(node, colour)| NodeColour {
            node: node.clone(),
            colour: colour.clone(),
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
