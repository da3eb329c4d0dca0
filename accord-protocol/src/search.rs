//! Counterfactual search over a neighbour's boundary configurations.
//!
//! Given the current beliefs about one recipient's boundary nodes, the
//! search asks: for which configuration of their nodes, answered by our
//! best local response, does the joint penalty come out lowest? The
//! winning pair becomes a conditional offer ("if you set X, I set Y").
//!
//! Negative memory prunes the space: configurations containing a
//! condition the recipient declared impossible, or covering a declared
//! impossible combination, are never scored. Condition sets the
//! recipient already rejected verbatim are only proposed again if no
//! near-best alternative exists within the configured slack window.

use crate::state::NegotiationState;
use accord_core::{
    AgentName, Assignment, Colour, ConstraintProblem, EngineConfig, NodeColour, NodeId,
};
use accord_solver::LocalClusterSolver;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// A scored candidate: the recipient configuration, our best response,
/// and the penalty of the two combined with the remaining beliefs.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateProposal {
    pub conditions: BTreeMap<NodeId, Colour>,
    pub response: Assignment,
    pub penalty: f64,
}

impl CandidateProposal {
    pub fn condition_set(&self) -> BTreeSet<NodeColour> {
        self.conditions
            .iter()
            .map(|(node, colour)| NodeColour {
                node: node.clone(),
                colour: colour.clone(),
            })
            .collect()
    }
}

/// Search for the best conditional offer to make to `recipient`.
///
/// `their_boundary` are the recipient's nodes adjacent to our cluster;
/// only those we hold beliefs for take part. Returns `None` when the
/// search is exhausted without a proposal worth sending - a valid
/// terminal outcome, not an error.
#[allow(clippy::too_many_arguments)]
pub fn search_conditional_offer(
    problem: &ConstraintProblem,
    solver: &LocalClusterSolver,
    state: &NegotiationState,
    recipient: &AgentName,
    their_boundary: &[NodeId],
    config: &EngineConfig,
    current_penalty: f64,
    conflict_exists: bool,
    rng: &mut StdRng,
) -> Option<CandidateProposal> {
    let believed: Vec<(NodeId, Colour)> = their_boundary
        .iter()
        .filter_map(|node| {
            state
                .neighbour_assignments
                .get(node)
                .map(|colour| (node.clone(), colour.clone()))
        })
        .collect();
    if believed.is_empty() {
        return None;
    }

    let mut candidates = enumerate_candidates(problem, &believed, config.full_enumeration_limit);
    // Candidate order is implementation-defined; a random order means the
    // early exit below lands on a uniformly random zero-penalty
    // configuration. Symmetric neighbours running the same deterministic
    // enumeration would otherwise mirror each other's proposals forever.
    candidates.shuffle(rng);

    // A zero-penalty hit normally ends the search, but once the recipient
    // has rejected condition sets we may need the runners-up as
    // alternatives, so the full set is scored.
    let keep_scoring_after_zero = state
        .rejected_condition_sets_for(recipient)
        .is_some_and(|sets| !sets.is_empty());

    let mut scored: Vec<CandidateProposal> = Vec::new();
    let mut skipped_by_memory = 0usize;
    for candidate in candidates {
        if !state.is_configuration_allowed(recipient, &candidate) {
            skipped_by_memory += 1;
            continue;
        }

        let mut shifted_beliefs = state.neighbour_assignments.clone();
        shifted_beliefs.extend(candidate.clone());
        let response = solver.compute_assignment(&shifted_beliefs);

        let mut merged = shifted_beliefs;
        merged.extend(response.clone());
        let penalty = problem.evaluate(&merged);

        // The status quo is not an offer.
        let is_current_beliefs = candidate
            .iter()
            .all(|(node, colour)| state.neighbour_assignments.get(node) == Some(colour));
        if is_current_beliefs && response == state.assignments {
            continue;
        }

        let done = penalty == 0.0 && !keep_scoring_after_zero;
        scored.push(CandidateProposal {
            conditions: candidate,
            response,
            penalty,
        });
        if done {
            break;
        }
    }
    trace!(
        recipient = %recipient,
        scored = scored.len(),
        pruned = skipped_by_memory,
        "counterfactual search"
    );

    // An offer must strictly improve, or match the current penalty while
    // a real conflict stands (an equal-penalty coordination move beats a
    // stalemate).
    scored.retain(|candidate| {
        candidate.penalty < current_penalty
            || (candidate.penalty == current_penalty && conflict_exists)
    });
    if scored.is_empty() {
        return None;
    }
    scored.sort_by(|a, b| a.penalty.total_cmp(&b.penalty));

    let best_penalty = scored[0].penalty;
    scored
        .into_iter()
        .take_while(|candidate| candidate.penalty <= best_penalty + config.alternative_slack)
        .find(|candidate| {
            !state.is_condition_set_rejected(recipient, &candidate.condition_set())
        })
}

/// Candidate configurations over the believed boundary nodes: the full
/// domain product when the node count is within the enumeration limit,
/// otherwise only the currently-believed configuration.
fn enumerate_candidates(
    problem: &ConstraintProblem,
    believed: &[(NodeId, Colour)],
    full_enumeration_limit: usize,
) -> Vec<BTreeMap<NodeId, Colour>> {
    if believed.len() > full_enumeration_limit {
        return vec![believed.iter().cloned().collect()];
    }

    let domain = problem.domain();
    let mut candidates = Vec::with_capacity(domain.len().pow(believed.len() as u32));
    let mut indices = vec![0usize; believed.len()];
    loop {
        let candidate: BTreeMap<NodeId, Colour> = believed
            .iter()
            .enumerate()
            .map(|(slot, (node, _))| (node.clone(), domain[indices[slot]].clone()))
            .collect();
        candidates.push(candidate);

        let mut slot = believed.len();
        loop {
            if slot == 0 {
                return candidates;
            }
            slot -= 1;
            indices[slot] += 1;
            if indices[slot] < domain.len() {
                break;
            }
            indices[slot] = 0;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
