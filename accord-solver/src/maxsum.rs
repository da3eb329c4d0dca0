//! Max-Sum belief propagation for a single-node agent.
//!
//! Each solver owns one graph node, accumulates utility messages from its
//! neighbours, and per round picks a locally optimal colour and produces
//! one outgoing utility table per neighbour. Outgoing tables are
//! normalized by subtracting their maximum; without that step message
//! magnitudes grow without bound across rounds.

use accord_core::{Colour, ConstraintProblem, NodeId, SolverError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Per-colour utility table exchanged between Max-Sum nodes.
pub type UtilityTable = BTreeMap<Colour, f64>;

/// Outcome of a single Max-Sum round.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxSumStep {
    /// The colour selected this round.
    pub value: Colour,
    /// Whether the selection differs from the previous round.
    pub changed: bool,
    /// One outgoing utility table per neighbour, already normalized.
    pub outgoing: BTreeMap<NodeId, UtilityTable>,
}

/// Belief-propagation state for one node.
///
/// The tie-break among equally good colours is uniformly random through an
/// injected seeded RNG. The randomization is load-bearing: deterministic
/// tie-breaking locks symmetric neighbours into oscillation.
#[derive(Debug)]
pub struct MaxSumSolver {
    node: NodeId,
    problem: Arc<ConstraintProblem>,
    neighbours: BTreeSet<NodeId>,
    /// Incoming utility tables, zero-initialized per neighbour and colour.
    r_messages: BTreeMap<NodeId, UtilityTable>,
    /// Outgoing tables from the previous round, kept for diagnostics.
    previous_outgoing: BTreeMap<NodeId, UtilityTable>,
    current_value: Option<Colour>,
    rng: StdRng,
}

impl MaxSumSolver {
    /// Create a solver for `node`. The problem's domain is validated at
    /// problem construction, so an empty domain cannot reach this point;
    /// an unknown node is a setup error and fails fast.
    pub fn new(
        node: impl Into<NodeId>,
        problem: Arc<ConstraintProblem>,
        seed: u64,
    ) -> Result<Self, SolverError> {
        let node = node.into();
        if !problem.contains_node(&node) {
            return Err(SolverError::UnknownClusterNode { node });
        }

        let neighbours = problem.neighbours(&node);
        let zero_table: UtilityTable = problem
            .domain()
            .iter()
            .map(|c| (c.clone(), 0.0))
            .collect();
        let r_messages = neighbours
            .iter()
            .map(|n| (n.clone(), zero_table.clone()))
            .collect();

        Ok(Self {
            node,
            problem,
            neighbours,
            r_messages,
            previous_outgoing: BTreeMap::new(),
            current_value: None,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn current_value(&self) -> Option<&Colour> {
        self.current_value.as_ref()
    }

    pub fn neighbours(&self) -> &BTreeSet<NodeId> {
        &self.neighbours
    }

    /// Outgoing table sent to `neighbour` on the previous round, if any.
    pub fn previous_message(&self, neighbour: &NodeId) -> Option<&UtilityTable> {
        self.previous_outgoing.get(neighbour)
    }

    /// Own preference plus the sum of incoming per-colour utilities.
    pub fn local_utility(&self, colour: &Colour) -> f64 {
        self.problem.preference(&self.node, colour)
            + self
                .r_messages
                .values()
                .map(|table| table.get(colour).copied().unwrap_or(0.0))
                .sum::<f64>()
    }

    /// Local utility with one neighbour's contribution removed, used when
    /// computing the message back to that neighbour.
    fn local_utility_excluding(&self, colour: &Colour, excluded: &NodeId) -> f64 {
        self.problem.preference(&self.node, colour)
            + self
                .r_messages
                .iter()
                .filter(|(from, _)| *from != excluded)
                .map(|(_, table)| table.get(colour).copied().unwrap_or(0.0))
                .sum::<f64>()
    }

    /// Argmax over local utility; ties are broken by a uniform random
    /// choice among the maximal colours. A fixed colour on the node wins
    /// outright.
    pub fn select_best_value(&mut self) -> Colour {
        if let Some(fixed) = self.problem.fixed_colour(&self.node) {
            return fixed.clone();
        }

        let mut best_utility = f64::NEG_INFINITY;
        let mut best: Vec<&Colour> = Vec::new();
        for colour in self.problem.domain() {
            let utility = self.local_utility(colour);
            if utility > best_utility {
                best_utility = utility;
                best.clear();
                best.push(colour);
            } else if utility == best_utility {
                best.push(colour);
            }
        }

        let pick = if best.len() == 1 {
            0
        } else {
            self.rng.random_range(0..best.len())
        };
        best[pick].clone()
    }

    /// Utility table for one neighbour: for each candidate colour `v` the
    /// neighbour might take, the best this node can do given `v`, with the
    /// neighbour's own influence excluded. The table is normalized so its
    /// maximum entry is exactly zero.
    pub fn compute_outgoing_message(&self, neighbour: &NodeId) -> UtilityTable {
        let penalty = self.problem.conflict_penalty();
        let mut table = UtilityTable::new();
        for v in self.problem.domain() {
            let mut best = f64::NEG_INFINITY;
            for u in self.problem.domain() {
                let clash = if u == v { -penalty } else { 0.0 };
                let utility = clash + self.local_utility_excluding(u, neighbour);
                if utility > best {
                    best = utility;
                }
            }
            table.insert(v.clone(), best);
        }

        let max = table
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        for value in table.values_mut() {
            *value -= max;
        }
        table
    }

    /// Record an incoming utility table. Tables from nodes that are not
    /// neighbours are ignored (malformed input, never fatal).
    pub fn receive_message(&mut self, from: &NodeId, table: UtilityTable) {
        if self.neighbours.contains(from) {
            self.r_messages.insert(from.clone(), table);
        }
    }

    /// One synchronous round: re-select the best colour, then produce one
    /// normalized outgoing table per neighbour. The tables computed here
    /// are stored as `previous_outgoing` for diagnostics.
    pub fn step(&mut self) -> MaxSumStep {
        let value = self.select_best_value();
        let changed = self.current_value.as_ref() != Some(&value);
        self.current_value = Some(value.clone());

        let outgoing: BTreeMap<NodeId, UtilityTable> = self
            .neighbours
            .iter()
            .map(|n| (n.clone(), self.compute_outgoing_message(n)))
            .collect();
        self.previous_outgoing = outgoing.clone();

        MaxSumStep {
            value,
            changed,
            outgoing,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
