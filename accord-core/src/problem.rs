//! Immutable description of a graph-colouring constraint problem.
//!
//! A [`ConstraintProblem`] holds the node set, undirected adjacency, the
//! shared colour domain, per-node colour preferences, the uniform conflict
//! penalty, and any fixed node colours. It is read-only after construction
//! and safe to share by reference across agents.

use crate::error::ProblemError;
use crate::{Colour, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A (possibly partial) colouring: node to colour.
///
/// Every operation on [`ConstraintProblem`] is total over arbitrary
/// partial maps; nodes missing from the map simply contribute nothing.
pub type Assignment = BTreeMap<NodeId, Colour>;

/// Immutable graph-colouring problem description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintProblem {
    /// All nodes in the graph.
    nodes: BTreeSet<NodeId>,
    /// Undirected, de-duplicated edges; each pair stored lexicographically.
    edges: BTreeSet<(NodeId, NodeId)>,
    /// Adjacency derived from `edges`, one entry per node.
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Ordered colour domain shared by every node.
    domain: Vec<Colour>,
    /// Additive per-node colour bonuses, subtracted from the penalty.
    preferences: BTreeMap<NodeId, BTreeMap<Colour, f64>>,
    /// Cost added per violated edge.
    conflict_penalty: f64,
    /// Immutable node colours.
    fixed_assignments: BTreeMap<NodeId, Colour>,
}

impl ConstraintProblem {
    /// Start building a problem over the given colour domain.
    pub fn builder(domain: Vec<Colour>) -> ConstraintProblemBuilder {
        ConstraintProblemBuilder {
            nodes: BTreeSet::new(),
            edges: Vec::new(),
            domain,
            preferences: BTreeMap::new(),
            conflict_penalty: 1.0,
            fixed_assignments: BTreeMap::new(),
        }
    }

    /// Penalty of an assignment: `conflict_penalty` per edge whose two
    /// present endpoints share a colour, minus the preference bonus of
    /// every assigned colour. Edges with a missing endpoint contribute
    /// nothing, so partial assignments are always valid inputs.
    pub fn evaluate(&self, assignment: &Assignment) -> f64 {
        let mut penalty = 0.0;
        for (a, b) in &self.edges {
            if let (Some(ca), Some(cb)) = (assignment.get(a), assignment.get(b)) {
                if ca == cb {
                    penalty += self.conflict_penalty;
                }
            }
        }
        for (node, colour) in assignment {
            penalty -= self.preference(node, colour);
        }
        penalty
    }

    /// True iff no edge with both endpoints present has matching colours.
    /// Ignores preferences and fixed constraints.
    pub fn is_valid(&self, assignment: &Assignment) -> bool {
        self.edges.iter().all(|(a, b)| {
            match (assignment.get(a), assignment.get(b)) {
                (Some(ca), Some(cb)) => ca != cb,
                _ => true,
            }
        })
    }

    /// True iff every node present in both the assignment and the fixed
    /// constraints agrees with its fixed colour.
    pub fn respects_fixed(&self, assignment: &Assignment) -> bool {
        self.fixed_assignments
            .iter()
            .all(|(node, fixed)| assignment.get(node).is_none_or(|c| c == fixed))
    }

    /// Number of violated edges in an assignment (both endpoints present,
    /// matching colours).
    pub fn conflict_count(&self, assignment: &Assignment) -> usize {
        self.edges
            .iter()
            .filter(|(a, b)| {
                matches!(
                    (assignment.get(a), assignment.get(b)),
                    (Some(ca), Some(cb)) if ca == cb
                )
            })
            .count()
    }

    /// Neighbours of a node. Unknown nodes have no neighbours.
    pub fn neighbours(&self, node: &NodeId) -> BTreeSet<NodeId> {
        self.adjacency.get(node).cloned().unwrap_or_default()
    }

    /// Whether two nodes share an edge.
    pub fn are_adjacent(&self, a: &NodeId, b: &NodeId) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|neigh| neigh.contains(b))
    }

    /// Preference bonus for colouring `node` with `colour`; defaults to 0.
    pub fn preference(&self, node: &NodeId, colour: &Colour) -> f64 {
        self.preferences
            .get(node)
            .and_then(|per_colour| per_colour.get(colour))
            .copied()
            .unwrap_or(0.0)
    }

    /// Fixed colour for a node, if constrained.
    pub fn fixed_colour(&self, node: &NodeId) -> Option<&Colour> {
        self.fixed_assignments.get(node)
    }

    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.nodes.contains(node)
    }

    pub fn edges(&self) -> &BTreeSet<(NodeId, NodeId)> {
        &self.edges
    }

    /// The ordered colour domain shared by all nodes.
    pub fn domain(&self) -> &[Colour] {
        &self.domain
    }

    pub fn conflict_penalty(&self) -> f64 {
        self.conflict_penalty
    }

    pub fn fixed_assignments(&self) -> &BTreeMap<NodeId, Colour> {
        &self.fixed_assignments
    }
}

/// Builder for [`ConstraintProblem`]; `build()` validates the description
/// and fails fast on structural misconfiguration.
#[derive(Debug, Clone)]
pub struct ConstraintProblemBuilder {
    nodes: BTreeSet<NodeId>,
    edges: Vec<(NodeId, NodeId)>,
    domain: Vec<Colour>,
    preferences: BTreeMap<NodeId, BTreeMap<Colour, f64>>,
    conflict_penalty: f64,
    fixed_assignments: BTreeMap<NodeId, Colour>,
}

impl ConstraintProblemBuilder {
    /// Add a node to the graph.
    pub fn node(mut self, node: impl Into<NodeId>) -> Self {
        self.nodes.insert(node.into());
        self
    }

    /// Add several nodes to the graph.
    pub fn nodes<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        self.nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Add an undirected edge. Duplicates and orientation are normalized
    /// away at build time.
    pub fn edge(mut self, a: impl Into<NodeId>, b: impl Into<NodeId>) -> Self {
        self.edges.push((a.into(), b.into()));
        self
    }

    /// Set the additive preference bonus for a node/colour pair.
    pub fn preference(
        mut self,
        node: impl Into<NodeId>,
        colour: impl Into<Colour>,
        bonus: f64,
    ) -> Self {
        self.preferences
            .entry(node.into())
            .or_default()
            .insert(colour.into(), bonus);
        self
    }

    /// Set the cost added per violated edge (default 1.0).
    pub fn conflict_penalty(mut self, penalty: f64) -> Self {
        self.conflict_penalty = penalty;
        self
    }

    /// Fix a node to a colour. Assignments disagreeing with a fixed
    /// colour fail [`ConstraintProblem::respects_fixed`].
    pub fn fixed(mut self, node: impl Into<NodeId>, colour: impl Into<Colour>) -> Self {
        self.fixed_assignments.insert(node.into(), colour.into());
        self
    }

    /// Validate and build the immutable problem.
    pub fn build(self) -> Result<ConstraintProblem, ProblemError> {
        if self.domain.is_empty() {
            return Err(ProblemError::EmptyDomain);
        }
        let mut seen = BTreeSet::new();
        for colour in &self.domain {
            if !seen.insert(colour.clone()) {
                return Err(ProblemError::DuplicateColour {
                    colour: colour.clone(),
                });
            }
        }

        let mut edges = BTreeSet::new();
        let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> = self
            .nodes
            .iter()
            .map(|n| (n.clone(), BTreeSet::new()))
            .collect();
        for (a, b) in self.edges {
            if a == b {
                return Err(ProblemError::SelfLoop { node: a });
            }
            for endpoint in [&a, &b] {
                if !self.nodes.contains(endpoint) {
                    return Err(ProblemError::UnknownNode {
                        node: endpoint.clone(),
                        context: "an edge".to_string(),
                    });
                }
            }
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            if let Some(neigh) = adjacency.get_mut(&lo) {
                neigh.insert(hi.clone());
            }
            if let Some(neigh) = adjacency.get_mut(&hi) {
                neigh.insert(lo.clone());
            }
            edges.insert((lo, hi));
        }

        for (node, per_colour) in &self.preferences {
            if !self.nodes.contains(node) {
                return Err(ProblemError::UnknownNode {
                    node: node.clone(),
                    context: "a preference entry".to_string(),
                });
            }
            for colour in per_colour.keys() {
                if !seen.contains(colour) {
                    return Err(ProblemError::ColourOutsideDomain {
                        node: node.clone(),
                        colour: colour.clone(),
                    });
                }
            }
        }

        for (node, colour) in &self.fixed_assignments {
            if !self.nodes.contains(node) {
                return Err(ProblemError::UnknownNode {
                    node: node.clone(),
                    context: "a fixed assignment".to_string(),
                });
            }
            if !seen.contains(colour) {
                return Err(ProblemError::ColourOutsideDomain {
                    node: node.clone(),
                    colour: colour.clone(),
                });
            }
        }

        Ok(ConstraintProblem {
            nodes: self.nodes,
            edges,
            adjacency,
            domain: self.domain,
            preferences: self.preferences,
            conflict_penalty: self.conflict_penalty,
            fixed_assignments: self.fixed_assignments,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb() -> Vec<Colour> {
        vec![Colour::new("red"), Colour::new("green"), Colour::new("blue")]
    }

    fn triangle() -> ConstraintProblem {
        ConstraintProblem::builder(rgb())
            .nodes(["h1", "h2", "h3"])
            .edge("h1", "h2")
            .edge("h2", "h3")
            .edge("h1", "h3")
            .build()
            .unwrap()
    }

    fn assign(pairs: &[(&str, &str)]) -> Assignment {
        pairs
            .iter()
            .map(|(n, c)| (NodeId::new(*n), Colour::new(*c)))
            .collect()
    }

    #[test]
    fn test_evaluate_counts_each_violated_edge_once() {
        let problem = triangle();
        let all_red = assign(&[("h1", "red"), ("h2", "red"), ("h3", "red")]);
        assert_eq!(problem.evaluate(&all_red), 3.0);

        let proper = assign(&[("h1", "red"), ("h2", "green"), ("h3", "blue")]);
        assert_eq!(problem.evaluate(&proper), 0.0);
        assert!(problem.is_valid(&proper));
        assert!(!problem.is_valid(&all_red));
    }

    #[test]
    fn test_evaluate_is_total_over_partial_assignments() {
        let problem = triangle();
        assert_eq!(problem.evaluate(&Assignment::new()), 0.0);

        // h3 missing: only the h1--h2 edge can fire.
        let partial = assign(&[("h1", "red"), ("h2", "red")]);
        assert_eq!(problem.evaluate(&partial), 1.0);
    }

    #[test]
    fn test_evaluate_subtracts_preferences() {
        let problem = ConstraintProblem::builder(rgb())
            .nodes(["h1", "h2"])
            .edge("h1", "h2")
            .preference("h1", "red", 0.5)
            .build()
            .unwrap();
        let conflicting = assign(&[("h1", "red"), ("h2", "red")]);
        assert_eq!(problem.evaluate(&conflicting), 0.5);

        let clean = assign(&[("h1", "red"), ("h2", "blue")]);
        assert_eq!(problem.evaluate(&clean), -0.5);
    }

    #[test]
    fn test_edges_are_deduplicated_and_undirected() {
        let problem = ConstraintProblem::builder(rgb())
            .nodes(["h1", "h2"])
            .edge("h1", "h2")
            .edge("h2", "h1")
            .build()
            .unwrap();
        assert_eq!(problem.edges().len(), 1);
        assert!(problem.are_adjacent(&NodeId::new("h1"), &NodeId::new("h2")));
        assert!(problem.are_adjacent(&NodeId::new("h2"), &NodeId::new("h1")));
    }

    #[test]
    fn test_respects_fixed() {
        let problem = ConstraintProblem::builder(rgb())
            .nodes(["h1", "h2"])
            .edge("h1", "h2")
            .fixed("h1", "red")
            .build()
            .unwrap();
        assert!(problem.respects_fixed(&assign(&[("h1", "red"), ("h2", "blue")])));
        assert!(!problem.respects_fixed(&assign(&[("h1", "green")])));
        // A fixed node absent from the assignment does not violate.
        assert!(problem.respects_fixed(&assign(&[("h2", "red")])));
    }

    #[test]
    fn test_build_rejects_self_loop() {
        let err = ConstraintProblem::builder(rgb())
            .node("h1")
            .edge("h1", "h1")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ProblemError::SelfLoop {
                node: NodeId::new("h1")
            }
        );
    }

    #[test]
    fn test_build_rejects_empty_domain() {
        let err = ConstraintProblem::builder(Vec::new())
            .node("h1")
            .build()
            .unwrap_err();
        assert_eq!(err, ProblemError::EmptyDomain);
    }

    #[test]
    fn test_build_rejects_unknown_edge_endpoint() {
        let err = ConstraintProblem::builder(rgb())
            .node("h1")
            .edge("h1", "h9")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProblemError::UnknownNode { .. }));
    }

    #[test]
    fn test_build_rejects_fixed_colour_outside_domain() {
        let err = ConstraintProblem::builder(rgb())
            .node("h1")
            .fixed("h1", "purple")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProblemError::ColourOutsideDomain { .. }));
    }
}
