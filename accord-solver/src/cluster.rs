//! Joint colouring for a cluster of co-owned nodes.
//!
//! Given believed colours for externally-owned neighbours, the solver
//! computes a joint assignment for its cluster either greedily (fast,
//! order-dependent) or by exhaustive enumeration of the domain product
//! (optimal, exponential; guarded by a size limit at construction).

use accord_core::{Assignment, Colour, ConstraintProblem, NodeId, SolverError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::trace;

/// Local search strategy, selected per agent at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Sequential colouring in fixed node order; each node takes the
    /// cheapest colour given already-coloured cluster nodes and external
    /// beliefs, first-in-domain on ties. Deterministic given ordering.
    Greedy,
    /// Full enumeration of the `|domain|^|cluster|` product, scored by
    /// merging each candidate with the neighbour beliefs and evaluating
    /// the problem. Ties keep the first candidate in enumeration order
    /// (implementation-defined). Intended for small clusters only.
    Exhaustive,
}

/// Solver for one agent's cluster of nodes.
#[derive(Debug, Clone)]
pub struct LocalClusterSolver {
    /// Cluster nodes in fixed iteration order.
    nodes: Vec<NodeId>,
    problem: Arc<ConstraintProblem>,
    strategy: SearchStrategy,
}

impl LocalClusterSolver {
    /// Create a solver. Fails fast on an empty cluster, on nodes the
    /// problem does not know, and on clusters too large for exhaustive
    /// enumeration (`exhaustive_limit`, only checked for
    /// [`SearchStrategy::Exhaustive`]).
    pub fn new(
        nodes: Vec<NodeId>,
        problem: Arc<ConstraintProblem>,
        strategy: SearchStrategy,
        exhaustive_limit: usize,
    ) -> Result<Self, SolverError> {
        if nodes.is_empty() {
            return Err(SolverError::EmptyCluster);
        }
        for node in &nodes {
            if !problem.contains_node(node) {
                return Err(SolverError::UnknownClusterNode { node: node.clone() });
            }
        }
        if strategy == SearchStrategy::Exhaustive && nodes.len() > exhaustive_limit {
            return Err(SolverError::ClusterTooLarge {
                size: nodes.len(),
                limit: exhaustive_limit,
            });
        }
        Ok(Self {
            nodes,
            problem,
            strategy,
        })
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Compute a joint assignment for the cluster given the current
    /// beliefs about externally-owned nodes. Pure: beliefs are read-only
    /// and fixed node colours are always honoured.
    pub fn compute_assignment(&self, beliefs: &Assignment) -> Assignment {
        match self.strategy {
            SearchStrategy::Greedy => self.greedy(beliefs),
            SearchStrategy::Exhaustive => self.exhaustive(beliefs),
        }
    }

    fn greedy(&self, beliefs: &Assignment) -> Assignment {
        let mut chosen = Assignment::new();
        for node in &self.nodes {
            if let Some(fixed) = self.problem.fixed_colour(node) {
                chosen.insert(node.clone(), fixed.clone());
                continue;
            }

            let neighbours: BTreeSet<NodeId> = self.problem.neighbours(node);
            let mut best: Option<(f64, Colour)> = None;
            for colour in self.problem.domain() {
                let mut cost = -self.problem.preference(node, colour);
                for neighbour in &neighbours {
                    // Cluster nodes already coloured this pass shadow any
                    // stale external belief about them.
                    let other = chosen.get(neighbour).or_else(|| beliefs.get(neighbour));
                    if other == Some(colour) {
                        cost += self.problem.conflict_penalty();
                    }
                }
                // Strict comparison keeps the first colour in domain
                // order on ties.
                if best.as_ref().is_none_or(|(c, _)| cost < *c) {
                    best = Some((cost, colour.clone()));
                }
            }
            let (_, colour) = best.expect("domain is non-empty by problem construction");
            chosen.insert(node.clone(), colour);
        }
        chosen
    }

    fn exhaustive(&self, beliefs: &Assignment) -> Assignment {
        // Fixed nodes enumerate a single colour, everything else the full
        // domain.
        let per_node_domains: Vec<Vec<Colour>> = self
            .nodes
            .iter()
            .map(|node| match self.problem.fixed_colour(node) {
                Some(fixed) => vec![fixed.clone()],
                None => self.problem.domain().to_vec(),
            })
            .collect();

        let total: usize = per_node_domains.iter().map(Vec::len).product();
        trace!(cluster = self.nodes.len(), candidates = total, "exhaustive search");

        let mut indices = vec![0usize; self.nodes.len()];
        let mut best: Option<(f64, Assignment)> = None;
        loop {
            let mut merged = beliefs.clone();
            let mut candidate = Assignment::new();
            for (slot, node) in self.nodes.iter().enumerate() {
                let colour = per_node_domains[slot][indices[slot]].clone();
                merged.insert(node.clone(), colour.clone());
                candidate.insert(node.clone(), colour);
            }

            let score = self.problem.evaluate(&merged);
            // Strict comparison keeps the first candidate found on ties.
            if best.as_ref().is_none_or(|(s, _)| score < *s) {
                best = Some((score, candidate));
            }

            // Advance the mixed-radix counter; done when it wraps.
            let mut slot = self.nodes.len();
            loop {
                if slot == 0 {
                    return best.expect("at least one candidate enumerated").1;
                }
                slot -= 1;
                indices[slot] += 1;
                if indices[slot] < per_node_domains[slot].len() {
                    break;
                }
                indices[slot] = 0;
            }
        }
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

    fn path_problem() -> Arc<ConstraintProblem> {
        // h1 -- h2 -- h3, with x1 external to the cluster.
        Arc::new(
            ConstraintProblem::builder(rgb())
                .nodes(["h1", "h2", "h3", "x1"])
                .edge("h1", "h2")
                .edge("h2", "h3")
                .edge("h3", "x1")
                .build()
                .unwrap(),
        )
    }

    fn cluster(strategy: SearchStrategy) -> LocalClusterSolver {
        LocalClusterSolver::new(
            vec![NodeId::new("h1"), NodeId::new("h2"), NodeId::new("h3")],
            path_problem(),
            strategy,
            6,
        )
        .unwrap()
    }

    fn beliefs(pairs: &[(&str, &str)]) -> Assignment {
        pairs
            .iter()
            .map(|(n, c)| (NodeId::new(*n), Colour::new(*c)))
            .collect()
    }

    #[test]
    fn test_new_rejects_empty_cluster() {
        let err =
            LocalClusterSolver::new(Vec::new(), path_problem(), SearchStrategy::Greedy, 6)
                .unwrap_err();
        assert_eq!(err, SolverError::EmptyCluster);
    }

    #[test]
    fn test_new_rejects_oversized_exhaustive_cluster() {
        let nodes = vec![NodeId::new("h1"), NodeId::new("h2"), NodeId::new("h3")];
        let err = LocalClusterSolver::new(
            nodes.clone(),
            path_problem(),
            SearchStrategy::Exhaustive,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::ClusterTooLarge { size: 3, limit: 2 }));

        // The same cluster is fine greedily.
        assert!(LocalClusterSolver::new(nodes, path_problem(), SearchStrategy::Greedy, 2).is_ok());
    }

    #[test]
    fn test_greedy_avoids_internal_and_external_conflicts() {
        let solver = cluster(SearchStrategy::Greedy);
        let result = solver.compute_assignment(&beliefs(&[("x1", "red")]));

        let mut merged = beliefs(&[("x1", "red")]);
        merged.extend(result.clone());
        assert!(solver.problem.is_valid(&merged));
        // First-in-domain tie-break: h1 takes red, h2 green, h3 must dodge
        // both green and the external red.
        assert_eq!(result.get(&NodeId::new("h1")), Some(&Colour::new("red")));
        assert_eq!(result.get(&NodeId::new("h2")), Some(&Colour::new("green")));
        assert_eq!(result.get(&NodeId::new("h3")), Some(&Colour::new("blue")));
    }

    #[test]
    fn test_greedy_is_deterministic() {
        let solver = cluster(SearchStrategy::Greedy);
        let b = beliefs(&[("x1", "green")]);
        assert_eq!(solver.compute_assignment(&b), solver.compute_assignment(&b));
    }

    #[test]
    fn test_exhaustive_finds_conflict_free_assignment() {
        let solver = cluster(SearchStrategy::Exhaustive);
        let b = beliefs(&[("x1", "red")]);
        let result = solver.compute_assignment(&b);

        let mut merged = b.clone();
        merged.extend(result);
        assert_eq!(solver.problem.evaluate(&merged), 0.0);
    }

    #[test]
    fn test_exhaustive_honours_fixed_assignments() {
        let problem = Arc::new(
            ConstraintProblem::builder(rgb())
                .nodes(["h1", "h2"])
                .edge("h1", "h2")
                .fixed("h1", "green")
                .build()
                .unwrap(),
        );
        let solver = LocalClusterSolver::new(
            vec![NodeId::new("h1"), NodeId::new("h2")],
            problem,
            SearchStrategy::Exhaustive,
            6,
        )
        .unwrap();

        let result = solver.compute_assignment(&Assignment::new());
        assert_eq!(result.get(&NodeId::new("h1")), Some(&Colour::new("green")));
        assert_ne!(result.get(&NodeId::new("h2")), Some(&Colour::new("green")));
    }

    #[test]
    fn test_exhaustive_prefers_preferred_colours() {
        let problem = Arc::new(
            ConstraintProblem::builder(rgb())
                .nodes(["h1", "h2"])
                .edge("h1", "h2")
                .preference("h1", "blue", 0.25)
                .preference("h2", "blue", 0.5)
                .build()
                .unwrap(),
        );
        let solver = LocalClusterSolver::new(
            vec![NodeId::new("h1"), NodeId::new("h2")],
            problem,
            SearchStrategy::Exhaustive,
            6,
        )
        .unwrap();

        let result = solver.compute_assignment(&Assignment::new());
        // Both want blue but only one can have it; the larger bonus wins.
        assert_eq!(result.get(&NodeId::new("h2")), Some(&Colour::new("blue")));
        assert_ne!(result.get(&NodeId::new("h1")), Some(&Colour::new("blue")));
    }

    #[test]
    fn test_compute_assignment_never_mutates_beliefs() {
        let solver = cluster(SearchStrategy::Exhaustive);
        let b = beliefs(&[("x1", "red")]);
        let before = b.clone();
        let _ = solver.compute_assignment(&b);
        assert_eq!(b, before);
    }
}
