//! ACCORD Test Utilities
//!
//! Centralized test infrastructure for the ACCORD workspace:
//! - Proptest generators for the wire and problem types
//! - Pre-built problem fixtures for common scenarios
//! - A synchronous round driver for end-to-end negotiation tests

// Re-export the types the fixtures hand out, for convenience.
pub use accord_core::{
    Accept, AccordError, AccordResult, AgentName, Assignment, Colour, Condition,
    ConditionalOffer, ConstraintProblem, EngineConfig, Envelope, FeasibilityQuery,
    FeasibilityResponse, NodeColour, NodeId, OfferId, Payload, RbMove, Reject,
};
pub use accord_protocol::{NegotiationEngine, Phase};
pub use accord_solver::SearchStrategy;
pub use accord_transport::{InMemoryTransport, Transport};

use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating ACCORD wire and problem types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a random OfferId.
    pub fn arb_offer_id() -> impl Strategy<Value = OfferId> {
        arb_uuid().prop_map(OfferId::from)
    }

    /// Generate an agent name.
    pub fn arb_agent_name() -> impl Strategy<Value = AgentName> {
        "agent-[a-z]{1,6}".prop_map(AgentName::new)
    }

    /// Generate a node id.
    pub fn arb_node_id() -> impl Strategy<Value = NodeId> {
        "h[0-9]{1,3}".prop_map(NodeId::new)
    }

    /// Generate a colour from a small named palette.
    pub fn arb_colour() -> impl Strategy<Value = Colour> {
        prop::sample::select(vec!["red", "green", "blue", "yellow", "cyan"])
            .prop_map(Colour::new)
    }

    /// Generate a bare node/colour pair.
    pub fn arb_node_colour() -> impl Strategy<Value = NodeColour> {
        (arb_node_id(), arb_colour())
            .prop_map(|(node, colour)| NodeColour { node, colour })
    }

    /// Generate an offer condition (node, colour, owning agent).
    pub fn arb_condition() -> impl Strategy<Value = Condition> {
        (arb_node_id(), arb_colour(), arb_agent_name()).prop_map(|(node, colour, owner)| {
            Condition {
                node,
                colour,
                owner,
            }
        })
    }

    /// Generate diagnostic reason tags.
    pub fn arb_reasons() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z][a-z-]{2,18}", 0..3)
    }

    /// Generate a ConditionalOffer; empty conditions make it an
    /// unconditional announcement.
    pub fn arb_conditional_offer() -> impl Strategy<Value = ConditionalOffer> {
        (
            arb_offer_id(),
            prop::collection::vec(arb_condition(), 0..4),
            prop::collection::vec(arb_node_colour(), 0..4),
            arb_reasons(),
        )
            .prop_map(|(offer_id, conditions, assignments, reasons)| ConditionalOffer {
                offer_id,
                conditions,
                assignments,
                reasons,
            })
    }

    /// Generate an Accept.
    pub fn arb_accept() -> impl Strategy<Value = Accept> {
        (arb_offer_id(), arb_reasons())
            .prop_map(|(refers_to, reasons)| Accept { refers_to, reasons })
    }

    /// Generate a Reject with each optional field both present and absent.
    pub fn arb_reject() -> impl Strategy<Value = Reject> {
        (
            arb_offer_id(),
            arb_reasons(),
            prop::option::of(prop::collection::vec(arb_node_colour(), 1..4)),
            prop::option::of(prop::collection::vec(
                prop::collection::vec(arb_node_colour(), 1..3),
                1..3,
            )),
        )
            .prop_map(
                |(refers_to, reasons, impossible_conditions, impossible_combinations)| Reject {
                    refers_to,
                    reasons,
                    impossible_conditions,
                    impossible_combinations,
                },
            )
    }

    /// Generate a FeasibilityQuery.
    pub fn arb_feasibility_query() -> impl Strategy<Value = FeasibilityQuery> {
        (
            arb_offer_id(),
            prop::collection::vec(arb_condition(), 0..4),
            arb_reasons(),
        )
            .prop_map(|(offer_id, conditions, reasons)| FeasibilityQuery {
                offer_id,
                conditions,
                reasons,
            })
    }

    /// Generate a FeasibilityResponse.
    pub fn arb_feasibility_response() -> impl Strategy<Value = FeasibilityResponse> {
        (
            arb_offer_id(),
            any::<bool>(),
            -100.0..100.0f64,
            "[a-z ]{0,40}",
            arb_reasons(),
        )
            .prop_map(|(refers_to, feasible, penalty, details, reasons)| FeasibilityResponse {
                refers_to,
                feasible,
                penalty,
                details,
                reasons,
            })
    }

    /// Generate any of the five protocol moves.
    pub fn arb_rb_move() -> impl Strategy<Value = RbMove> {
        prop_oneof![
            arb_conditional_offer().prop_map(RbMove::ConditionalOffer),
            arb_accept().prop_map(RbMove::Accept),
            arb_reject().prop_map(RbMove::Reject),
            arb_feasibility_query().prop_map(RbMove::FeasibilityQuery),
            arb_feasibility_response().prop_map(RbMove::FeasibilityResponse),
        ]
    }

    /// Generate a small random problem over named nodes `h0..hN` with the
    /// red/green/blue domain.
    pub fn arb_problem() -> impl Strategy<Value = ConstraintProblem> {
        (2..6usize).prop_flat_map(|node_count| {
            prop::collection::vec(
                (0..node_count, 0..node_count).prop_filter("no self-loops", |(a, b)| a != b),
                0..8,
            )
            .prop_map(move |edge_pairs| {
                let mut builder = ConstraintProblem::builder(super::fixtures::rgb());
                for i in 0..node_count {
                    builder = builder.node(NodeId::new(format!("h{i}")));
                }
                for (a, b) in edge_pairs {
                    builder = builder.edge(
                        NodeId::new(format!("h{a}")),
                        NodeId::new(format!("h{b}")),
                    );
                }
                builder.build().expect("generated problems are structurally valid")
            })
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built problems and engine sets for common scenarios.

    use super::*;

    /// The three-colour domain used by most scenario tests.
    pub fn rgb() -> Vec<Colour> {
        vec![Colour::new("red"), Colour::new("green"), Colour::new("blue")]
    }

    /// Three mutually adjacent nodes, one per agent, no preferences.
    /// A proper colouring needs all three colours.
    pub fn triangle_problem() -> Arc<ConstraintProblem> {
        Arc::new(
            ConstraintProblem::builder(rgb())
                .nodes(["h1", "h2", "h3"])
                .edge("h1", "h2")
                .edge("h2", "h3")
                .edge("h1", "h3")
                .build()
                .expect("triangle fixture builds"),
        )
    }

    /// Ownership map for [`triangle_problem`]: `agent-a`/`h1`,
    /// `agent-b`/`h2`, `agent-c`/`h3`.
    pub fn triangle_owners() -> BTreeMap<NodeId, AgentName> {
        [
            (NodeId::new("h1"), AgentName::new("agent-a")),
            (NodeId::new("h2"), AgentName::new("agent-b")),
            (NodeId::new("h3"), AgentName::new("agent-c")),
        ]
        .into_iter()
        .collect()
    }

    /// One engine per triangle node, seeded distinctly from `seed`.
    pub fn triangle_engines(
        strategy: SearchStrategy,
        seed: u64,
    ) -> (Arc<ConstraintProblem>, Vec<NegotiationEngine>) {
        let problem = triangle_problem();
        let owners = triangle_owners();
        let engines = [("agent-a", "h1"), ("agent-b", "h2"), ("agent-c", "h3")]
            .into_iter()
            .enumerate()
            .map(|(i, (agent, node))| {
                NegotiationEngine::new(
                    agent,
                    vec![NodeId::new(node)],
                    Arc::clone(&problem),
                    owners.clone(),
                    strategy,
                    EngineConfig::default(),
                    seed.wrapping_add(i as u64),
                )
                .expect("triangle engine builds")
            })
            .collect();
        (problem, engines)
    }

    /// Two two-node clusters joined by a single boundary edge, with `h1`
    /// fixed to red on the first side:
    ///
    /// ```text
    ///   agent-a: h1 -- h2      agent-b: h3 -- h4
    ///            |______________________|
    ///               boundary edge h1--h3
    /// ```
    pub fn two_cluster_problem() -> Arc<ConstraintProblem> {
        Arc::new(
            ConstraintProblem::builder(rgb())
                .nodes(["h1", "h2", "h3", "h4"])
                .edge("h1", "h2")
                .edge("h3", "h4")
                .edge("h1", "h3")
                .fixed("h1", "red")
                .build()
                .expect("two-cluster fixture builds"),
        )
    }

    /// Ownership map for [`two_cluster_problem`].
    pub fn two_cluster_owners() -> BTreeMap<NodeId, AgentName> {
        [
            (NodeId::new("h1"), AgentName::new("agent-a")),
            (NodeId::new("h2"), AgentName::new("agent-a")),
            (NodeId::new("h3"), AgentName::new("agent-b")),
            (NodeId::new("h4"), AgentName::new("agent-b")),
        ]
        .into_iter()
        .collect()
    }

    /// Exhaustive-search engines for the two clusters.
    pub fn two_cluster_engines(seed: u64) -> (Arc<ConstraintProblem>, Vec<NegotiationEngine>) {
        let problem = two_cluster_problem();
        let owners = two_cluster_owners();
        let engines = [
            ("agent-a", vec![NodeId::new("h1"), NodeId::new("h2")]),
            ("agent-b", vec![NodeId::new("h3"), NodeId::new("h4")]),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (agent, cluster))| {
            NegotiationEngine::new(
                agent,
                cluster,
                Arc::clone(&problem),
                owners.clone(),
                SearchStrategy::Exhaustive,
                EngineConfig::default(),
                seed.wrapping_add(i as u64),
            )
            .expect("two-cluster engine builds")
        })
        .collect();
        (problem, engines)
    }
}

// ============================================================================
// SYNCHRONOUS ROUND DRIVER
// ============================================================================

/// Round harness for end-to-end negotiation tests.
///
/// Each round, every engine steps exactly once, then every produced
/// envelope is delivered before the next round begins. Replies produced
/// while receiving (feasibility responses) are queued and delivered with
/// the next barrier, never within the same round.
pub struct SyncDriver {
    problem: Arc<ConstraintProblem>,
    engines: Vec<NegotiationEngine>,
    transport: InMemoryTransport,
    rounds_run: u64,
}

impl SyncDriver {
    pub fn new(problem: Arc<ConstraintProblem>, engines: Vec<NegotiationEngine>) -> Self {
        Self {
            problem,
            engines,
            transport: InMemoryTransport::new(),
            rounds_run: 0,
        }
    }

    /// Announce a phase to every engine and deliver the resulting
    /// broadcast (the bargaining transition emits boundary announcements).
    pub fn announce_phase(&mut self, phase: Phase) {
        let mut outbox = Vec::new();
        for engine in &mut self.engines {
            outbox.extend(engine.announce_phase(phase));
        }
        self.dispatch(outbox);
        self.deliver();
    }

    /// One synchronous round: step every engine, then barrier-deliver.
    pub fn run_round(&mut self) {
        self.rounds_run += 1;
        let mut outbox = Vec::new();
        for engine in &mut self.engines {
            outbox.extend(engine.step());
        }
        self.dispatch(outbox);
        self.deliver();
    }

    /// Run rounds until every engine is satisfied and the joint
    /// assignment is conflict-free, or until `max_rounds` rounds have
    /// passed. Returns whether the run settled.
    pub fn run_until_quiescent(&mut self, max_rounds: u64) -> bool {
        for _ in 0..max_rounds {
            self.run_round();
            if self.global_penalty() == 0.0 && self.all_satisfied() {
                return true;
            }
        }
        false
    }

    /// The union of every engine's own assignments.
    pub fn global_assignment(&self) -> Assignment {
        let mut merged = Assignment::new();
        for engine in &self.engines {
            merged.extend(engine.assignments().clone());
        }
        merged
    }

    /// Penalty of the joint assignment over actual (not believed) colours.
    pub fn global_penalty(&self) -> f64 {
        self.problem.evaluate(&self.global_assignment())
    }

    pub fn all_satisfied(&self) -> bool {
        self.engines.iter().all(NegotiationEngine::is_satisfied)
    }

    pub fn rounds_run(&self) -> u64 {
        self.rounds_run
    }

    pub fn engine(&self, name: &AgentName) -> Option<&NegotiationEngine> {
        self.engines.iter().find(|e| e.name() == name)
    }

    fn dispatch(&mut self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            self.transport
                .send(envelope)
                .expect("in-memory send cannot fail");
        }
    }

    fn deliver(&mut self) {
        let batch = self.transport.deliver();
        let mut replies = Vec::new();
        for envelope in batch {
            if let Some(engine) = self
                .engines
                .iter_mut()
                .find(|e| *e.name() == envelope.recipient)
            {
                replies.extend(engine.receive(&envelope));
            }
        }
        self.dispatch(replies);
    }
}

// =============================================================================
// TESTS
// =============================================================================
