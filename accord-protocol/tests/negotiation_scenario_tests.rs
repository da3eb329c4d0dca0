//! End-to-End Negotiation Scenarios
//!
//! Whole-protocol runs over the synchronous round driver: convergence on
//! the classic triangle, coordination around a fixed boundary colour,
//! deadlock avoidance through offer expiry, and permanent pruning from
//! reported impossible conditions.

use accord_core::{
    Colour, Condition, ConditionalOffer, ConstraintProblem, EngineConfig, Envelope, NodeColour,
    NodeId, RbMove, Reject,
};
use accord_protocol::{NegotiationEngine, Phase};
use accord_solver::SearchStrategy;
use accord_test_utils::{fixtures, AgentName, SyncDriver};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Single-node engine for `agent-a` owning `h1`, facing `agent-b`'s `h2`.
fn pair_engine(seed: u64) -> NegotiationEngine {
    let problem = Arc::new(
        ConstraintProblem::builder(fixtures::rgb())
            .nodes(["h1", "h2"])
            .edge("h1", "h2")
            .build()
            .unwrap(),
    );
    let owners: BTreeMap<NodeId, AgentName> = [
        (NodeId::new("h1"), AgentName::new("agent-a")),
        (NodeId::new("h2"), AgentName::new("agent-b")),
    ]
    .into_iter()
    .collect();
    NegotiationEngine::new(
        "agent-a",
        vec![NodeId::new("h1")],
        problem,
        owners,
        SearchStrategy::Greedy,
        EngineConfig::default(),
        seed,
    )
    .unwrap()
}

fn announcement_from_b(node: &str, colour: &str) -> Envelope {
    Envelope::negotiation(
        "agent-b",
        "agent-a",
        ConditionalOffer::announcement(vec![NodeColour::new(node, colour)]),
    )
}

/// Bring the pair engine to the state where it has a standing conflict
/// (`h1` and the believed `h2` both red) and is free to propose.
fn conflicted_pair_engine(seed: u64) -> NegotiationEngine {
    let mut engine = pair_engine(seed);
    engine.announce_phase(Phase::Bargain);
    engine.receive(&announcement_from_b("h2", "red"));
    // First step answers the announcement (penalty-neutral accept).
    let moves = engine.step();
    assert!(matches!(moves[0].as_move(), Some(RbMove::Accept(_))));
    engine
}

fn expect_offer(envelopes: &[Envelope]) -> ConditionalOffer {
    assert_eq!(envelopes.len(), 1);
    match envelopes[0].as_move() {
        Some(RbMove::ConditionalOffer(offer)) => offer.clone(),
        other => panic!("expected conditional offer, got {other:?}"),
    }
}

#[test]
fn test_triangle_reaches_conflict_free_colouring() {
    init_tracing();
    for seed in [1, 7, 42] {
        let (problem, engines) = fixtures::triangle_engines(SearchStrategy::Greedy, seed);
        let mut driver = SyncDriver::new(Arc::clone(&problem), engines);
        driver.announce_phase(Phase::Bargain);

        assert!(
            driver.run_until_quiescent(48),
            "triangle did not settle with seed {seed}"
        );

        let assignment = driver.global_assignment();
        assert_eq!(driver.global_penalty(), 0.0);
        assert!(problem.is_valid(&assignment));
        // A proper triangle colouring uses all three colours.
        let used: BTreeSet<&Colour> = assignment.values().collect();
        assert_eq!(used.len(), 3);
    }
}

#[test]
fn test_two_clusters_resolve_around_fixed_red() {
    init_tracing();
    let (problem, engines) = fixtures::two_cluster_engines(11);
    let mut driver = SyncDriver::new(Arc::clone(&problem), engines);
    driver.announce_phase(Phase::Bargain);

    assert!(driver.run_until_quiescent(48));

    let assignment = driver.global_assignment();
    assert_eq!(driver.global_penalty(), 0.0);
    assert!(problem.respects_fixed(&assignment));
    // The fixed side never moved, and the other side dodged it.
    assert_eq!(
        assignment.get(&NodeId::new("h1")),
        Some(&Colour::new("red"))
    );
    assert_ne!(
        assignment.get(&NodeId::new("h3")),
        Some(&Colour::new("red"))
    );

    // agent-b ended up with an accurate belief about the fixed boundary.
    let b = driver.engine(&AgentName::new("agent-b")).unwrap();
    assert_eq!(
        b.neighbour_beliefs().get(&NodeId::new("h1")),
        Some(&Colour::new("red"))
    );
}

#[test]
fn test_unanswered_offer_expires_and_frees_the_proposal_slot() {
    init_tracing();
    let mut engine = conflicted_pair_engine(5);

    // The counterfactual proposal goes out and stays pending.
    let first = expect_offer(&engine.step());

    // While it is unanswered, no further proposal can be made: four more
    // rounds of silence.
    for round in 0..4 {
        assert!(
            engine.step().is_empty(),
            "round {round} produced a move while an offer was pending"
        );
    }

    // The fifth unanswered round expires the offer, and the very same
    // step proposes afresh.
    let renewed = expect_offer(&engine.step());
    assert_ne!(renewed.offer_id, first.offer_id);
    assert!(engine.negotiation_state().is_rejected(&first.offer_id));
    assert!(!engine.negotiation_state().is_pending(&first.offer_id));
    assert_eq!(engine.diagnostics().offers_expired, 1);
}

#[test]
fn test_reject_with_impossible_condition_prunes_all_future_offers() {
    init_tracing();
    let mut engine = conflicted_pair_engine(3);

    let first = expect_offer(&engine.step());
    // agent-b rejects and declares it can never colour h2 green.
    engine.receive(&Envelope::negotiation(
        "agent-b",
        "agent-a",
        Reject::new(first.offer_id)
            .with_impossible_conditions(vec![NodeColour::new("h2", "green")]),
    ));

    // Every follow-up proposal gets rejected outright until the search
    // space is exhausted.
    let mut later_offers = Vec::new();
    for _ in 0..6 {
        let moves = engine.step();
        if moves.is_empty() {
            break;
        }
        let offer = expect_offer(&moves);
        engine.receive(&Envelope::negotiation(
            "agent-b",
            "agent-a",
            Reject::new(offer.offer_id),
        ));
        later_offers.push(offer);
    }

    // Alternatives existed beyond the impossible pair, and none of them
    // ever asked for h2=green again.
    assert!(!later_offers.is_empty());
    let banned = NodeColour::new("h2", "green");
    for offer in &later_offers {
        assert!(
            offer
                .conditions
                .iter()
                .all(|condition| condition.node_colour() != banned),
            "post-reject offer still asked for {banned}"
        );
    }

    // With green impossible and every alternative's exact condition set
    // rejected, the search comes up empty: a valid terminal outcome.
    assert!(engine.step().is_empty());
}

#[test]
fn test_stale_boundary_is_reannounced_before_anything_else() {
    init_tracing();
    let mut engine = conflicted_pair_engine(13);

    // A fresh offer from agent-b that recolours h1 gets accepted...
    let offer = ConditionalOffer::new(
        vec![Condition::new("h1", "blue", "agent-a")],
        vec![NodeColour::new("h2", "red")],
    );
    engine.receive(&Envelope::negotiation("agent-b", "agent-a", offer));
    let moves = engine.step();
    assert!(matches!(moves[0].as_move(), Some(RbMove::Accept(_))));

    // ...and the next step leads with the boundary update, whatever else
    // is on the table.
    let moves = engine.step();
    let announcement = expect_offer(&moves);
    assert!(announcement.is_announcement());
    assert_eq!(
        announcement.assignments,
        vec![NodeColour::new("h1", "blue")]
    );
}

#[test]
fn test_broadcast_envelopes_survive_the_wire() {
    init_tracing();
    let mut engine = pair_engine(9);
    for envelope in engine.announce_phase(Phase::Bargain) {
        let json = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
