//! ACCORD Protocol - Rule-Based Negotiation
//!
//! The conditional-offer negotiation engine: a per-agent dialogue state
//! machine that announces boundary configurations, evaluates and answers
//! counter-offers, searches counterfactually for mutually beneficial
//! boundary configurations, and expires stale offers to avoid deadlock.
//! One [`NegotiationEngine`] drives one agent; all coordination happens
//! through [`accord_core::Envelope`] message content.

pub mod diagnostics;
pub mod engine;
pub mod observer;
pub mod search;
pub mod state;

pub use diagnostics::Diagnostics;
pub use engine::NegotiationEngine;
pub use observer::{NegotiationObserver, NoopObserver};
pub use search::{search_conditional_offer, CandidateProposal};
pub use state::{NegotiationState, OfferDirection, Phase, TrackedOffer};
