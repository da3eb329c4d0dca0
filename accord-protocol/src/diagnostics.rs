//! Engine diagnostics.
//!
//! An explicit counters struct populated by the engine, readable at any
//! point by inspection tooling. Reason strings mirror the `reasons` tags
//! put on the wire and are never parsed back.

use serde::{Deserialize, Serialize};

/// Running counters and the latest decision reason for one engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub announcements_sent: u64,
    pub offers_sent: u64,
    pub offers_received: u64,
    pub accepts_sent: u64,
    pub accepts_received: u64,
    pub rejects_sent: u64,
    pub rejects_received: u64,
    pub offers_expired: u64,
    pub feasibility_queries_answered: u64,
    pub unparseable_payloads: u64,
    /// Why the engine last did what it did, e.g. `"accepted: penalty 1 -> 0"`.
    pub last_decision: Option<String>,
}

impl Diagnostics {
    pub(crate) fn note(&mut self, decision: impl Into<String>) {
        self.last_decision = Some(decision.into());
    }
}
