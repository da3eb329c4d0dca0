//! Engine configuration.
//!
//! The negotiation heuristics carry a handful of empirically chosen
//! thresholds. They are configuration, not constants: the defaults below
//! reproduce the reference behaviour but none of them is known to be
//! optimal.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Tunable parameters of the negotiation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rounds an unanswered sent offer stays pending before it is
    /// unilaterally moved to rejected. Mandatory deadlock avoidance;
    /// without expiry an unanswered offer blocks all new proposals to
    /// that recipient forever.
    pub offer_expiry_rounds: u64,
    /// Boundary-node count up to which counterfactual search enumerates
    /// the recipient's full configuration product. Above the limit only
    /// the currently-believed configuration is considered.
    pub full_enumeration_limit: usize,
    /// Largest cluster the exhaustive local solver accepts; the search is
    /// `|domain|^|cluster|` and assumes small clusters.
    pub exhaustive_cluster_limit: usize,
    /// Penalty window above the best candidate within which a second-best
    /// alternative may be proposed after the best condition set was
    /// rejected by the recipient.
    pub alternative_slack: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            offer_expiry_rounds: 5,
            full_enumeration_limit: 3,
            exhaustive_cluster_limit: 6,
            alternative_slack: 20.0,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration; nonsense values fail fast at setup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.offer_expiry_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "offer_expiry_rounds".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.exhaustive_cluster_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "exhaustive_cluster_limit".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !self.alternative_slack.is_finite() || self.alternative_slack < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "alternative_slack".to_string(),
                reason: "must be finite and non-negative".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
