//! Error types for ACCORD operations

use crate::{Colour, NodeId};
use thiserror::Error;

/// Errors raised while constructing a [`crate::ConstraintProblem`].
///
/// These are structural misconfigurations and always fail fast at setup;
/// a built problem never errors at evaluation time.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProblemError {
    #[error("Colour domain is empty")]
    EmptyDomain,

    #[error("Colour {colour} appears more than once in the domain")]
    DuplicateColour { colour: Colour },

    #[error("Edge {node}--{node} is a self-loop")]
    SelfLoop { node: NodeId },

    #[error("Unknown node {node} referenced by {context}")]
    UnknownNode { node: NodeId, context: String },

    #[error("Colour {colour} on node {node} is not in the domain")]
    ColourOutsideDomain { node: NodeId, colour: Colour },
}

/// Errors raised while constructing a local solver.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolverError {
    #[error("Cluster is empty")]
    EmptyCluster,

    #[error("Cluster node {node} is not part of the problem")]
    UnknownClusterNode { node: NodeId },

    #[error("Cluster of {size} nodes exceeds the exhaustive-search limit of {limit}")]
    ClusterTooLarge { size: usize, limit: usize },
}

/// Errors raised while constructing a negotiation engine.
///
/// Per-message and per-offer failures during a run are never errors:
/// they degrade to ignorable or infeasible moves with a diagnostic
/// reason attached. Only setup problems surface here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolError {
    #[error("No owner registered for node {node} adjacent to this cluster")]
    MissingOwner { node: NodeId },

    #[error("Cluster node {node} is owned by another agent")]
    ForeignClusterNode { node: NodeId },
}

/// Errors raised while encoding or decoding wire payloads.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodecError {
    #[error("Failed to decode move payload: {reason}")]
    Decode { reason: String },

    #[error("Failed to encode move payload: {reason}")]
    Encode { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Master error type for all ACCORD errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AccordError {
    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for ACCORD operations.
pub type AccordResult<T> = Result<T, AccordError>;

// =============================================================================
// TESTS
// =============================================================================
