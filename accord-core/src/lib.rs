//! ACCORD Core - Entity Types
//!
//! Pure data structures for the distributed graph-colouring engine. All
//! other crates depend on this. This crate contains the problem
//! description, identity types, wire moves, and error taxonomy - no
//! solver or protocol logic.

pub mod config;
pub mod error;
pub mod identity;
pub mod message;
pub mod moves;
pub mod problem;

pub use config::EngineConfig;
pub use error::{
    AccordError, AccordResult, CodecError, ConfigError, ProblemError, ProtocolError, SolverError,
};
pub use identity::{AgentName, Colour, NodeId, OfferId, Round, Timestamp};
pub use message::{Envelope, Payload};
pub use moves::{
    Accept, Condition, ConditionalOffer, FeasibilityQuery, FeasibilityResponse, NodeColour,
    RbMove, Reject,
};
pub use problem::{Assignment, ConstraintProblem, ConstraintProblemBuilder};
