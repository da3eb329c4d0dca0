//! ACCORD Solver - Local Constraint Optimization
//!
//! The two local decision procedures of the engine: Max-Sum belief
//! propagation for single-node agents and greedy/exhaustive joint search
//! for multi-node clusters. Both are pure consumers of a shared
//! read-only [`accord_core::ConstraintProblem`].

pub mod cluster;
pub mod maxsum;

pub use cluster::{LocalClusterSolver, SearchStrategy};
pub use maxsum::{MaxSumSolver, MaxSumStep, UtilityTable};
