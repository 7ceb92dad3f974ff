//! Warehouse domain module.
//!
//! Warehouse records, capacity arithmetic, utilization figures and the pure ranking
//! function used to pick a warehouse for incoming goods. Deterministic domain logic
//! only (no IO, no storage); repositories and locking live in infra.

pub mod scoring;
pub mod utilization;
pub mod warehouse;

pub use scoring::{Candidate, ScoreBreakdown, ScoringPolicy, rank_candidates};
pub use utilization::Utilization;
pub use warehouse::{CapacityChange, CapacityOp, ConsistencyWarning, Warehouse};
