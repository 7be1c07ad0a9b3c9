//! Core business logic for polis: the poll definition and response engine.
//!
//! - [`PollService`]: poll definitions and their option catalogs
//! - [`ResponseLedger`]: one response slot per respondent, vote-change policy
//! - [`AggregationEngine`]: read-time result snapshots
//! - [`VisibilityGate`]: decides who may see results, and when

pub mod services;

pub use services::*;
