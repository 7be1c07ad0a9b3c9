//! Business logic services.

#![allow(missing_docs)]

pub mod aggregation;
pub mod catalog;
pub mod ledger;
pub mod poll;
pub mod visibility;
pub mod window;

pub use aggregation::{AggregationEngine, LikertBucket, OptionTally, PollResult, ResultBreakdown};
pub use catalog::OptionCatalog;
pub use ledger::{PartialPayload, Respondent, ResponseLedger, ResponsePayload, ResponseWithOptions};
pub use poll::{PollService, PollSpec, PollView};
pub use visibility::{ResultAccess, VisibilityGate};
pub use window::WindowPhase;
