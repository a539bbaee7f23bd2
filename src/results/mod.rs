//! Result collection
//!
//! Collects per-test records and run-level issues into a [`RunSummary`]
//! and streams them to reporters as they happen.
//!
//! [`RunSummary`]: crate::models::RunSummary

mod aggregator;
mod reporter;
mod sink;

pub use aggregator::ResultAggregator;
pub use reporter::{ChannelReporter, CollectingReporter, Reporter, RunEvent};
pub use sink::IssueSink;
