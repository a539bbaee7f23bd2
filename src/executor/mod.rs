//! Test execution engine
//!
//! Walks the suite tree, runs hooks and bodies under deadlines, and streams
//! outcomes to the result aggregator.

mod context;
mod runner;
mod scheduler;

pub use context::{report_uncaught, RunContext};
pub use runner::TestRunner;
pub use scheduler::{ExecSettings, Scheduler, SuitePhase};
