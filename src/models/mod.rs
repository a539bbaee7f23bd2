//! Data models for suite execution
//!
//! Modifier flags, outcomes, result records and the failure taxonomy shared
//! by every other module.

mod error;
mod modifiers;
mod outcome;

pub use error::TestError;
pub use modifiers::{HookKind, Modifiers};
pub use outcome::{full_name, Outcome, OutcomeStatus, RunIssue, RunSummary, TestRecord};
