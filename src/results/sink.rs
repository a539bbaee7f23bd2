//! Shared collector for run-level issues

use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

use crate::models::RunIssue;

/// Run-level issues raised outside the scheduler's direct control
///
/// Cloning shares the same buffer. Handed to `Done` handles and abandoned
/// bodies, drained by the aggregator.
#[derive(Clone, Debug, Default)]
pub struct IssueSink {
    issues: Rc<RefCell<Vec<RunIssue>>>,
}

impl IssueSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, issue: RunIssue) {
        warn!("run-level error: {}", issue);
        self.issues.borrow_mut().push(issue);
    }

    pub fn drain(&self) -> Vec<RunIssue> {
        std::mem::take(&mut *self.issues.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.issues.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.borrow().is_empty()
    }
}
