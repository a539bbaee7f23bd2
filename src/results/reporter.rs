//! Result stream consumers

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc;

use crate::models::{RunIssue, RunSummary, TestRecord};

/// Receives results incrementally as the run progresses
pub trait Reporter {
    /// Called once per test, as soon as its outcome is recorded
    fn on_test(&mut self, record: &TestRecord);

    fn on_issue(&mut self, _issue: &RunIssue) {}

    fn on_finish(&mut self, _summary: &RunSummary) {}
}

/// One item of the result stream
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Test(TestRecord),
    Issue(RunIssue),
    Finished { exit_code: i32, total: usize },
}

/// Forwards the result stream over an unbounded channel
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn on_test(&mut self, record: &TestRecord) {
        let _ = self.tx.send(RunEvent::Test(record.clone()));
    }

    fn on_issue(&mut self, issue: &RunIssue) {
        let _ = self.tx.send(RunEvent::Issue(issue.clone()));
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        let _ = self.tx.send(RunEvent::Finished {
            exit_code: summary.exit_code(),
            total: summary.total,
        });
    }
}

/// Keeps every event in memory; the handle can be read after the run
#[derive(Clone, Default)]
pub struct CollectingReporter {
    events: Rc<RefCell<Vec<RunEvent>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.borrow().clone()
    }

    /// Fully-qualified test names in the order they were reported
    pub fn test_order(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                RunEvent::Test(record) => Some(record.full_name()),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for CollectingReporter {
    fn on_test(&mut self, record: &TestRecord) {
        self.events.borrow_mut().push(RunEvent::Test(record.clone()));
    }

    fn on_issue(&mut self, issue: &RunIssue) {
        self.events.borrow_mut().push(RunEvent::Issue(issue.clone()));
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        self.events.borrow_mut().push(RunEvent::Finished {
            exit_code: summary.exit_code(),
            total: summary.total,
        });
    }
}
