#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use trialrun::{Registry, RunConfig, RunSummary, SuiteBuilder, Task, TestRunner};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
    Rc::default()
}

/// A passing body that appends `text` to `log`
pub fn entry(log: &Log, text: &str) -> Task {
    let log = log.clone();
    let text = text.to_string();
    Task::sync(move || {
        log.borrow_mut().push(text.clone());
        Ok(())
    })
}

pub fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

pub fn run_with(config: RunConfig, declare: impl FnOnce(&mut SuiteBuilder<'_>)) -> RunSummary {
    let mut registry = Registry::new();
    registry.declare(declare);
    let tree = registry.finish();
    TestRunner::new(config)
        .run_blocking(&tree)
        .expect("run should start")
}

pub fn run(declare: impl FnOnce(&mut SuiteBuilder<'_>)) -> RunSummary {
    run_with(RunConfig::default(), declare)
}
