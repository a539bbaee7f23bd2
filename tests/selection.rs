//! Modifiers, name filtering, todo handling and bail

mod common;

use std::collections::HashSet;

use common::{entries, entry, log, run, run_with};
use trialrun::{Modifiers, OutcomeStatus, RunConfig, Task, TestOptions};

#[test]
fn test_every_reported_test_has_exactly_one_record() {
    let summary = run_with(RunConfig::new().with_name_filter("^(keep|group)"), |s| {
        s.test("keep passing", Task::noop());
        s.test("keep failing", Task::sync(|| anyhow::bail!("x")));
        s.test_with("keep skipped", TestOptions::new().skip(), Task::noop());
        s.todo("keep todo");
        s.test("dropped by filter", Task::noop());
        s.describe("group", |s| {
            s.each([1, 2, 3]).test("case %d", |_| Task::noop());
        });
    });

    let names: Vec<String> = summary.records.iter().map(|r| r.full_name()).collect();
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(names.len(), unique.len());
    assert_eq!(summary.total, 7);
    assert!(!names.contains(&"dropped by filter".to_string()));
    assert!(names.contains(&"group case 2".to_string()));
}

#[test]
fn test_only_is_transitive_and_keeps_ancestor_hooks() {
    let log = log();
    let summary = run(|s| {
        s.test("top", entry(&log, "top"));
        s.describe("outer", |s| {
            s.before_all(entry(&log, "outer.beforeAll"));
            s.before_each(entry(&log, "outer.beforeEach"));
            s.test("sibling", entry(&log, "sibling"));
            s.describe("inner", |s| {
                s.test_with("chosen", TestOptions::new().only(), entry(&log, "chosen"));
                s.test("neighbour", entry(&log, "neighbour"));
            });
        });
    });

    assert_eq!(
        entries(&log),
        vec!["outer.beforeAll", "outer.beforeEach", "chosen"]
    );
    assert_eq!(summary.status_of("outer inner chosen"), Some(OutcomeStatus::Passed));
    for name in ["top", "outer sibling", "outer inner neighbour"] {
        assert_eq!(summary.status_of(name), Some(OutcomeStatus::Skipped), "{name}");
    }
}

#[test]
fn test_only_suite_composes_with_nested_modifiers() {
    let summary = run(|s| {
        s.describe_with("picked", Modifiers::only(), |s| {
            s.test("runs", Task::noop());
            s.test_with("still skipped", TestOptions::new().skip(), Task::noop());
            s.describe("deeper", |s| {
                s.test("runs too", Task::noop());
            });
        });
        s.test("outside", Task::noop());
    });

    assert_eq!(summary.passed, 2);
    assert_eq!(summary.skipped, 2);
}

#[test]
fn test_name_filter_prunes_suites_without_survivors() {
    let log = log();
    let summary = run_with(RunConfig::new().with_name_filter("^math add"), |s| {
        s.describe("math", |s| {
            s.before_all(entry(&log, "math.beforeAll"));
            s.test("adds", entry(&log, "adds"));
            s.test("subtracts", entry(&log, "subtracts"));
        });
        s.describe("strings", |s| {
            s.before_all(entry(&log, "strings.beforeAll"));
            s.test("concat", entry(&log, "concat"));
        });
    });

    assert_eq!(entries(&log), vec!["math.beforeAll", "adds"]);
    assert_eq!(summary.total, 1);
}

#[test]
fn test_todo_outcomes() {
    let summary = run(|s| {
        s.todo("empty");
        s.test_with(
            "throws",
            TestOptions::new().todo(),
            Task::sync(|| anyhow::bail!("not implemented")),
        );
        s.test_with("passes", TestOptions::new().todo(), Task::noop());
    });

    assert_eq!(summary.status_of("empty"), Some(OutcomeStatus::Todo));
    assert_eq!(summary.status_of("throws"), Some(OutcomeStatus::Todo));
    assert_eq!(summary.status_of("passes"), Some(OutcomeStatus::TodoPassed));
    assert_eq!(summary.exit_code(), 1);
}

#[test]
fn test_allow_passing_todo_flag() {
    let summary = run_with(RunConfig::new().with_allow_passing_todo(true), |s| {
        s.test_with("passes", TestOptions::new().todo(), Task::noop());
    });

    assert_eq!(summary.status_of("passes"), Some(OutcomeStatus::Todo));
    assert_eq!(summary.exit_code(), 0);
}

#[test]
fn test_todo_bodies_not_run_when_disabled() {
    let log = log();
    let summary = run_with(RunConfig::new().with_run_todos(false), |s| {
        s.test_with("drafted", TestOptions::new().todo(), entry(&log, "drafted"));
    });

    assert!(entries(&log).is_empty());
    assert_eq!(summary.status_of("drafted"), Some(OutcomeStatus::Todo));
}

#[test]
fn test_failing_inverts_outcomes() {
    let summary = run(|s| {
        s.test_with(
            "throws",
            TestOptions::new().failing(),
            Task::sync(|| anyhow::bail!("expected")),
        );
        s.test_with(
            "panics",
            TestOptions::new().failing(),
            Task::sync(|| {
                assert!(1 > 2);
                Ok(())
            }),
        );
        s.test_with("completes", TestOptions::new().failing(), Task::noop());
        s.test_with(
            "completes via callback",
            TestOptions::new().failing(),
            Task::callback(|done| done.ok()),
        );
    });

    assert_eq!(summary.status_of("throws"), Some(OutcomeStatus::Passed));
    assert_eq!(summary.status_of("panics"), Some(OutcomeStatus::Passed));
    assert_eq!(summary.status_of("completes"), Some(OutcomeStatus::Failed));
    assert_eq!(
        summary.status_of("completes via callback"),
        Some(OutcomeStatus::Failed)
    );
}

#[test]
fn test_bail_stops_dispatch_but_runs_after_all() {
    let log = log();
    let summary = run_with(RunConfig::new().with_bail(1), |s| {
        s.describe("S", |s| {
            s.after_all(entry(&log, "S.afterAll"));
            s.test("breaks", Task::sync(|| anyhow::bail!("boom")));
            s.test("never started", entry(&log, "never started"));
        });
        s.test("after", entry(&log, "after"));
    });

    assert!(summary.bailed);
    assert_eq!(entries(&log), vec!["S.afterAll"]);
    assert_eq!(summary.total, 1);
    assert_eq!(summary.exit_code(), 1);
}

#[test]
fn test_bail_inside_concurrent_batch_drops_later_members() {
    let log = log();
    let summary = run_with(RunConfig::new().with_bail(1), |s| {
        s.test_with(
            "breaks",
            TestOptions::new().concurrent(),
            Task::sync(|| anyhow::bail!("boom")),
        );
        s.test_with(
            "later member",
            TestOptions::new().concurrent(),
            entry(&log, "later member"),
        );
    });

    assert!(summary.bailed);
    assert!(entries(&log).is_empty());
    assert_eq!(summary.total, 1);
    assert!(summary.record("later member").is_none());
}

#[test]
fn test_bail_counts_passing_todos() {
    let summary = run_with(RunConfig::new().with_bail(2), |s| {
        s.test("fails", Task::sync(|| anyhow::bail!("boom")));
        s.test("passes", Task::noop());
        s.test_with("todo that passes", TestOptions::new().todo(), Task::noop());
        s.test("not dispatched", Task::noop());
    });

    assert!(summary.bailed);
    assert_eq!(summary.total, 3);
    assert!(summary.record("not dispatched").is_none());
}

#[test]
fn test_conditional_modifiers() {
    let summary = run(|s| {
        s.test_with("skip_if true", TestOptions::new().skip_if(true), Task::noop());
        s.test_with("skip_if false", TestOptions::new().skip_if(false), Task::noop());
        s.test_with("run_if false", TestOptions::new().run_if(false), Task::noop());
        s.test_with(
            "todo_if true",
            TestOptions::new().todo_if(true),
            Task::sync(|| anyhow::bail!("wip")),
        );
    });

    assert_eq!(summary.status_of("skip_if true"), Some(OutcomeStatus::Skipped));
    assert_eq!(summary.status_of("skip_if false"), Some(OutcomeStatus::Passed));
    assert_eq!(summary.status_of("run_if false"), Some(OutcomeStatus::Skipped));
    assert_eq!(summary.status_of("todo_if true"), Some(OutcomeStatus::Todo));
}
