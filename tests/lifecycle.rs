//! Hook ordering and hook failure propagation

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{entries, entry, log, run};
use trialrun::{HookKind, Modifiers, OutcomeStatus, Task, TestError, TestOptions};

#[test]
fn test_nested_hooks_run_in_scope_order() {
    let log = log();
    let summary = run(|s| {
        s.describe("A", |s| {
            s.before_all(entry(&log, "A.beforeAll"));
            s.after_all(entry(&log, "A.afterAll"));
            s.before_each(entry(&log, "A.beforeEach"));
            s.after_each(entry(&log, "A.afterEach"));
            s.describe("B", |s| {
                s.before_all(entry(&log, "B.beforeAll"));
                s.after_all(entry(&log, "B.afterAll"));
                s.before_each(entry(&log, "B.beforeEach"));
                s.after_each(entry(&log, "B.afterEach"));
                s.test("t1", entry(&log, "t1"));
                s.test("t2", entry(&log, "t2"));
            });
        });
    });

    assert_eq!(summary.passed, 2);
    assert_eq!(
        entries(&log),
        vec![
            "A.beforeAll",
            "B.beforeAll",
            "A.beforeEach",
            "B.beforeEach",
            "t1",
            "B.afterEach",
            "A.afterEach",
            "A.beforeEach",
            "B.beforeEach",
            "t2",
            "B.afterEach",
            "A.afterEach",
            "B.afterAll",
            "A.afterAll",
        ]
    );
}

#[test]
fn test_before_all_runs_lazily_and_once() {
    let log = log();
    run(|s| {
        s.test("outside", entry(&log, "outside"));
        s.describe("S", |s| {
            s.before_all(entry(&log, "S.beforeAll"));
            s.after_all(entry(&log, "S.afterAll"));
            s.test_with("skipped first", TestOptions::new().skip(), entry(&log, "never"));
            s.test("a", entry(&log, "a"));
            s.test("b", entry(&log, "b"));
        });
    });

    assert_eq!(
        entries(&log),
        vec!["outside", "S.beforeAll", "a", "b", "S.afterAll"]
    );
}

#[test]
fn test_fully_skipped_suite_never_runs_its_hooks() {
    let log = log();
    let summary = run(|s| {
        s.describe_with("off", Modifiers::skip(), |s| {
            s.before_all(entry(&log, "off.beforeAll"));
            s.after_all(entry(&log, "off.afterAll"));
            s.before_each(entry(&log, "off.beforeEach"));
            s.test("a", entry(&log, "a"));
        });
        s.describe("all individually skipped", |s| {
            s.before_all(entry(&log, "manual.beforeAll"));
            s.after_all(entry(&log, "manual.afterAll"));
            s.test_with("x", TestOptions::new().skip(), Task::noop());
            s.todo("y");
        });
    });

    assert!(entries(&log).is_empty());
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.todo, 1);
    assert_eq!(summary.exit_code(), 0);
}

#[test]
fn test_before_all_failure_fails_the_subtree_only() {
    let log = log();
    let summary = run(|s| {
        s.describe("S", |s| {
            s.before_all(Task::sync(|| anyhow::bail!("database unreachable")));
            s.after_all(entry(&log, "S.afterAll"));
            s.test("a", entry(&log, "a"));
            s.describe("N", |s| {
                s.before_all(entry(&log, "N.beforeAll"));
                s.after_all(entry(&log, "N.afterAll"));
                s.test("b", entry(&log, "b"));
            });
        });
        s.describe("other", |s| {
            s.test("c", entry(&log, "c"));
        });
    });

    assert_eq!(entries(&log), vec!["S.afterAll", "c"]);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.passed, 1);

    for name in ["S a", "S N b"] {
        let record = summary.record(name).unwrap();
        assert_eq!(
            record.outcome.error(),
            Some(&TestError::thrown("database unreachable").in_hook(HookKind::BeforeAll)),
            "{name}"
        );
        assert_eq!(record.attempts, 0);
    }
}

#[test]
fn test_before_each_failure_skips_body_but_runs_cleanup() {
    let log = log();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();

    let summary = run(|s| {
        s.describe("S", |s| {
            s.before_each(Task::sync(move || {
                counter.set(counter.get() + 1);
                anyhow::ensure!(counter.get() > 1, "fixture not ready");
                Ok(())
            }));
            s.after_each(entry(&log, "afterEach"));
            s.test("first", entry(&log, "first"));
            s.test("second", entry(&log, "second"));
        });
    });

    assert_eq!(entries(&log), vec!["afterEach", "second", "afterEach"]);
    assert_eq!(summary.status_of("S first"), Some(OutcomeStatus::Failed));
    assert_eq!(summary.status_of("S second"), Some(OutcomeStatus::Passed));
    assert!(summary
        .record("S first")
        .and_then(|r| r.outcome.error())
        .is_some_and(|e| e.is_hook_failure()));
}

#[test]
fn test_after_each_failure_fails_a_passing_test() {
    let summary = run(|s| {
        s.after_each(Task::sync(|| anyhow::bail!("cleanup failed")));
        s.test("passes", Task::noop());
    });

    assert_eq!(
        summary.record("passes").unwrap().outcome.error(),
        Some(&TestError::thrown("cleanup failed").in_hook(HookKind::AfterEach))
    );
    assert!(summary.issues.is_empty());
}

#[test]
fn test_after_each_failure_does_not_overwrite_a_failure() {
    let summary = run(|s| {
        s.after_each(Task::sync(|| anyhow::bail!("cleanup failed")));
        s.test("fails", Task::sync(|| anyhow::bail!("body failed")));
    });

    assert_eq!(
        summary.record("fails").unwrap().outcome.error(),
        Some(&TestError::thrown("body failed"))
    );
    assert_eq!(summary.issues.len(), 1);
    assert_eq!(summary.issues[0].scope, vec!["fails".to_string()]);
    assert!(summary.issues[0].error.is_hook_failure());
}

#[test]
fn test_after_all_failure_is_a_run_issue() {
    let summary = run(|s| {
        s.describe("S", |s| {
            s.after_all(Task::sync(|| anyhow::bail!("teardown failed")));
            s.test("a", Task::noop());
        });
    });

    assert_eq!(summary.passed, 1);
    assert_eq!(summary.issues.len(), 1);
    assert_eq!(summary.issues[0].scope, vec!["S".to_string()]);
    assert_eq!(
        summary.issues[0].error,
        TestError::thrown("teardown failed").in_hook(HookKind::AfterAll)
    );
    assert_eq!(summary.exit_code(), 1);
}

#[test]
fn test_anonymous_suite_scopes_hooks_without_renaming() {
    let log = log();
    let summary = run(|s| {
        s.describe("outer", |s| {
            s.describe_anonymous(|s| {
                s.before_each(entry(&log, "grouped"));
                s.test("inside", Task::noop());
            });
            s.test("beside", Task::noop());
        });
    });

    assert_eq!(entries(&log), vec!["grouped"]);
    assert!(summary.record("outer inside").is_some());
    assert!(summary.record("outer beside").is_some());
}
