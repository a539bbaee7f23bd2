//! Built-in self-check catalog
//!
//! Suites that exercise the runner through its own public API. Every check
//! is written so that a correct runner reports success; `--list` shows the
//! skipped and todo entries without running anything.

use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use trialrun::{report_uncaught, Modifiers, SuiteBuilder, Task, TestOptions};

type Log = Rc<RefCell<Vec<String>>>;

fn push(log: &Log, entry: &'static str) -> Task {
    let log = log.clone();
    Task::sync(move || {
        log.borrow_mut().push(entry.to_string());
        Ok(())
    })
}

pub fn declare(s: &mut SuiteBuilder<'_>) {
    s.describe("hooks", hooks);
    s.describe("modifiers", modifiers);
    s.describe("deadlines", deadlines);
    s.describe("concurrency", concurrency);
    s.describe("callbacks", callbacks);
    s.describe("parameterized", parameterized);
}

fn hooks(s: &mut SuiteBuilder<'_>) {
    let log: Log = Rc::default();

    s.before_all(push(&log, "outer.beforeAll"));
    s.before_each(push(&log, "outer.beforeEach"));
    s.after_each(push(&log, "outer.afterEach"));

    s.describe("nested", |s| {
        s.before_each(push(&log, "inner.beforeEach"));
        s.after_each(push(&log, "inner.afterEach"));
        s.test("body", push(&log, "body"));
    });

    let seen = log.clone();
    s.test(
        "ran outer to inner, then inner to outer",
        Task::sync(move || {
            let seen = seen.borrow();
            anyhow::ensure!(
                seen[..6]
                    == [
                        "outer.beforeAll",
                        "outer.beforeEach",
                        "inner.beforeEach",
                        "body",
                        "inner.afterEach",
                        "outer.afterEach",
                    ],
                "unexpected hook order: {:?}",
                *seen
            );
            Ok(())
        }),
    );

    s.describe_with("never entered", Modifiers::skip(), |s| {
        s.before_all(Task::sync(|| anyhow::bail!("beforeAll of a skipped suite ran")));
        s.test("skipped", Task::noop());
    });
}

fn modifiers(s: &mut SuiteBuilder<'_>) {
    s.test_with(
        "failing inverts a failure",
        TestOptions::new().failing(),
        Task::sync(|| {
            assert_eq!(1 + 1, 3);
            Ok(())
        }),
    );
    s.test_with(
        "skip_if skips on a true condition",
        TestOptions::new().skip_if(true),
        Task::sync(|| anyhow::bail!("should not run")),
    );
    s.test_with("run_if runs on a true condition", TestOptions::new().run_if(true), Task::noop());
    s.todo("todo without a body is reported");
    s.test_with(
        "retry absorbs a flaky first attempt",
        TestOptions::new().retry(2),
        {
            let attempts = Rc::new(RefCell::new(0));
            Task::sync(move || {
                *attempts.borrow_mut() += 1;
                anyhow::ensure!(*attempts.borrow() > 1, "first attempt always fails");
                Ok(())
            })
        },
    );
    s.test_with("repeats runs the body every time", TestOptions::new().repeats(3), Task::noop());
}

fn deadlines(s: &mut SuiteBuilder<'_>) {
    s.test_with(
        "timeout fires long before the body ends",
        TestOptions::new().failing().timeout_ms(10),
        Task::future(|| async {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            Ok(())
        }),
    );
    s.test_with(
        "per-test override extends the deadline",
        TestOptions::new().timeout_ms(500),
        Task::future(|| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        }),
    );
    s.test_with(
        "uncaught errors are charged to the running test",
        TestOptions::new().failing(),
        Task::sync(|| {
            report_uncaught("background task crashed");
            Ok(())
        }),
    );
}

fn concurrency(s: &mut SuiteBuilder<'_>) {
    let started: Log = Rc::default();
    let clock = Rc::new(RefCell::new(None::<Instant>));

    for name in ["first", "second", "third"] {
        let started = started.clone();
        let clock = clock.clone();
        s.test_with(
            name,
            TestOptions::new().concurrent(),
            Task::future(move || {
                started.borrow_mut().push(name.to_string());
                clock.borrow_mut().get_or_insert_with(Instant::now);
                async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(())
                }
            }),
        );
    }

    s.test(
        "batch started in declaration order and overlapped",
        Task::sync(move || {
            anyhow::ensure!(*started.borrow() == ["first", "second", "third"]);
            let first_start = *clock.borrow();
            let elapsed = first_start.map(|t| t.elapsed()).unwrap_or_default();
            anyhow::ensure!(
                elapsed < Duration::from_millis(140),
                "batch took {:?}; tests did not overlap",
                elapsed
            );
            Ok(())
        }),
    );
}

fn callbacks(s: &mut SuiteBuilder<'_>) {
    s.test(
        "done from a spawned task",
        Task::callback(|done| {
            tokio::task::spawn_local(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.ok();
            });
        }),
    );
    s.test_with(
        "done with an error fails",
        TestOptions::new().failing(),
        Task::callback(|done| done.fail("connection refused")),
    );
}

#[derive(Serialize)]
struct Case {
    a: i64,
    b: i64,
    sum: i64,
}

fn parameterized(s: &mut SuiteBuilder<'_>) {
    s.each([(1, 1, 2), (2, 3, 5), (-4, 4, 0)])
        .test("%d + %d = %d", |&(a, b, sum)| {
            Task::sync(move || {
                assert_eq!(a + b, sum);
                Ok(())
            })
        });

    s.each([
        Case { a: 10, b: 5, sum: 15 },
        Case { a: 0, b: 0, sum: 0 },
    ])
    .describe("with $a and $b", |s, case| {
        let (a, b, sum) = (case.a, case.b, case.sum);
        s.test(
            format!("adds to {sum}"),
            Task::sync(move || {
                anyhow::ensure!(a + b == sum);
                Ok(())
            }),
        );
    });
}
