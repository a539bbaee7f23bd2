//! trialrun - scheduling and lifecycle core for nested test suites
//!
//! Suites are declared as a tree with a [`SuiteBuilder`], each test and hook
//! being a [`Task`] in one of three calling conventions (synchronous, future,
//! or completion callback). A run then:
//!
//! - selects tests through `skip` / `only` / `todo` modifiers and a name filter
//! - runs `beforeAll` / `beforeEach` outer-to-inner and `afterEach` /
//!   `afterAll` inner-to-outer around every test
//! - enforces per-test deadlines without ever hanging on a body
//! - runs consecutive `concurrent` tests together on one thread
//! - streams a [`TestRecord`] per test and ends with a [`RunSummary`]
//!
//! ## Usage
//!
//! ```no_run
//! use trialrun::{Registry, RunConfig, Task, TestOptions, TestRunner};
//!
//! let mut registry = Registry::new();
//! registry.declare(|s| {
//!     s.describe("math", |s| {
//!         s.test("adds", Task::sync(|| {
//!             assert_eq!(1 + 1, 2);
//!             Ok(())
//!         }));
//!         s.test_with("slow", TestOptions::new().timeout_ms(50), Task::future(|| async {
//!             tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!             Ok(())
//!         }));
//!     });
//! });
//!
//! let tree = registry.finish();
//! let summary = TestRunner::new(RunConfig::default()).run_blocking(&tree)?;
//! assert_eq!(summary.exit_code(), 0);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod executor;
pub mod filter;
pub mod hooks;
pub mod models;
pub mod output;
pub mod registry;
pub mod results;
pub mod task;
pub mod timeout;
pub mod utils;

pub use config::RunConfig;
pub use executor::{report_uncaught, TestRunner};
pub use filter::{Disposition, FilterEngine, Plan};
pub use models::{
    HookKind, Modifiers, Outcome, OutcomeStatus, RunIssue, RunSummary, TestError, TestRecord,
};
pub use registry::{Registry, SuiteBuilder, SuiteTree, TestOptions};
pub use results::{ChannelReporter, CollectingReporter, Reporter, RunEvent};
pub use task::{Done, Task};
