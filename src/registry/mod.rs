//! Suite registry
//!
//! Builds the suite tree from declarations before execution begins.

mod builder;
mod each;
mod tree;

pub use builder::{Registry, SuiteBuilder, TestOptions};
pub use each::{format_name, Each};
pub use tree::{Hook, HookId, Node, Suite, SuiteId, SuiteTree, TestCase, TestId};
