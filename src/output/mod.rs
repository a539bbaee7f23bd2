//! Output formatting module
//!
//! Provides various output formats for test results.

mod console;
mod formatter;

pub use console::ConsoleReporter;
pub use formatter::{OutputFormat, ResultFormatter};
