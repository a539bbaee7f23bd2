//! trialrun - nested test suite runner
//!
//! The binary runs the built-in self-check catalog, which exercises hooks,
//! modifiers, deadlines and concurrent tests of the runner itself.
//!
//! ## Usage
//!
//! ```bash
//! # Run everything
//! trialrun
//!
//! # Only the concurrency checks, as JSON lines
//! trialrun -t "concurrency" -f json
//!
//! # Show what would run
//! trialrun --list
//! ```

use std::process::ExitCode;

mod selfcheck;

fn main() -> ExitCode {
    trialrun::cli::main_with(selfcheck::declare)
}
