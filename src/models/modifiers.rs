//! Declaration modifiers and hook kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Orthogonal modifier flags carried by suites and tests
///
/// Suites only make use of `skip`, `only` and `todo`; the other flags are
/// ignored when set on a suite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub skip: bool,
    pub only: bool,
    pub todo: bool,
    pub failing: bool,
    pub concurrent: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn skip() -> Self {
        Self::none().with_skip(true)
    }

    pub fn only() -> Self {
        Self::none().with_only(true)
    }

    pub fn todo() -> Self {
        Self::none().with_todo(true)
    }

    pub fn failing() -> Self {
        Self::none().with_failing(true)
    }

    pub fn concurrent() -> Self {
        Self::none().with_concurrent(true)
    }

    pub fn with_skip(mut self, on: bool) -> Self {
        self.skip |= on;
        self
    }

    pub fn with_only(mut self, on: bool) -> Self {
        self.only |= on;
        self
    }

    pub fn with_todo(mut self, on: bool) -> Self {
        self.todo |= on;
        self
    }

    pub fn with_failing(mut self, on: bool) -> Self {
        self.failing |= on;
        self
    }

    pub fn with_concurrent(mut self, on: bool) -> Self {
        self.concurrent |= on;
        self
    }

    /// Flags set on either side
    pub fn union(self, other: Modifiers) -> Self {
        Self {
            skip: self.skip || other.skip,
            only: self.only || other.only,
            todo: self.todo || other.todo,
            failing: self.failing || other.failing,
            concurrent: self.concurrent || other.concurrent,
        }
    }

    /// The subset of flags a suite passes down to its descendants
    pub fn inheritable(self) -> Self {
        Self {
            skip: self.skip,
            only: self.only,
            todo: self.todo,
            failing: false,
            concurrent: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: Vec<&str> = [
            (self.skip, "skip"),
            (self.only, "only"),
            (self.todo, "todo"),
            (self.failing, "failing"),
            (self.concurrent, "concurrent"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
        write!(f, "{}", flags.join("+"))
    }
}

/// Lifecycle hook kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    pub fn name(&self) -> &'static str {
        match self {
            HookKind::BeforeAll => "beforeAll",
            HookKind::AfterAll => "afterAll",
            HookKind::BeforeEach => "beforeEach",
            HookKind::AfterEach => "afterEach",
        }
    }

    pub fn is_setup(&self) -> bool {
        matches!(self, HookKind::BeforeAll | HookKind::BeforeEach)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
