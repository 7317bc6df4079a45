//! Lifecycle events consumed from the host test framework.

use std::path::PathBuf;

/// Step kind the host reports for user-defined steps.
pub const USER_STEP_KIND: &str = "Keyword";

/// Attributes the host reports with each step start/end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepAttrs {
    /// Providing library; empty for steps the test author defined.
    pub library_name: String,
    /// Step kind, e.g. `Keyword`, `Setup`, `For`.
    pub kind: String,
}

impl StepAttrs {
    /// A user-defined top-level step.
    #[must_use]
    pub fn user_step() -> Self {
        Self {
            library_name: String::new(),
            kind: USER_STEP_KIND.to_string(),
        }
    }

    /// A step provided by `library`.
    #[must_use]
    pub fn library(library: impl Into<String>) -> Self {
        Self {
            library_name: library.into(),
            kind: USER_STEP_KIND.to_string(),
        }
    }

    /// User-defined steps get their own named scope; all others only advance numbering.
    #[must_use]
    pub fn is_user_defined(&self) -> bool {
        self.library_name.is_empty() && self.kind.eq_ignore_ascii_case(USER_STEP_KIND)
    }
}

/// A host lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SuiteStart {
        name: String,
        source: PathBuf,
    },
    SuiteEnd {
        name: String,
    },
    TestStart {
        name: String,
        long_name: String,
    },
    TestEnd {
        name: String,
        long_name: String,
    },
    StepStart {
        name: String,
        attrs: StepAttrs,
    },
    StepEnd {
        name: String,
        attrs: StepAttrs,
    },
}
