//! # expects - snapshot assertions that learn
//!
//! expects lets a test step assert "this value matches what we saw here
//! last time" without writing the expected value down. The first run records
//! what it observes; later runs check against the recording. In training
//! mode, a divergent observation widens the stored criterion instead of
//! failing: two strings become an anchored regex over their common parts, two
//! numbers become an inclusive range.
//!
//! ## Core Concepts
//!
//! - **Position**: assertion ids derived from call order and nesting, so test
//!   authors never number their assertions
//! - **Constraint**: a stored criterion (exact value, range, prefix, regex,
//!   per-field checks, or a conjunction of those)
//! - **Synthesis**: computing the most specific constraint that accepts both
//!   the old observations and a new one
//! - **Mode**: what a mismatch does (fail, ask a repair strategy, or train)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use expects::{ExpectationEngine, Mode};
//!
//! let mut engine = ExpectationEngine::with_mode(Mode::Training)?;
//! engine.start_suite("Login", Path::new("suites/login.robot"))?;
//! engine.start_test("Valid login", "Login.Valid login");
//!
//! engine.expect("Welcome, alice")?;      // id "1"
//! engine.validate(200, Some("status"))?; // explicit id
//!
//! engine.end_test("Valid login", "Login.Valid login");
//! engine.end_suite("Login")?;            // writes suites/login.json
//! # Ok::<(), expects::ExpectError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constraint;
pub mod engine;
pub mod error;
pub mod observation;
pub mod position;
pub mod storage;
pub mod synthesis;
pub mod validator;

// Re-export primary types at crate root for convenience
pub use constraint::{Constraint, ConstraintEditor, ExpectationRecord};
pub use engine::{
    EngineConfig, Event, ExpectationEngine, FailRepair, Mode, PromptRepair, RepairRequest,
    RepairStrategy, StepAttrs,
};
pub use error::{ExpectError, ExpectResult, StoreError, SynthesisError};
pub use observation::{DescribeFields, Observation};
pub use position::{CallSite, ExecutionContext, PositionTracker};
pub use storage::{ExpectationDocument, ExpectationStore, Group};
pub use synthesis::{decompose, regexpify, resolve, synthesize};
pub use validator::{validate, Failure, ValidationReport};
