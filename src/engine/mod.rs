//! Expectation engine.
//!
//! Wires the execution context, the store, the validator and the
//! synthesizer together. The host framework forwards its lifecycle events;
//! test code calls [`ExpectationEngine::validate`].
//!
//! Per assertion call:
//!
//! 1. The id is the explicit one, or the positional fallback.
//! 2. The record is looked up by id, then by call index within the scope.
//! 3. Nothing found: training mode (or a suite with no file yet) records the
//!    value, other modes fail with `NoExpectationRecorded`.
//! 4. Found: the value is validated. A pass heals a drifted id. A failure is
//!    reported, repaired or widened depending on the mode, and rechecked once.

mod config;
mod events;
mod repair;

pub use config::{EngineConfig, Mode, ParseModeError, DEFAULT_ASSERTION_LIBRARY};
pub use events::{Event, StepAttrs, USER_STEP_KIND};
pub use repair::{FailRepair, PromptRepair, RepairRequest, RepairStrategy};

use std::path::Path;

use crate::constraint::{ConstraintEditor, ExpectationRecord};
use crate::error::{ExpectError, ExpectResult};
use crate::observation::Observation;
use crate::position::{CallSite, ExecutionContext};
use crate::storage::{ExpectationStore, Group};
use crate::synthesis::{resolve, synthesize};
use crate::validator::{validate, ValidationReport};

/// Snapshot-assertion engine for one suite run.
pub struct ExpectationEngine {
    config: EngineConfig,
    // One store per open suite, innermost last.
    stores: Vec<ExpectationStore>,
    context: ExecutionContext,
    repair: Box<dyn RepairStrategy>,
    steps: Vec<StepScope>,
}

impl ExpectationEngine {
    /// Creates an engine. Interactive mode uses [`FailRepair`] until a strategy is set.
    pub fn new(config: EngineConfig) -> ExpectResult<Self> {
        let config = config.validate()?;
        Ok(Self {
            config,
            stores: Vec::new(),
            context: ExecutionContext::new(),
            repair: Box::new(FailRepair),
            steps: Vec::new(),
        })
    }

    /// Creates an engine with default settings and the given mode.
    pub fn with_mode(mode: Mode) -> ExpectResult<Self> {
        Self::new(EngineConfig::default().with_mode(mode))
    }

    /// Sets the strategy used in interactive mode.
    #[must_use]
    pub fn with_repair(mut self, repair: impl RepairStrategy + 'static) -> Self {
        self.repair = Box::new(repair);
        self
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.config.mode
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The store of the innermost open suite.
    #[must_use]
    pub fn store(&self) -> Option<&ExpectationStore> {
        self.stores.last()
    }

    /// Dispatches a host lifecycle event.
    pub fn handle(&mut self, event: Event) -> ExpectResult<()> {
        match event {
            Event::SuiteStart { name, source } => self.start_suite(&name, &source),
            Event::SuiteEnd { name } => self.end_suite(&name),
            Event::TestStart { name, long_name } => {
                self.start_test(&name, &long_name);
                Ok(())
            }
            Event::TestEnd { name, long_name } => {
                self.end_test(&name, &long_name);
                Ok(())
            }
            Event::StepStart { name, attrs } => {
                self.start_step(&name, &attrs);
                Ok(())
            }
            Event::StepEnd { name, attrs } => {
                self.end_step(&name, &attrs);
                Ok(())
            }
        }
    }

    /// Loads the suite's own expectation file. A nested suite's file is
    /// separate from its parent's.
    ///
    /// # Errors
    /// Fails if the file exists but cannot be read or parsed.
    pub fn start_suite(&mut self, name: &str, source: &Path) -> ExpectResult<()> {
        let store = ExpectationStore::load(source, &self.config.file_suffix)?
            .with_indent(self.config.indent);
        tracing::info!(
            suite = name,
            path = %store.path().display(),
            mode = %self.config.mode,
            first_run = !store.existed(),
            "suite started"
        );
        self.stores.push(store);
        self.context.enter_named(name, Group::Tests);
        Ok(())
    }

    /// Saves the ending suite's expectation file.
    ///
    /// # Errors
    /// `NoActiveSuite` without a matching start; `Store` if the write fails.
    pub fn end_suite(&mut self, name: &str) -> ExpectResult<()> {
        self.context.exit_named(name);
        let store = self.stores.pop().ok_or(ExpectError::NoActiveSuite)?;
        store.save()?;
        Ok(())
    }

    fn classify(&self, attrs: &StepAttrs) -> StepScope {
        if attrs.is_user_defined() {
            StepScope::Named
        } else if !self.config.assertion_library.is_empty()
            && attrs.library_name == self.config.assertion_library
        {
            StepScope::Assertion
        } else {
            StepScope::Anonymous
        }
    }

    /// Tests are keyed by their long name, which is unique within a run.
    pub fn start_test(&mut self, _name: &str, long_name: &str) {
        self.steps.clear();
        self.context.enter_named(long_name, Group::Tests);
    }

    pub fn end_test(&mut self, _name: &str, long_name: &str) {
        self.steps.clear();
        self.context.exit_named(long_name);
    }

    pub fn start_step(&mut self, name: &str, attrs: &StepAttrs) {
        let scope = self.classify(attrs);
        self.steps.push(scope);
        match scope {
            StepScope::Named => self.context.enter_named(name, Group::Steps),
            StepScope::Anonymous => self.context.enter_anonymous(),
            StepScope::Assertion => {}
        }
    }

    pub fn end_step(&mut self, name: &str, _attrs: &StepAttrs) {
        match self.steps.pop() {
            Some(StepScope::Named) => self.context.exit_named(name),
            Some(StepScope::Anonymous) => self.context.exit_anonymous(),
            Some(StepScope::Assertion) => {}
            None => tracing::warn!(step = name, "step end without matching start"),
        }
    }

    /// Asserts `value` against the expectation at the current position.
    pub fn expect(&mut self, value: impl Into<Observation>) -> ExpectResult<()> {
        self.validate(value, None)
    }

    /// Asserts `value` against the expectation recorded for `id` (or the
    /// current position when `id` is `None`).
    ///
    /// # Errors
    /// - `UnexpectedValue` / `MissingField` if the value does not match and
    ///   the mode could not repair the expectation
    /// - `NoExpectationRecorded` outside training mode when nothing was recorded
    /// - `UnresolvableSynthesis` if training cannot generalize the expectation
    pub fn validate(&mut self, value: impl Into<Observation>, id: Option<&str>) -> ExpectResult<()> {
        let observed = value.into();
        let mode = self.config.mode;
        let store = self.stores.last_mut().ok_or(ExpectError::NoActiveSuite)?;
        let site = self
            .context
            .next_call(id)
            .ok_or(ExpectError::NoActiveSuite)?;
        let first_run = !store.existed();
        let records = store.ensure_scope(&site.scope, site.group);

        let Some(index) = locate(records, &site) else {
            if mode.is_training() || first_run {
                let constraint = synthesize(&observed)?;
                tracing::info!(
                    scope = %site.scope,
                    id = %site.id,
                    expectation = %constraint,
                    "recording expectation"
                );
                records.push(ExpectationRecord::new(site.id, constraint));
                return Ok(());
            }
            return Err(ExpectError::NoExpectationRecorded {
                scope: site.scope,
                id: site.id,
            });
        };

        let record = &mut records[index];
        let report = validate(&observed, &record.constraint);
        if report.passed() {
            heal_id(record, &site);
            return Ok(());
        }

        tracing::warn!(
            scope = %site.scope,
            id = %site.id,
            %mode,
            report = %report,
            "value does not match expectation"
        );

        match mode {
            Mode::Normal => return Err(failure(&site.id, report)),
            Mode::Interactive => {
                self.repair.repair(RepairRequest {
                    scope: &site.scope,
                    id: &site.id,
                    observed: &observed,
                    report: &report,
                    editor: ConstraintEditor::new(&mut record.constraint),
                })?;
            }
            Mode::Training => {
                record.constraint = resolve(&record.constraint, &observed)?;
                tracing::info!(
                    scope = %site.scope,
                    id = %site.id,
                    expectation = %record.constraint,
                    "expectation widened"
                );
            }
        }

        let report = validate(&observed, &record.constraint);
        if !report.passed() {
            return Err(failure(&site.id, report));
        }
        heal_id(record, &site);
        Ok(())
    }
}

/// How an open step affects the execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepScope {
    /// User-defined step with its own records.
    Named,
    /// Library step; only nests numbering.
    Anonymous,
    /// The assertion call itself; its position is claimed by the call.
    Assertion,
}

/// First record with the call's id, else the record at the call's position.
fn locate(records: &[ExpectationRecord], site: &CallSite) -> Option<usize> {
    records
        .iter()
        .position(|r| r.id == site.id)
        .or_else(|| (site.index <= records.len()).then(|| site.index - 1))
}

fn heal_id(record: &mut ExpectationRecord, site: &CallSite) {
    if record.id != site.id {
        tracing::debug!(
            scope = %site.scope,
            from = %record.id,
            to = %site.id,
            "expectation id updated"
        );
        record.id.clone_from(&site.id);
    }
}

fn failure(id: &str, report: ValidationReport) -> ExpectError {
    let missing = report.missing_fields().next().map(str::to_string);
    match missing {
        Some(field) => ExpectError::MissingField {
            id: id.to_string(),
            field,
            report,
        },
        None => ExpectError::UnexpectedValue {
            id: id.to_string(),
            report,
        },
    }
}
