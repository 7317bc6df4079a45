//! Repair strategies for interactive mode.
//!
//! When a value fails its expectation in interactive mode, the engine hands
//! the failing record to a [`RepairStrategy`], which may edit the constraint
//! in place. The engine then rechecks once.

use std::io::{BufRead, Write};

use crate::constraint::ConstraintEditor;
use crate::error::{ExpectError, ExpectResult};
use crate::observation::Observation;
use crate::synthesis::synthesize;
use crate::validator::ValidationReport;

/// Everything a strategy needs to repair one failing record.
pub struct RepairRequest<'a> {
    /// Scope the record is filed under.
    pub scope: &'a str,
    /// Assertion id.
    pub id: &'a str,
    /// The rejected value.
    pub observed: &'a Observation,
    /// Why it was rejected.
    pub report: &'a ValidationReport,
    /// Mutation access to the stored constraint.
    pub editor: ConstraintEditor<'a>,
}

/// Edits a failing constraint before the engine rechecks it.
pub trait RepairStrategy {
    /// Returning `Ok` without editing leaves the failure in place.
    fn repair(&mut self, request: RepairRequest<'_>) -> ExpectResult<()>;
}

impl<F> RepairStrategy for F
where
    F: FnMut(RepairRequest<'_>) -> ExpectResult<()>,
{
    fn repair(&mut self, request: RepairRequest<'_>) -> ExpectResult<()> {
        self(request)
    }
}

/// Leaves every failure as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailRepair;

impl RepairStrategy for FailRepair {
    fn repair(&mut self, _request: RepairRequest<'_>) -> ExpectResult<()> {
        Ok(())
    }
}

/// Asks an operator whether to replace the expectation with the new value.
pub struct PromptRepair<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptRepair<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, request: &RepairRequest<'_>) -> std::io::Result<bool> {
        writeln!(self.output)?;
        writeln!(
            self.output,
            "Execution paused at '{}' in '{}'",
            request.id, request.scope
        )?;
        writeln!(self.output, "Validation failed: {}", request.report)?;
        write!(
            self.output,
            "Replace '{}' with new value '{}'? [y/n] ",
            request.editor.constraint(),
            request.observed
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}

impl<R: BufRead, W: Write> RepairStrategy for PromptRepair<R, W> {
    fn repair(&mut self, mut request: RepairRequest<'_>) -> ExpectResult<()> {
        let replace = self
            .ask(&request)
            .map_err(|e| ExpectError::internal(format!("repair prompt: {e}")))?;
        if !replace {
            return Ok(());
        }
        // Trained patterns and ranges go too; the new value is the whole expectation.
        let replacement = synthesize(request.observed)?;
        tracing::info!(
            id = request.id,
            expectation = %replacement,
            "expectation replaced by operator"
        );
        request.editor.replace(replacement);
        Ok(())
    }
}
