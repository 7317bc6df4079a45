//! Execution position tracking.
//!
//! Assertion ids are derived from call order alone. Within a scope, the n-th
//! assertion gets id `n`; an assertion nested inside the m-th anonymous
//! (library-provided) step gets `m.n`, and so on, like outline numbering.
//! Named scopes (suite, test, user-defined step) each get their own numbering
//! and their own list of stored expectations.

use crate::storage::Group;

/// Dewey-decimal position within one named scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionTracker {
    stack: Vec<String>,
    counter: u32,
}

impl PositionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, n: u32) -> String {
        match self.stack.last() {
            Some(top) => format!("{top}.{n}"),
            None => n.to_string(),
        }
    }

    /// Claims the next sibling slot and returns its path.
    pub fn next_id(&mut self) -> String {
        self.counter += 1;
        self.slot(self.counter)
    }

    /// Descends into the next sibling slot; its children are numbered from 1.
    pub fn enter_scope(&mut self) {
        let segment = self.next_id();
        self.stack.push(segment);
        self.counter = 0;
    }

    /// Returns to the parent level, continuing after the slot just left.
    pub fn exit_scope(&mut self) {
        let Some(segment) = self.stack.pop() else {
            tracing::warn!("scope exit without matching enter");
            return;
        };
        self.counter = segment
            .rsplit('.')
            .next()
            .and_then(|suffix| suffix.parse().ok())
            .unwrap_or(0);
    }

    /// Nesting depth below the named scope.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Path of the innermost anonymous scope, if any.
    #[must_use]
    pub fn current_path(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }
}

/// A named scope that owns a list of expectations.
#[derive(Debug, Clone)]
pub struct ScopeFrame {
    name: String,
    group: Group,
    tracker: PositionTracker,
    calls: usize,
}

impl ScopeFrame {
    fn new(name: impl Into<String>, group: Group) -> Self {
        Self {
            name: name.into(),
            group,
            tracker: PositionTracker::new(),
            calls: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn group(&self) -> Group {
        self.group
    }

    #[must_use]
    pub const fn calls(&self) -> usize {
        self.calls
    }
}

/// Where an assertion call lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Named scope the expectation is filed under.
    pub scope: String,
    pub group: Group,
    /// Explicit id, or the positional fallback.
    pub id: String,
    /// 1-based call index within the scope for this run.
    pub index: usize,
}

/// Scope stack for one suite run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    frames: Vec<ScopeFrame>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a named scope with fresh numbering.
    pub fn enter_named(&mut self, name: &str, group: Group) {
        tracing::debug!(scope = name, ?group, "enter scope");
        self.frames.push(ScopeFrame::new(name, group));
    }

    /// Closes the innermost scope called `name` and anything opened inside it.
    pub fn exit_named(&mut self, name: &str) {
        match self.frames.iter().rposition(|f| f.name == name) {
            Some(pos) => {
                if pos + 1 != self.frames.len() {
                    tracing::warn!(scope = name, "closing scope with unclosed children");
                }
                self.frames.truncate(pos);
                tracing::debug!(scope = name, "exit scope");
            }
            None => tracing::warn!(scope = name, "exit for a scope that is not open"),
        }
    }

    /// An anonymous step only advances numbering in the current scope.
    pub fn enter_anonymous(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.tracker.enter_scope();
        }
    }

    pub fn exit_anonymous(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.tracker.exit_scope();
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&ScopeFrame> {
        self.frames.last()
    }

    /// Registers one assertion call in the current scope.
    ///
    /// The position advances even when an explicit id is given, so positional
    /// ids of later calls do not depend on which earlier calls were named.
    pub fn next_call(&mut self, explicit_id: Option<&str>) -> Option<CallSite> {
        let frame = self.frames.last_mut()?;
        let positional = frame.tracker.next_id();
        frame.calls += 1;
        Some(CallSite {
            scope: frame.name.clone(),
            group: frame.group,
            id: explicit_id.map_or(positional, str::to_string),
            index: frame.calls,
        })
    }
}
