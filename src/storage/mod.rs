//! Expectation storage.
//!
//! One JSON document per suite, next to the suite source file. It is read
//! once when the suite starts, mutated in memory while the suite runs, and
//! written back unconditionally when the suite ends.

pub mod codec;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constraint::ExpectationRecord;
use crate::error::StoreError;

/// Which half of the document a scope's records live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// Suites and tests.
    Tests,
    /// User-defined steps (persisted as `Keywords`).
    Steps,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tests => write!(f, "Tests"),
            Self::Steps => write!(f, "Keywords"),
        }
    }
}

/// The persisted document: scope name to ordered records, per group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectationDocument {
    #[serde(rename = "Keywords", default)]
    pub steps: BTreeMap<String, Vec<ExpectationRecord>>,
    #[serde(rename = "Tests", default)]
    pub tests: BTreeMap<String, Vec<ExpectationRecord>>,
}

impl ExpectationDocument {
    fn group(&self, group: Group) -> &BTreeMap<String, Vec<ExpectationRecord>> {
        match group {
            Group::Tests => &self.tests,
            Group::Steps => &self.steps,
        }
    }

    fn group_mut(&mut self, group: Group) -> &mut BTreeMap<String, Vec<ExpectationRecord>> {
        match group {
            Group::Tests => &mut self.tests,
            Group::Steps => &mut self.steps,
        }
    }
}

/// Owns the expectation document for one suite run.
#[derive(Debug, Clone)]
pub struct ExpectationStore {
    path: PathBuf,
    document: ExpectationDocument,
    existed: bool,
    indent: usize,
}

impl ExpectationStore {
    /// Default number of spaces per indentation level on disk.
    pub const DEFAULT_INDENT: usize = 4;

    /// Derives the document path: the source's extension replaced by `suffix`.
    #[must_use]
    pub fn path_for(source: &Path, suffix: &str) -> PathBuf {
        let mut path = source.with_extension("").into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }

    /// Creates an empty store that will be written to `path`.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: ExpectationDocument::default(),
            existed: false,
            indent: Self::DEFAULT_INDENT,
        }
    }

    /// Loads the document at `path`, or starts empty if there is none.
    ///
    /// # Errors
    /// - `Io` if the file exists but cannot be read
    /// - `Malformed` if it is not a valid expectation document
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no expectation file, starting empty");
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let document: ExpectationDocument = codec::from_json(&content, &path)?;
        tracing::debug!(
            path = %path.display(),
            tests = document.tests.len(),
            steps = document.steps.len(),
            "expectations loaded"
        );
        Ok(Self {
            path,
            document,
            existed: true,
            indent: Self::DEFAULT_INDENT,
        })
    }

    /// Loads the document belonging to a suite source file.
    pub fn load(source: &Path, suffix: &str) -> Result<Self, StoreError> {
        Self::open(Self::path_for(source, suffix))
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Whether a document existed on disk when this store was loaded.
    #[must_use]
    pub const fn existed(&self) -> bool {
        self.existed
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn document(&self) -> &ExpectationDocument {
        &self.document
    }

    /// Records for a scope, if any were ever created.
    #[must_use]
    pub fn records(&self, scope: &str, group: Group) -> Option<&[ExpectationRecord]> {
        self.document.group(group).get(scope).map(Vec::as_slice)
    }

    /// Mutable records for an existing scope.
    pub fn records_mut(&mut self, scope: &str, group: Group) -> Option<&mut Vec<ExpectationRecord>> {
        self.document.group_mut(group).get_mut(scope)
    }

    /// The record list for a scope, created empty on first use.
    pub fn ensure_scope(&mut self, scope: &str, group: Group) -> &mut Vec<ExpectationRecord> {
        self.document
            .group_mut(group)
            .entry(scope.to_string())
            .or_default()
    }

    /// Writes the document, whether or not anything changed.
    pub fn save(&self) -> Result<(), StoreError> {
        let content = codec::to_json_pretty(&self.document, self.indent)?;
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "expectations saved");
        Ok(())
    }
}
