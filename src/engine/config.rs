//! Engine configuration.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::{ExpectError, ExpectResult};
use crate::storage::ExpectationStore;

/// Failure-repair policy, fixed for the lifetime of an engine.
///
/// The mode never changes which predicates are checked, only what happens
/// when a check fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Mismatches fail the test.
    #[default]
    Normal,
    /// Mismatches are handed to a repair strategy, then rechecked once.
    Interactive,
    /// Mismatches widen the stored constraint, then are rechecked once.
    Training,
}

impl Mode {
    #[must_use]
    pub const fn is_training(self) -> bool {
        matches!(self, Self::Training)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Interactive => write!(f, "interactive"),
            Self::Training => write!(f, "training"),
        }
    }
}

/// Unrecognized mode name.
#[derive(Debug, Error)]
#[error("Unknown mode '{0}', expected normal, interactive or training")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "interactive" => Ok(Self::Interactive),
            "training" => Ok(Self::Training),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Library name the host reports for this crate's assertion steps.
pub const DEFAULT_ASSERTION_LIBRARY: &str = "Expects";

/// Configuration for an [`ExpectationEngine`](super::ExpectationEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Repair policy.
    pub mode: Mode,
    /// Replaces the suite source's extension to name the expectation file.
    pub file_suffix: String,
    /// Spaces per indentation level in the saved file.
    pub indent: usize,
    /// Library whose steps are assertion calls. Its step events do not move
    /// the position, so the assertion takes the slot the step would have.
    /// Empty treats every library step alike.
    pub assertion_library: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Normal,
            file_suffix: ".json".to_string(),
            indent: ExpectationStore::DEFAULT_INDENT,
            assertion_library: DEFAULT_ASSERTION_LIBRARY.to_string(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_assertion_library(mut self, library: impl Into<String>) -> Self {
        self.assertion_library = library.into();
        self
    }

    pub fn validate(self) -> ExpectResult<Self> {
        if !self.file_suffix.starts_with('.') || self.file_suffix.len() < 2 {
            return Err(ExpectError::internal(format!(
                "file_suffix must start with '.' and name an extension (got '{}')",
                self.file_suffix
            )));
        }
        if self.file_suffix.contains(['/', '\\']) {
            return Err(ExpectError::internal(format!(
                "file_suffix must not contain path separators (got '{}')",
                self.file_suffix
            )));
        }
        if self.indent == 0 {
            return Err(ExpectError::internal("indent must be > 0"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EngineConfig::default().validate().unwrap();
        assert_eq!(cfg.mode, Mode::Normal);
        assert_eq!(cfg.file_suffix, ".json");
        assert_eq!(cfg.indent, 4);
        assert_eq!(cfg.assertion_library, "Expects");
    }

    #[test]
    fn config_rejects_bad_suffix_and_indent() {
        let mut c = EngineConfig::default();
        c.file_suffix = "json".to_string();
        assert!(c.validate().is_err());

        let mut c = EngineConfig::default();
        c.file_suffix = ".".to_string();
        assert!(c.validate().is_err());

        let mut c = EngineConfig::default();
        c.file_suffix = "./x.json".to_string();
        assert!(c.validate().is_err());

        let mut c = EngineConfig::default();
        c.indent = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("TRAINING".parse::<Mode>().unwrap(), Mode::Training);
        assert_eq!(" interactive ".parse::<Mode>().unwrap(), Mode::Interactive);
        assert_eq!(Mode::Normal.to_string(), "normal");
        let err = "learn".parse::<Mode>().unwrap_err();
        assert!(err.to_string().contains("'learn'"));
    }
}
