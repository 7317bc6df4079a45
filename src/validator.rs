//! Constraint evaluation.
//!
//! Every predicate in a constraint is evaluated, even after one has failed,
//! so a report lists all reasons a value was rejected.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use serde_json::{Number, Value};

use crate::constraint::Constraint;
use crate::error::{ExpectError, ExpectResult};
use crate::observation::Observation;

const REGEX_CACHE_MAX: usize = 1024;

thread_local! {
    // Compiled stored patterns. Each run evaluates the same few over and over.
    static REGEX_CACHE: RefCell<HashMap<String, regex::Regex>> = RefCell::new(HashMap::new());
}

pub(crate) fn cached_regex(pattern: &str) -> ExpectResult<regex::Regex> {
    if let Some(re) = REGEX_CACHE.with(|cache| cache.borrow().get(pattern).cloned()) {
        return Ok(re);
    }

    let compiled = regex::Regex::new(pattern).map_err(|e| {
        ExpectError::invalid_constraint(format!("invalid regex '{pattern}': {e}"))
    })?;

    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.len() >= REGEX_CACHE_MAX {
            // Keep the cache bounded to avoid unbounded memory usage.
            cache.clear();
        }
        cache.insert(pattern.to_string(), compiled.clone());
    });
    Ok(compiled)
}

/// One reason an observed value was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// Value differs from the exact expectation.
    Mismatch {
        path: String,
        expected: Value,
        actual: Value,
    },
    /// A tracked field is absent.
    MissingField {
        path: String,
    },
    /// A string predicate was applied to a non-string.
    NotAString {
        path: String,
        predicate: &'static str,
        actual: &'static str,
    },
    PrefixMismatch {
        path: String,
        prefix: String,
        actual: String,
    },
    PatternMismatch {
        path: String,
        regex: String,
        actual: String,
    },
    /// The stored regex does not compile.
    InvalidPattern {
        path: String,
        reason: String,
    },
    /// A range was applied to a non-number.
    NotANumber {
        path: String,
        actual: &'static str,
    },
    OutOfRange {
        path: String,
        value: Number,
        min: Option<Number>,
        max: Option<Number>,
    },
}

impl Failure {
    /// Dotted field path, empty for the value itself.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Mismatch { path, .. }
            | Self::MissingField { path }
            | Self::NotAString { path, .. }
            | Self::PrefixMismatch { path, .. }
            | Self::PatternMismatch { path, .. }
            | Self::InvalidPattern { path, .. }
            | Self::NotANumber { path, .. }
            | Self::OutOfRange { path, .. } => path,
        }
    }

    #[must_use]
    pub const fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }
}

struct Subject<'a>(&'a str);

impl fmt::Display for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "value")
        } else {
            write!(f, "field '{}'", self.0)
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch {
                path,
                expected,
                actual,
            } => match (expected, actual) {
                (Value::String(e), Value::String(a)) => {
                    write!(f, "{} differs: {}", Subject(path), char_diff(e, a))
                }
                _ => write!(f, "{}: expected {expected}, actual {actual}", Subject(path)),
            },
            Self::MissingField { path } => write!(f, "{} is missing", Subject(path)),
            Self::NotAString {
                path,
                predicate,
                actual,
            } => write!(f, "{}: {predicate} requires a string, got {actual}", Subject(path)),
            Self::PrefixMismatch {
                path,
                prefix,
                actual,
            } => write!(f, "{}: {actual:?} does not start with {prefix:?}", Subject(path)),
            Self::PatternMismatch {
                path,
                regex,
                actual,
            } => write!(f, "{}: {actual:?} does not match /{regex}/", Subject(path)),
            Self::InvalidPattern { path, reason } => write!(f, "{}: {reason}", Subject(path)),
            Self::NotANumber { path, actual } => {
                write!(f, "{}: range requires a number, got {actual}", Subject(path))
            }
            Self::OutOfRange {
                path,
                value,
                min,
                max,
            } => {
                let min_str = min.as_ref().map_or_else(|| "-∞".to_string(), ToString::to_string);
                let max_str = max.as_ref().map_or_else(|| "∞".to_string(), ToString::to_string);
                write!(f, "{}: {value} is outside [{min_str}, {max_str}]", Subject(path))
            }
        }
    }
}

/// Character-level report for two differing strings.
///
/// ```text
/// expected "abcXdef", actual "abcYdef", first difference at char 3 ('X' vs 'Y')
/// ```
#[must_use]
pub fn char_diff(expected: &str, actual: &str) -> String {
    let mut e = expected.chars();
    let mut a = actual.chars();
    let mut index = 0usize;
    loop {
        match (e.next(), a.next()) {
            (Some(x), Some(y)) if x == y => index += 1,
            (Some(x), Some(y)) => {
                return format!(
                    "expected {expected:?}, actual {actual:?}, first difference at char {index} ({x:?} vs {y:?})"
                );
            }
            (Some(_), None) => {
                return format!(
                    "expected {expected:?}, actual {actual:?}, actual ends at char {index}"
                );
            }
            (None, Some(_)) => {
                return format!(
                    "expected {expected:?}, actual {actual:?}, actual continues past char {index}"
                );
            }
            (None, None) => return format!("expected {expected:?}, actual {actual:?}"),
        }
    }
}

/// Outcome of checking one value against one constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    failures: Vec<Failure>,
}

impl ValidationReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Paths of tracked fields that were absent.
    pub fn missing_fields(&self) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .filter(|f| f.is_missing_field())
            .map(Failure::path)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "ok");
        }
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// Checks `observed` against every predicate of `constraint`.
#[must_use]
pub fn validate(observed: &Observation, constraint: &Constraint) -> ValidationReport {
    let mut failures = Vec::new();
    check(observed, constraint, "", &mut failures);
    ValidationReport { failures }
}

/// Whether `observed` satisfies `constraint`.
#[must_use]
pub fn accepts(observed: &Observation, constraint: &Constraint) -> bool {
    validate(observed, constraint).passed()
}

fn check(observed: &Observation, constraint: &Constraint, path: &str, out: &mut Vec<Failure>) {
    match constraint {
        Constraint::Exact(expected) => {
            let actual = observed.to_json();
            if !json_eq(expected, &actual) {
                out.push(Failure::Mismatch {
                    path: path.to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Constraint::Fields(fields) => {
            for (name, nested) in fields {
                let field_path = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{path}.{name}")
                };
                match observed.field(name) {
                    Some(value) => check(&value, nested, &field_path, out),
                    None => out.push(Failure::MissingField { path: field_path }),
                }
            }
        }
        Constraint::Prefix(prefix) => match observed.as_str() {
            Some(s) if s.starts_with(prefix.as_str()) => {}
            Some(s) => out.push(Failure::PrefixMismatch {
                path: path.to_string(),
                prefix: prefix.clone(),
                actual: s.to_string(),
            }),
            None => out.push(Failure::NotAString {
                path: path.to_string(),
                predicate: "startswith",
                actual: observed.type_name(),
            }),
        },
        Constraint::Pattern { regex, .. } => {
            let Some(s) = observed.as_str() else {
                out.push(Failure::NotAString {
                    path: path.to_string(),
                    predicate: "regex",
                    actual: observed.type_name(),
                });
                return;
            };
            match cached_regex(regex) {
                // Matched from the start; the end is only pinned if the regex anchors it.
                Ok(re) if re.find(s).is_some_and(|m| m.start() == 0) => {}
                Ok(_) => out.push(Failure::PatternMismatch {
                    path: path.to_string(),
                    regex: regex.clone(),
                    actual: s.to_string(),
                }),
                Err(e) => out.push(Failure::InvalidPattern {
                    path: path.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        Constraint::Range { min, max } => {
            let Some(Value::Number(n)) = observed.as_scalar() else {
                out.push(Failure::NotANumber {
                    path: path.to_string(),
                    actual: observed.type_name(),
                });
                return;
            };
            let v = as_f64(n);
            let below = min.as_ref().is_some_and(|m| v < as_f64(m));
            let above = max.as_ref().is_some_and(|m| v > as_f64(m));
            if below || above || v.is_nan() {
                out.push(Failure::OutOfRange {
                    path: path.to_string(),
                    value: n.clone(),
                    min: min.clone(),
                    max: max.clone(),
                });
            }
        }
        Constraint::AllOf(members) => {
            for member in members {
                check(observed, member, path, out);
            }
        }
    }
}

pub(crate) fn as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

/// Structural equality where `5` and `5.0` are the same number.
pub(crate) fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || as_f64(x) == as_f64(y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}
