//! Constraint types for stored expectations.
//!
//! A constraint is the criterion an observed value must satisfy. In memory it
//! is a tagged variant; on disk it is a flat record whose optional keys are
//! conjoined, which maps onto [`Constraint::AllOf`] when more than one key is
//! present.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::error::{ExpectError, ExpectResult};

/// A criterion an observed value must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Value must be structurally equal.
    Exact(Value),

    /// Value must be numeric and within the inclusive bounds.
    Range {
        /// Minimum value (inclusive).
        min: Option<Number>,
        /// Maximum value (inclusive).
        max: Option<Number>,
    },

    /// Value must be a string starting with this text.
    Prefix(String),

    /// Value must be a string matched from its start by this regex.
    Pattern {
        /// Regex source.
        regex: String,
        /// Observations the regex was synthesized from.
        examples: Vec<String>,
    },

    /// Every named field must exist and satisfy its nested constraint.
    Fields(BTreeMap<String, Constraint>),

    /// Every member must hold.
    AllOf(Vec<Constraint>),
}

impl Constraint {
    /// Creates an exact-match constraint.
    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact(value.into())
    }

    /// Creates an inclusive range constraint.
    #[must_use]
    pub fn range(min: impl Into<Number>, max: impl Into<Number>) -> Self {
        Self::Range {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    /// Creates a prefix constraint.
    #[must_use]
    pub fn prefix(text: impl Into<String>) -> Self {
        Self::Prefix(text.into())
    }

    /// Creates a user-authored regex constraint (no examples).
    #[must_use]
    pub fn pattern(regex: impl Into<String>) -> Self {
        Self::Pattern {
            regex: regex.into(),
            examples: Vec::new(),
        }
    }

    /// Creates a field-wise constraint.
    #[must_use]
    pub fn fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Constraint)>,
        K: Into<String>,
    {
        Self::Fields(fields.into_iter().map(|(k, c)| (k.into(), c)).collect())
    }

    /// Combines parts into a single constraint, flattening nested conjunctions.
    #[must_use]
    pub fn from_parts(parts: Vec<Constraint>) -> Self {
        let mut flat: Vec<Constraint> = parts.into_iter().flat_map(Self::into_parts).collect();
        flat.sort_by_key(Self::rank);
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Self::AllOf(flat)
        }
    }

    /// Splits a constraint into its conjoined parts.
    #[must_use]
    pub fn into_parts(self) -> Vec<Constraint> {
        match self {
            Self::AllOf(members) => members.into_iter().flat_map(Self::into_parts).collect(),
            other => vec![other],
        }
    }

    /// Returns a short name for this constraint's kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Exact(_) => "exact",
            Self::Range { .. } => "range",
            Self::Prefix(_) => "prefix",
            Self::Pattern { .. } => "pattern",
            Self::Fields(_) => "fields",
            Self::AllOf(_) => "all_of",
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Exact(_) => 0,
            Self::Range { .. } => 1,
            Self::Prefix(_) => 2,
            Self::Pattern { .. } => 3,
            Self::Fields(_) => 4,
            Self::AllOf(_) => 5,
        }
    }

    /// Fails if the constraint has no flat record form (e.g. two regexes in one conjunction).
    pub(crate) fn check_representable(&self) -> Result<(), String> {
        self.to_raw().map(|_| ())
    }

    fn to_raw(&self) -> Result<RawConstraint, String> {
        let mut raw = RawConstraint::default();
        for part in self.clone().into_parts() {
            match part {
                Self::Exact(v) => {
                    if raw.value.is_some() || raw.min.is_some() || raw.max.is_some() {
                        return Err("exact value combined with another value or range".into());
                    }
                    raw.value = Some(v);
                }
                Self::Range { min, max } => {
                    if raw.value.is_some() || raw.min.is_some() || raw.max.is_some() {
                        return Err("range combined with an exact value or another range".into());
                    }
                    raw.min = min;
                    raw.max = max;
                }
                Self::Prefix(p) => {
                    if raw.startswith.replace(p).is_some() {
                        return Err("more than one prefix in a conjunction".into());
                    }
                }
                Self::Pattern { regex, examples } => {
                    if raw.regex.replace(regex).is_some() {
                        return Err("more than one regex in a conjunction".into());
                    }
                    if !examples.is_empty() {
                        raw.examples = Some(examples);
                    }
                }
                Self::Fields(fields) => {
                    if raw.fields.is_some() {
                        return Err("more than one field map in a conjunction".into());
                    }
                    let mut nested = BTreeMap::new();
                    for (name, c) in fields {
                        nested.insert(name, c.to_raw()?);
                    }
                    raw.fields = Some(nested);
                }
                Self::AllOf(_) => unreachable!("into_parts flattens conjunctions"),
            }
        }
        Ok(raw)
    }

    fn from_raw(raw: RawConstraint) -> Result<Self, String> {
        if raw.value.is_some() && (raw.min.is_some() || raw.max.is_some()) {
            return Err("'value' and 'min'/'max' are mutually exclusive".into());
        }
        if raw.examples.is_some() && raw.regex.is_none() {
            return Err("'examples' requires 'regex'".into());
        }

        let mut parts = Vec::new();
        if let Some(v) = raw.value {
            parts.push(Self::Exact(v));
        }
        if raw.min.is_some() || raw.max.is_some() {
            if let (Some(lo), Some(hi)) = (
                raw.min.as_ref().and_then(Number::as_f64),
                raw.max.as_ref().and_then(Number::as_f64),
            ) {
                if lo > hi {
                    return Err(format!("'min' {lo} is greater than 'max' {hi}"));
                }
            }
            parts.push(Self::Range {
                min: raw.min,
                max: raw.max,
            });
        }
        if let Some(p) = raw.startswith {
            parts.push(Self::Prefix(p));
        }
        if let Some(regex) = raw.regex {
            parts.push(Self::Pattern {
                regex,
                examples: raw.examples.unwrap_or_default(),
            });
        }
        if let Some(fields) = raw.fields {
            let mut nested = BTreeMap::new();
            for (name, c) in fields {
                nested.insert(name, Self::from_raw(c)?);
            }
            parts.push(Self::Fields(nested));
        }

        if parts.is_empty() {
            return Err("record carries no predicate".into());
        }
        Ok(Self::from_parts(parts))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{v}"),
            Self::Range { min, max } => {
                let min_str = min.as_ref().map_or_else(|| "-∞".to_string(), ToString::to_string);
                let max_str = max.as_ref().map_or_else(|| "∞".to_string(), ToString::to_string);
                write!(f, "range([{min_str}, {max_str}])")
            }
            Self::Prefix(p) => write!(f, "startswith({p:?})"),
            Self::Pattern { regex, .. } => write!(f, "regex(/{regex}/)"),
            Self::Fields(fields) => {
                write!(f, "fields{{")?;
                for (i, (name, c)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {c}")?;
                }
                write!(f, "}}")
            }
            Self::AllOf(members) => {
                for (i, c) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().map_err(S::Error::custom)?.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawConstraint::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(D::Error::custom)
    }
}

/// A stored constraint together with the assertion id it was recorded for.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectationRecord {
    /// Assertion id (explicit or positional).
    pub id: String,
    /// The criterion.
    pub constraint: Constraint,
}

impl ExpectationRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            id: id.into(),
            constraint,
        }
    }
}

impl Serialize for ExpectationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut raw = self.constraint.to_raw().map_err(S::Error::custom)?;
        raw.id = Some(self.id.clone());
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExpectationRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw = RawConstraint::deserialize(deserializer)?;
        let id = raw
            .id
            .take()
            .ok_or_else(|| D::Error::custom("expectation record is missing 'id'"))?;
        let constraint = Constraint::from_raw(raw).map_err(D::Error::custom)?;
        Ok(Self { id, constraint })
    }
}

/// Flat on-disk form. Field order is alphabetical so output keys are sorted.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    examples: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, RawConstraint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    startswith: Option<String>,
    // A present `null` is a recorded value, not an absent key.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    value: Option<Value>,
}

fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Mutation API handed to repair strategies.
///
/// Each setter keeps the exact/range exclusivity: setting one drops the other.
pub struct ConstraintEditor<'a> {
    constraint: &'a mut Constraint,
}

impl<'a> ConstraintEditor<'a> {
    pub(crate) fn new(constraint: &'a mut Constraint) -> Self {
        Self { constraint }
    }

    /// The constraint as currently edited.
    #[must_use]
    pub fn constraint(&self) -> &Constraint {
        self.constraint
    }

    /// Discards every predicate and installs `constraint` instead.
    pub fn replace(&mut self, constraint: Constraint) {
        *self.constraint = constraint;
    }

    /// Requires exact equality with `value`.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        let value = value.into();
        self.edit(|parts| {
            parts.retain(|p| !matches!(p, Constraint::Exact(_) | Constraint::Range { .. }));
            parts.push(Constraint::Exact(value));
        });
    }

    /// Requires a number within `[min, max]`.
    pub fn set_min_max(&mut self, min: impl Into<Number>, max: impl Into<Number>) -> ExpectResult<()> {
        let (min, max) = (min.into(), max.into());
        if let (Some(lo), Some(hi)) = (min.as_f64(), max.as_f64()) {
            if lo > hi {
                return Err(ExpectError::invalid_constraint(format!(
                    "min {lo} is greater than max {hi}"
                )));
            }
        }
        self.edit(|parts| {
            parts.retain(|p| !matches!(p, Constraint::Exact(_) | Constraint::Range { .. }));
            parts.push(Constraint::Range {
                min: Some(min),
                max: Some(max),
            });
        });
        Ok(())
    }

    /// Requires a string starting with `prefix`.
    pub fn set_startswith(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        self.edit(|parts| {
            parts.retain(|p| !matches!(p, Constraint::Prefix(_)));
            parts.push(Constraint::Prefix(prefix));
        });
    }

    /// Requires a string matched by `regex`. Recorded examples are dropped.
    pub fn set_regex(&mut self, regex: impl Into<String>) -> ExpectResult<()> {
        let regex = regex.into();
        regex::Regex::new(&regex).map_err(|e| {
            ExpectError::invalid_constraint(format!("invalid regex '{regex}': {e}"))
        })?;
        self.edit(|parts| {
            parts.retain(|p| !matches!(p, Constraint::Pattern { .. }));
            parts.push(Constraint::pattern(regex));
        });
        Ok(())
    }

    /// Sets the nested constraint for one field, adding a field map if needed.
    pub fn set_field(&mut self, name: impl Into<String>, constraint: Constraint) {
        let name = name.into();
        self.edit(|parts| {
            if let Some(Constraint::Fields(fields)) =
                parts.iter_mut().find(|p| matches!(p, Constraint::Fields(_)))
            {
                fields.insert(name, constraint);
            } else {
                parts.push(Constraint::Fields(BTreeMap::from([(name, constraint)])));
            }
        });
    }

    fn edit(&mut self, f: impl FnOnce(&mut Vec<Constraint>)) {
        let current = std::mem::replace(self.constraint, Constraint::AllOf(Vec::new()));
        let mut parts = current.into_parts();
        f(&mut parts);
        *self.constraint = Constraint::from_parts(parts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_flat_with_sorted_keys() {
        let record = ExpectationRecord::new("1", Constraint::exact("hello"));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":"1","value":"hello"}"#);
    }

    #[test]
    fn test_range_keeps_integer_representation() {
        let record = ExpectationRecord::new("2", Constraint::range(5, 9));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":"2","max":9,"min":5}"#);
    }

    #[test]
    fn test_multiple_keys_become_all_of() {
        let record: ExpectationRecord = serde_json::from_value(json!({
            "id": "x",
            "startswith": "ab",
            "regex": "^ab.*$"
        }))
        .unwrap();
        let Constraint::AllOf(members) = &record.constraint else {
            panic!("expected conjunction, got {:?}", record.constraint);
        };
        assert_eq!(members.len(), 2);
        assert_eq!(members[0], Constraint::prefix("ab"));
    }

    #[test]
    fn test_value_with_range_is_rejected() {
        let err = serde_json::from_value::<ExpectationRecord>(json!({
            "id": "1", "value": 3, "min": 1, "max": 4
        }))
        .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_value::<ExpectationRecord>(json!({"value": 1})).is_err());
    }

    #[test]
    fn test_null_value_is_recorded() {
        let record: ExpectationRecord =
            serde_json::from_value(json!({"id": "1", "value": null})).unwrap();
        assert_eq!(record.constraint, Constraint::Exact(Value::Null));
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back, json!({"id": "1", "value": null}));
    }

    #[test]
    fn test_nested_fields_without_ids() {
        let c = Constraint::fields([
            ("name", Constraint::exact("bob")),
            ("age", Constraint::range(30, 40)),
        ]);
        let json = serde_json::to_value(ExpectationRecord::new("1", c.clone())).unwrap();
        assert_eq!(
            json,
            json!({"id": "1", "fields": {"age": {"min": 30, "max": 40}, "name": {"value": "bob"}}})
        );
        let back: ExpectationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.constraint, c);
    }

    #[test]
    fn test_editor_value_replaces_range() {
        let mut c = Constraint::from_parts(vec![Constraint::range(1, 2), Constraint::prefix("a")]);
        ConstraintEditor::new(&mut c).set_value("abc");
        assert_eq!(
            c,
            Constraint::AllOf(vec![Constraint::exact("abc"), Constraint::prefix("a")])
        );
    }

    #[test]
    fn test_editor_min_max_replaces_value() {
        let mut c = Constraint::exact(4);
        ConstraintEditor::new(&mut c).set_min_max(1, 10).unwrap();
        assert_eq!(c, Constraint::range(1, 10));
        assert!(ConstraintEditor::new(&mut c).set_min_max(10, 1).is_err());
    }

    #[test]
    fn test_editor_rejects_bad_regex() {
        let mut c = Constraint::exact("a");
        assert!(ConstraintEditor::new(&mut c).set_regex("(").is_err());
        assert_eq!(c, Constraint::exact("a"));
    }

    #[test]
    fn test_editor_set_field_merges() {
        let mut c = Constraint::fields([("a", Constraint::exact(1))]);
        let mut editor = ConstraintEditor::new(&mut c);
        editor.set_field("b", Constraint::exact(2));
        editor.set_field("a", Constraint::range(0, 5));
        assert_eq!(
            c,
            Constraint::fields([("a", Constraint::range(0, 5)), ("b", Constraint::exact(2))])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Constraint::exact("hi").to_string(), "\"hi\"");
        assert_eq!(Constraint::range(1, 2).to_string(), "range([1, 2])");
        assert_eq!(Constraint::pattern("^a$").to_string(), "regex(/^a$/)");
    }
}
