//! Observed values handed to an assertion.
//!
//! An observation is either a plain JSON-representable scalar or a composite
//! whose fields were described explicitly by the value's type.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ExpectError, ExpectResult};

/// Capability for types whose serializable fields can be checked one by one.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use expects::{DescribeFields, Observation};
///
/// struct Response {
///     status: u16,
///     body: String,
/// }
///
/// impl DescribeFields for Response {
///     fn describe_fields(&self) -> BTreeMap<String, serde_json::Value> {
///         BTreeMap::from([
///             ("status".to_string(), self.status.into()),
///             ("body".to_string(), self.body.clone().into()),
///         ])
///     }
/// }
///
/// let obs = Observation::composite(&Response { status: 200, body: "ok".into() });
/// assert!(obs.is_composite());
/// assert_eq!(obs.field("status"), Some(Observation::from(200)));
/// ```
pub trait DescribeFields {
    /// Returns the currently observable fields as a name to value mapping.
    fn describe_fields(&self) -> BTreeMap<String, Value>;
}

/// A value observed at an assertion call.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// A JSON-representable value, compared as a whole.
    Scalar(Value),
    /// A value tracked field by field.
    Composite(BTreeMap<String, Value>),
}

impl Observation {
    /// Wraps any serializable value as a scalar observation.
    pub fn scalar<T: Serialize + ?Sized>(value: &T) -> ExpectResult<Self> {
        serde_json::to_value(value)
            .map(Self::Scalar)
            .map_err(|e| ExpectError::internal(format!("serialize observation: {e}")))
    }

    /// Builds a composite observation from an explicit field description.
    pub fn composite<T: DescribeFields + ?Sized>(value: &T) -> Self {
        Self::Composite(value.describe_fields())
    }

    /// Builds a composite observation from the serialized fields of `value`.
    ///
    /// Fails if `value` does not serialize to a JSON object.
    pub fn fields_of<T: Serialize + ?Sized>(value: &T) -> ExpectResult<Self> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(Self::Composite(map.into_iter().collect())),
            Ok(other) => Err(ExpectError::internal(format!(
                "expected a value with fields, got {}",
                json_type_name(&other)
            ))),
            Err(e) => Err(ExpectError::internal(format!("serialize observation: {e}"))),
        }
    }

    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    pub const fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            Self::Composite(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.as_scalar() {
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Whether the observation has named fields (a composite or a JSON object).
    pub fn has_fields(&self) -> bool {
        matches!(self, Self::Composite(_) | Self::Scalar(Value::Object(_)))
    }

    /// Returns the named field, if the observation exposes one.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Self> {
        match self {
            Self::Composite(fields) => fields.get(name).cloned().map(Self::Scalar),
            Self::Scalar(Value::Object(map)) => map.get(name).cloned().map(Self::Scalar),
            Self::Scalar(_) => None,
        }
    }

    /// The JSON form used for equality and diagnostics.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::Composite(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(v) => json_type_name(v),
            Self::Composite(_) => "composite",
        }
    }
}

/// Type name of a JSON value as used in diagnostics.
pub(crate) const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<Value> for Observation {
    fn from(v: Value) -> Self {
        Self::Scalar(v)
    }
}

impl From<bool> for Observation {
    fn from(v: bool) -> Self {
        Self::Scalar(Value::Bool(v))
    }
}

impl From<i32> for Observation {
    fn from(v: i32) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<i64> for Observation {
    fn from(v: i64) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<u32> for Observation {
    fn from(v: u32) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<u64> for Observation {
    fn from(v: u64) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<f64> for Observation {
    fn from(v: f64) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<&str> for Observation {
    fn from(v: &str) -> Self {
        Self::Scalar(Value::String(v.to_string()))
    }
}

impl From<String> for Observation {
    fn from(v: String) -> Self {
        Self::Scalar(Value::String(v))
    }
}

impl From<BTreeMap<String, Value>> for Observation {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self::Composite(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_scalar_from_conversions() {
        assert_eq!(Observation::from("hi"), Observation::Scalar(json!("hi")));
        assert_eq!(Observation::from(5), Observation::Scalar(json!(5)));
        assert_eq!(Observation::from(true).type_name(), "bool");
        assert_eq!(Observation::from(2.5).as_f64(), Some(2.5));
    }

    #[test]
    fn test_fields_of_struct() {
        let obs = Observation::fields_of(&Point { x: 1, y: 2 }).unwrap();
        assert!(obs.is_composite());
        assert_eq!(obs.field("x"), Some(Observation::from(1)));
        assert_eq!(obs.field("z"), None);
        assert_eq!(obs.to_json(), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_fields_of_rejects_scalar() {
        assert!(Observation::fields_of(&5).is_err());
    }

    #[test]
    fn test_json_object_exposes_fields() {
        let obs = Observation::from(json!({"name": "a"}));
        assert!(obs.has_fields());
        assert!(!obs.is_composite());
        assert_eq!(obs.field("name"), Some(Observation::from("a")));
        assert!(!Observation::from("a").has_fields());
    }

    #[test]
    fn test_display_uses_json() {
        assert_eq!(format!("{}", Observation::from("hi")), "\"hi\"");
        assert_eq!(format!("{}", Observation::from(3)), "3");
    }
}
