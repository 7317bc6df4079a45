//! Constraint synthesis.
//!
//! [`synthesize`] records a first constraint for a value. [`resolve`] takes a
//! constraint that rejects a new value and returns the most specific
//! generalization that still accepts everything the old constraint was built
//! from plus the new value, or an error when no sound generalization exists.
//! Resolution never falls back to "accept anything".

mod substrings;

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::constraint::Constraint;
use crate::error::SynthesisError;
use crate::observation::{json_type_name, Observation};
use crate::validator::{accepts, as_f64};

pub use substrings::{decompose, longest_common_substring, regexpify, WILDCARD};
pub(crate) use substrings::Template;

/// Records a brand-new constraint for `observed`.
///
/// Scalars become an exact match; composites track every field they expose.
pub fn synthesize(observed: &Observation) -> Result<Constraint, SynthesisError> {
    match observed {
        Observation::Scalar(v) => Ok(Constraint::Exact(v.clone())),
        Observation::Composite(fields) => {
            if fields.is_empty() {
                return Err(SynthesisError::NoFields);
            }
            Ok(Constraint::Fields(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Constraint::Exact(v.clone())))
                    .collect(),
            ))
        }
    }
}

/// Widens `constraint` so it also accepts `observed`.
///
/// Parts that already accept the value are returned unchanged. Field maps keep
/// their shape: untracked fields stay untracked.
pub fn resolve(constraint: &Constraint, observed: &Observation) -> Result<Constraint, SynthesisError> {
    if accepts(observed, constraint) {
        return Ok(constraint.clone());
    }

    let resolved = match constraint {
        Constraint::Exact(old) => resolve_exact(old, observed)?,
        Constraint::Range { min, max } => {
            let n = number_of(observed, "range")?;
            widen(min.as_ref(), max.as_ref(), n)
        }
        Constraint::Prefix(prefix) => {
            let s = string_of(observed, "prefix")?;
            let common: String = prefix
                .chars()
                .zip(s.chars())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect();
            if common.is_empty() {
                return Err(SynthesisError::NoCommonSubstring {
                    old: prefix.clone(),
                    new: s.to_string(),
                });
            }
            Constraint::Prefix(common)
        }
        Constraint::Pattern { regex, examples } => {
            let s = string_of(observed, "pattern")?;
            resolve_pattern(regex, examples, s)?
        }
        Constraint::Fields(fields) => resolve_fields(fields, observed)?,
        Constraint::AllOf(members) => {
            let parts = members
                .iter()
                .map(|m| resolve(m, observed))
                .collect::<Result<Vec<_>, _>>()?;
            let combined = Constraint::from_parts(parts);
            if let Err(reason) = combined.check_representable() {
                return Err(SynthesisError::Incompatible {
                    old: constraint.to_string(),
                    new: format!("{observed} ({reason})"),
                });
            }
            combined
        }
    };

    tracing::debug!(
        from = %constraint,
        to = %resolved,
        "constraint widened"
    );
    Ok(resolved)
}

fn resolve_exact(old: &Value, observed: &Observation) -> Result<Constraint, SynthesisError> {
    if let Value::Object(stored) = old {
        if !observed.has_fields() {
            return Err(SynthesisError::ShapeMismatch {
                constraint: "composite",
                observed: observed.type_name(),
            });
        }
        let mut fields = BTreeMap::new();
        for (name, value) in stored {
            let field = observed
                .field(name)
                .ok_or_else(|| SynthesisError::MissingField {
                    field: name.clone(),
                })?;
            fields.insert(name.clone(), resolve(&Constraint::Exact(value.clone()), &field)?);
        }
        return Ok(Constraint::Fields(fields));
    }

    let Observation::Scalar(new) = observed else {
        return Err(SynthesisError::ShapeMismatch {
            constraint: "exact",
            observed: "composite",
        });
    };

    match (old, new) {
        (Value::String(a), Value::String(b)) => {
            let template = Template::literal(a).generalize(&Template::literal(b));
            if !template.has_literal() {
                return Err(SynthesisError::NoCommonSubstring {
                    old: a.clone(),
                    new: b.clone(),
                });
            }
            Ok(Constraint::Pattern {
                regex: template.to_regex(),
                examples: vec![a.clone(), b.clone()],
            })
        }
        (Value::Number(a), Value::Number(b)) => {
            let (lo, hi) = if as_f64(a) <= as_f64(b) { (a, b) } else { (b, a) };
            Ok(Constraint::Range {
                min: Some(lo.clone()),
                max: Some(hi.clone()),
            })
        }
        (Value::Object(_), _) | (_, Value::Object(_)) => Err(SynthesisError::ShapeMismatch {
            constraint: json_type_name(old),
            observed: json_type_name(new),
        }),
        _ => Err(SynthesisError::Incompatible {
            old: format!("{} {old}", json_type_name(old)),
            new: format!("{} {new}", json_type_name(new)),
        }),
    }
}

fn resolve_pattern(regex: &str, examples: &[String], new: &str) -> Result<Constraint, SynthesisError> {
    if examples.is_empty() {
        return Err(SynthesisError::NoExamples {
            regex: regex.to_string(),
        });
    }

    let template = examples
        .iter()
        .fold(Template::literal(new), |acc, example| {
            acc.generalize(&Template::literal(example))
        });
    if !template.has_literal() {
        return Err(SynthesisError::NoCommonSubstring {
            old: examples.join(", "),
            new: new.to_string(),
        });
    }

    let mut examples = examples.to_vec();
    if !examples.iter().any(|e| e == new) {
        examples.push(new.to_string());
    }
    Ok(Constraint::Pattern {
        regex: template.to_regex(),
        examples,
    })
}

fn resolve_fields(
    fields: &BTreeMap<String, Constraint>,
    observed: &Observation,
) -> Result<Constraint, SynthesisError> {
    if !observed.has_fields() {
        return Err(SynthesisError::ShapeMismatch {
            constraint: "fields",
            observed: observed.type_name(),
        });
    }
    let mut resolved = BTreeMap::new();
    for (name, nested) in fields {
        let field = observed
            .field(name)
            .ok_or_else(|| SynthesisError::MissingField {
                field: name.clone(),
            })?;
        resolved.insert(name.clone(), resolve(nested, &field)?);
    }
    Ok(Constraint::Fields(resolved))
}

/// Ranges only ever widen; an open bound stays open.
fn widen(min: Option<&Number>, max: Option<&Number>, n: &Number) -> Constraint {
    let v = as_f64(n);
    let min = match min {
        Some(m) if as_f64(m) <= v => Some(m.clone()),
        Some(_) => Some(n.clone()),
        None => None,
    };
    let max = match max {
        Some(m) if as_f64(m) >= v => Some(m.clone()),
        Some(_) => Some(n.clone()),
        None => None,
    };
    Constraint::Range { min, max }
}

fn number_of<'a>(observed: &'a Observation, constraint: &'static str) -> Result<&'a Number, SynthesisError> {
    match observed {
        Observation::Scalar(Value::Number(n)) => Ok(n),
        other => Err(mismatch(constraint, other)),
    }
}

fn string_of<'a>(observed: &'a Observation, constraint: &'static str) -> Result<&'a str, SynthesisError> {
    match observed {
        Observation::Scalar(Value::String(s)) => Ok(s),
        other => Err(mismatch(constraint, other)),
    }
}

fn mismatch(constraint: &'static str, observed: &Observation) -> SynthesisError {
    if observed.is_composite() {
        SynthesisError::ShapeMismatch {
            constraint,
            observed: "composite",
        }
    } else {
        SynthesisError::Incompatible {
            old: constraint.to_string(),
            new: format!("{} {observed}", observed.type_name()),
        }
    }
}
