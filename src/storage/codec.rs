//! JSON codec for expectation documents.
//!
//! Output is pretty-printed with a configurable indent. Keys come out sorted
//! because every map is a `BTreeMap` and record fields are declared in
//! alphabetical order, so files diff cleanly under version control.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::StoreError;

/// Serialize to pretty JSON indented by `indent` spaces, with a trailing newline.
pub fn to_json_pretty<T: Serialize>(value: &T, indent: usize) -> Result<String, StoreError> {
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(
        &mut buf,
        PrettyFormatter::with_indent(indent.as_bytes()),
    );
    value.serialize(&mut ser).map_err(|e| StoreError::Serialize {
        message: e.to_string(),
    })?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| StoreError::Serialize {
        message: e.to_string(),
    })
}

/// Deserialize a document read from `path`.
pub fn from_json<T: DeserializeOwned>(s: &str, path: &Path) -> Result<T, StoreError> {
    serde_json::from_str(s).map_err(|e| StoreError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_output_uses_requested_indent() {
        let out = to_json_pretty(&json!({"b": 1, "a": [true]}), 4).unwrap();
        assert_eq!(out, "{\n    \"a\": [\n        true\n    ],\n    \"b\": 1\n}\n");
    }

    #[test]
    fn malformed_input_names_the_file() {
        let err = from_json::<serde_json::Value>("{not json", Path::new("suite.json")).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        assert!(err.to_string().contains("suite.json"));
    }
}
