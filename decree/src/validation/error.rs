//! Structured validation failures

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use decree_common::{ErrorSeverity, Severity};

use crate::typing::repr;

/// One step of the path to a failing value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocItem {
    Key(String),
    Index(usize),
}

impl fmt::Display for LocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocItem::Key(key) => f.write_str(key),
            LocItem::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for LocItem {
    fn from(key: &str) -> Self {
        LocItem::Key(key.to_string())
    }
}

impl From<usize> for LocItem {
    fn from(index: usize) -> Self {
        LocItem::Index(index)
    }
}

/// A single failing value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    /// Parameter name (or positional index) followed by any nested path
    pub loc: Vec<LocItem>,
    pub msg: String,
    pub input: Value,
    /// Machine-readable error kind, e.g. `greater_than`
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ErrorDetail {
    pub fn new(loc: Vec<LocItem>, kind: &'static str, msg: impl Into<String>, input: Value) -> Self {
        Self {
            loc,
            msg: msg.into(),
            input,
            kind,
        }
    }

    /// `a.0.b`
    pub fn loc_path(&self) -> String {
        self.loc
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Input did not validate against a signature
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ValidationError {
    /// Name of the validated function
    pub title: String,
    pub errors: Vec<ErrorDetail>,
    /// Inputs were withheld from the rendered message
    pub hide_input: bool,
}

impl ValidationError {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// `"s"` for any count but one
pub(crate) fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Python-style type name of a JSON input
pub(crate) fn input_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        write!(f, "{count} validation error{} for {}", plural(count), self.title)?;
        for error in &self.errors {
            write!(f, "\n{}\n  {} [type={}", error.loc_path(), error.msg, error.kind)?;
            if !self.hide_input {
                write!(
                    f,
                    ", input_value={}, input_type={}",
                    repr(&error.input),
                    input_type(&error.input)
                )?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// A validator could not be built for a signature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error building validator for function '{title}': {message}")]
pub struct SchemaError {
    pub title: String,
    pub message: String,
}

impl Severity for ValidationError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }
}

impl Severity for SchemaError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        let err = ValidationError {
            title: "f".to_string(),
            errors: vec![ErrorDetail::new(
                vec!["limit".into(), 0.into()],
                "greater_than",
                "Input should be greater than 0",
                json!(-1),
            )],
            hide_input: false,
        };
        assert_eq!(
            err.to_string(),
            "1 validation error for f\nlimit.0\n  Input should be greater than 0 \
             [type=greater_than, input_value=-1, input_type=int]"
        );

        let hidden = ValidationError {
            hide_input: true,
            ..err
        };
        assert!(hidden.to_string().ends_with("[type=greater_than]"));
    }

    #[test]
    fn test_input_type() {
        assert_eq!(input_type(&json!(1.5)), "float");
        assert_eq!(input_type(&json!("x")), "str");
        assert_eq!(input_type(&json!(null)), "NoneType");
    }
}
