// src/schema/validator.rs

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Rendered path used for issues that apply to the whole input.
pub const ROOT_PATH: &str = "<root>";

/// The single capability every argument checker exposes, whether it was
/// compiled from a schema document or supplied natively by a provider.
pub trait Validator: Send + Sync + fmt::Debug {
    /// Checks `value` and returns the (possibly coerced) value to hand to the tool.
    fn validate(&self, value: &Value) -> Result<Value, ValidationError>;

    /// Schema document advertised to callers for this validator.
    fn json_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }
}

/// One step into a JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

pub fn render_path(path: &[Segment]) -> String {
    if path.is_empty() {
        return ROOT_PATH.to_string();
    }
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => out.push_str(&format!("[{}]", index)),
        }
    }
    out
}

/// Joins a nested issue path onto the location where a nested validator ran.
pub(crate) fn join_path(base: &[Segment], nested: &str) -> String {
    let base = render_path(base);
    if base == ROOT_PATH {
        return nested.to_string();
    }
    if nested == ROOT_PATH {
        return base;
    }
    if nested.starts_with('[') {
        format!("{}{}", base, nested)
    } else {
        format!("{}.{}", base, nested)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every failing path found while checking one value.
#[derive(Debug, Clone, Error)]
#[error("{}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    if issues.is_empty() {
        return format!("{}: invalid value", ROOT_PATH);
    }
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    /// True when some issue is reported against `path`.
    pub fn mentions(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_paths() {
        let path = vec![
            Segment::Key("orders".into()),
            Segment::Index(2),
            Segment::Key("quantity".into()),
        ];
        assert_eq!(render_path(&path), "orders[2].quantity");
        assert_eq!(render_path(&[]), ROOT_PATH);
    }

    #[test]
    fn joins_native_issue_paths() {
        let base = vec![Segment::Key("wallet".into())];
        assert_eq!(join_path(&base, "address"), "wallet.address");
        assert_eq!(join_path(&base, "[0]"), "wallet[0]");
        assert_eq!(join_path(&base, ROOT_PATH), "wallet");
        assert_eq!(join_path(&[], "address"), "address");
    }

    #[test]
    fn error_message_lists_every_issue() {
        let err = ValidationError::new(vec![
            ValidationIssue {
                path: "quantity".into(),
                message: "expected number, got string".into(),
            },
            ValidationIssue {
                path: "address".into(),
                message: "required field is missing".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "quantity: expected number, got string; address: required field is missing"
        );
        assert!(err.mentions("address"));
    }
}
