// src/schema/compiler.rs
//
// Turns a `SchemaNode` into a `CompiledSchema`. Compilation never fails:
// constraints that cannot be built are dropped and the node gets more
// permissive instead.

use crate::schema::node::{Additional, SchemaNode};
use crate::schema::validator::{
    join_path, json_type_name, render_path, Segment, ValidationError, ValidationIssue, Validator,
};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Argument name that carries the value when a tool's root schema is not an object.
pub const WRAPPED_INPUT_FIELD: &str = "input";

#[derive(Debug, Clone)]
pub enum CompiledSchema {
    Any,
    Null,
    Boolean,
    Literal(Vec<Value>),
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<Regex>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
        exclusive_minimum: Option<f64>,
        exclusive_maximum: Option<f64>,
    },
    Array {
        items: Box<CompiledSchema>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    /// Declared fields are checked, everything else passes through.
    Object { fields: Vec<Field> },
    /// Free-form mapping; every value is checked against one schema.
    Record { values: Box<CompiledSchema> },
    Union(Vec<CompiledSchema>),
    Native(Arc<dyn Validator>),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub schema: CompiledSchema,
    pub required: bool,
}

/// Compiled root of a tool's input.
#[derive(Debug, Clone)]
pub struct ToolInput {
    pub validator: CompiledSchema,
    /// Set when the root was not object-shaped and now lives under
    /// [`WRAPPED_INPUT_FIELD`].
    pub wrapped: bool,
}

pub fn compile(node: &SchemaNode) -> CompiledSchema {
    match node {
        SchemaNode::Native(validator) => CompiledSchema::Native(Arc::clone(validator)),
        SchemaNode::Enum(values) => CompiledSchema::Literal(values.clone()),
        SchemaNode::Const(value) => CompiledSchema::Literal(vec![value.clone()]),
        SchemaNode::String {
            min_length,
            max_length,
            pattern,
        } => CompiledSchema::String {
            min_length: *min_length,
            max_length: *max_length,
            pattern: pattern.as_deref().and_then(compile_pattern),
        },
        SchemaNode::Number {
            integer,
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
        } => CompiledSchema::Number {
            integer: *integer,
            minimum: *minimum,
            maximum: *maximum,
            exclusive_minimum: *exclusive_minimum,
            exclusive_maximum: *exclusive_maximum,
        },
        SchemaNode::Boolean => CompiledSchema::Boolean,
        SchemaNode::Null => CompiledSchema::Null,
        SchemaNode::Array {
            items,
            min_items,
            max_items,
        } => CompiledSchema::Array {
            items: Box::new(items.as_deref().map(compile).unwrap_or(CompiledSchema::Any)),
            min_items: *min_items,
            max_items: *max_items,
        },
        SchemaNode::Object {
            properties,
            required,
            additional,
        } => compile_object(properties, required, additional),
        SchemaNode::Union(variants) if variants.is_empty() => CompiledSchema::Any,
        SchemaNode::Union(variants) => CompiledSchema::Union(variants.iter().map(compile).collect()),
        SchemaNode::Unknown => CompiledSchema::Any,
    }
}

/// Compiles the root of a tool's input so that callers can always pass an
/// object of named arguments.
pub fn compile_tool_input(node: &SchemaNode) -> ToolInput {
    let compiled = compile(node);
    if compiled.is_object_shaped() {
        return ToolInput {
            validator: compiled,
            wrapped: false,
        };
    }
    if matches!(compiled, CompiledSchema::Any) {
        return ToolInput {
            validator: CompiledSchema::Record {
                values: Box::new(CompiledSchema::Any),
            },
            wrapped: false,
        };
    }
    ToolInput {
        validator: CompiledSchema::Object {
            fields: vec![Field {
                name: WRAPPED_INPUT_FIELD.to_string(),
                schema: compiled,
                required: true,
            }],
        },
        wrapped: true,
    }
}

/// Schema document callers see for a root that had to be wrapped.
pub fn wrap_input_schema(schema: &Value) -> Value {
    let mut properties = Map::new();
    properties.insert(WRAPPED_INPUT_FIELD.to_string(), schema.clone());
    json!({
        "type": "object",
        "properties": properties,
        "required": [WRAPPED_INPUT_FIELD]
    })
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            debug!(pattern, error = %err, "Ignoring string pattern that does not compile");
            None
        }
    }
}

fn compile_object(
    properties: &[(String, SchemaNode)],
    required: &[String],
    additional: &Additional,
) -> CompiledSchema {
    if properties.is_empty() {
        match additional {
            Additional::Allowed => {
                return CompiledSchema::Record {
                    values: Box::new(CompiledSchema::Any),
                }
            }
            Additional::Schema(values) => {
                return CompiledSchema::Record {
                    values: Box::new(compile(values)),
                }
            }
            Additional::Unspecified | Additional::Forbidden => {}
        }
    }

    let mut fields: Vec<Field> = properties
        .iter()
        .map(|(name, node)| Field {
            name: name.clone(),
            schema: compile(node),
            required: required.contains(name),
        })
        .collect();
    // Required names the document never declared still have to be present.
    for name in required {
        if !fields.iter().any(|field| &field.name == name) {
            fields.push(Field {
                name: name.clone(),
                schema: CompiledSchema::Any,
                required: true,
            });
        }
    }
    CompiledSchema::Object { fields }
}

impl CompiledSchema {
    pub fn is_object_shaped(&self) -> bool {
        match self {
            CompiledSchema::Object { .. }
            | CompiledSchema::Record { .. }
            | CompiledSchema::Native(_) => true,
            CompiledSchema::Union(variants) => variants.iter().all(Self::is_object_shaped),
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            CompiledSchema::Any => "any value".to_string(),
            CompiledSchema::Null => "null".to_string(),
            CompiledSchema::Boolean => "boolean".to_string(),
            CompiledSchema::Literal(values) => describe_literals(values),
            CompiledSchema::String { .. } => "string".to_string(),
            CompiledSchema::Number { integer: true, .. } => "integer".to_string(),
            CompiledSchema::Number { .. } => "number".to_string(),
            CompiledSchema::Array { .. } => "array".to_string(),
            CompiledSchema::Object { .. } | CompiledSchema::Record { .. } => "object".to_string(),
            CompiledSchema::Union(variants) => variants
                .iter()
                .map(Self::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            CompiledSchema::Native(_) => "value accepted by the tool".to_string(),
        }
    }

    /// Checks `value` at `path`. Returns the accepted value, or `None` after
    /// pushing at least one issue.
    fn check(
        &self,
        value: &Value,
        path: &mut Vec<Segment>,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<Value> {
        let before = issues.len();
        let accepted = match self {
            CompiledSchema::Any => Some(value.clone()),
            CompiledSchema::Null => expect(value.is_null(), "null", value, path, issues),
            CompiledSchema::Boolean => expect(value.is_boolean(), "boolean", value, path, issues),
            CompiledSchema::Literal(values) => {
                if values.iter().any(|literal| literal_eq(literal, value)) {
                    Some(value.clone())
                } else {
                    push(path, issues, format!("expected {}, got {}", describe_literals(values), value));
                    None
                }
            }
            CompiledSchema::String {
                min_length,
                max_length,
                pattern,
            } => {
                let Some(text) = value.as_str() else {
                    return expect(false, "string", value, path, issues);
                };
                let length = text.chars().count();
                if let Some(min) = min_length {
                    if length < *min {
                        push(path, issues, format!("must be at least {} characters", min));
                    }
                }
                if let Some(max) = max_length {
                    if length > *max {
                        push(path, issues, format!("must be at most {} characters", max));
                    }
                }
                if let Some(re) = pattern {
                    if !re.is_match(text) {
                        push(path, issues, format!("does not match pattern {}", re.as_str()));
                    }
                }
                Some(value.clone())
            }
            CompiledSchema::Number {
                integer,
                minimum,
                maximum,
                exclusive_minimum,
                exclusive_maximum,
            } => {
                let expected = if *integer { "integer" } else { "number" };
                let Some(n) = value.as_f64() else {
                    return expect(false, expected, value, path, issues);
                };
                if *integer && n.fract() != 0.0 {
                    push(path, issues, "expected integer, got fractional number".to_string());
                }
                if let Some(min) = minimum {
                    if n < *min {
                        push(path, issues, format!("must be >= {}", min));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        push(path, issues, format!("must be <= {}", max));
                    }
                }
                if let Some(min) = exclusive_minimum {
                    if n <= *min {
                        push(path, issues, format!("must be > {}", min));
                    }
                }
                if let Some(max) = exclusive_maximum {
                    if n >= *max {
                        push(path, issues, format!("must be < {}", max));
                    }
                }
                Some(coerce_number(value, n, *integer))
            }
            CompiledSchema::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(elements) = value.as_array() else {
                    return expect(false, "array", value, path, issues);
                };
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        push(path, issues, format!("must contain at least {} items", min));
                    }
                }
                if let Some(max) = max_items {
                    if elements.len() > *max {
                        push(path, issues, format!("must contain at most {} items", max));
                    }
                }
                let mut out = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    path.push(Segment::Index(index));
                    if let Some(checked) = items.check(element, path, issues) {
                        out.push(checked);
                    }
                    path.pop();
                }
                Some(Value::Array(out))
            }
            CompiledSchema::Object { fields } => {
                let Some(map) = value.as_object() else {
                    return expect(false, "object", value, path, issues);
                };
                let mut out = map.clone();
                for field in fields {
                    path.push(Segment::Key(field.name.clone()));
                    match map.get(&field.name) {
                        None if field.required => {
                            push(path, issues, "required field is missing".to_string());
                        }
                        None => {}
                        // Optional fields tolerate an explicit null.
                        Some(Value::Null) if !field.required => {}
                        Some(raw) => {
                            if let Some(checked) = field.schema.check(raw, path, issues) {
                                out.insert(field.name.clone(), checked);
                            }
                        }
                    }
                    path.pop();
                }
                Some(Value::Object(out))
            }
            CompiledSchema::Record { values } => {
                let Some(map) = value.as_object() else {
                    return expect(false, "object", value, path, issues);
                };
                let mut out = Map::new();
                for (key, raw) in map {
                    path.push(Segment::Key(key.clone()));
                    if let Some(checked) = values.check(raw, path, issues) {
                        out.insert(key.clone(), checked);
                    }
                    path.pop();
                }
                Some(Value::Object(out))
            }
            CompiledSchema::Union(variants) => {
                for variant in variants {
                    let mut scratch = Vec::new();
                    if let Some(checked) = variant.check(value, path, &mut scratch) {
                        if scratch.is_empty() {
                            return Some(checked);
                        }
                    }
                }
                push(
                    path,
                    issues,
                    format!("expected {}, got {}", self.describe(), json_type_name(value)),
                );
                None
            }
            CompiledSchema::Native(validator) => match validator.validate(value) {
                Ok(checked) => Some(checked),
                Err(err) => {
                    issues.extend(err.issues.into_iter().map(|issue| ValidationIssue {
                        path: join_path(path, &issue.path),
                        message: issue.message,
                    }));
                    None
                }
            },
        };

        if issues.len() > before {
            None
        } else {
            accepted
        }
    }
}

impl Validator for CompiledSchema {
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let mut path = Vec::new();
        let mut issues = Vec::new();
        match self.check(value, &mut path, &mut issues) {
            Some(accepted) if issues.is_empty() => Ok(accepted),
            _ => Err(ValidationError::new(issues)),
        }
    }
}

fn push(path: &[Segment], issues: &mut Vec<ValidationIssue>, message: String) {
    issues.push(ValidationIssue {
        path: render_path(path),
        message,
    });
}

fn expect(
    ok: bool,
    expected: &str,
    value: &Value,
    path: &[Segment],
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    if ok {
        return Some(value.clone());
    }
    push(
        path,
        issues,
        format!("expected {}, got {}", expected, json_type_name(value)),
    );
    None
}

fn describe_literals(values: &[Value]) -> String {
    match values {
        [single] => single.to_string(),
        many => format!(
            "one of {}",
            many.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// JSON equality, except that numbers compare by value (`1 == 1.0`).
fn literal_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => expected == actual,
    }
}

fn coerce_number(value: &Value, n: f64, integer: bool) -> Value {
    if !integer || value.is_i64() || value.is_u64() || n.fract() != 0.0 {
        return value.clone();
    }
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive.
    if n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        value.clone()
    }
}
