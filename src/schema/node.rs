// src/schema/node.rs

use crate::schema::validator::Validator;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Shape of a value a tool expects, read from a provider's schema document.
#[derive(Debug, Clone)]
pub enum SchemaNode {
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<String>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
        exclusive_minimum: Option<f64>,
        exclusive_maximum: Option<f64>,
    },
    Boolean,
    Null,
    Array {
        items: Option<Box<SchemaNode>>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        /// Declared fields, in document order.
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
        additional: Additional,
    },
    Enum(Vec<Value>),
    Const(Value),
    Union(Vec<SchemaNode>),
    /// Accepts anything.
    Unknown,
    /// A validator the provider built itself.
    Native(Arc<dyn Validator>),
}

/// What the document says about fields it does not declare.
#[derive(Debug, Clone, Default)]
pub enum Additional {
    #[default]
    Unspecified,
    Allowed,
    Forbidden,
    Schema(Box<SchemaNode>),
}

impl SchemaNode {
    /// Reads a schema document. Never fails: fragments that cannot be
    /// interpreted become [`SchemaNode::Unknown`].
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return SchemaNode::Unknown;
        };

        if let Some(values) = obj.get("enum").and_then(Value::as_array) {
            if !values.is_empty() {
                return SchemaNode::Enum(values.clone());
            }
        }
        if let Some(literal) = obj.get("const") {
            return SchemaNode::Const(literal.clone());
        }

        match obj.get("type") {
            Some(Value::String(kind)) => Self::from_kind(kind, obj),
            Some(Value::Array(kinds)) => {
                let mut variants: Vec<SchemaNode> = kinds
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|kind| Self::from_kind(kind, obj))
                    .collect();
                match variants.len() {
                    0 => Self::from_untyped(obj),
                    1 => variants.pop().unwrap_or(SchemaNode::Unknown),
                    _ => SchemaNode::Union(variants),
                }
            }
            _ => Self::from_untyped(obj),
        }
    }

    pub fn native(validator: Arc<dyn Validator>) -> Self {
        SchemaNode::Native(validator)
    }

    fn from_kind(kind: &str, obj: &Map<String, Value>) -> Self {
        match kind {
            "string" => SchemaNode::String {
                min_length: usize_field(obj, "minLength"),
                max_length: usize_field(obj, "maxLength"),
                pattern: obj
                    .get("pattern")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            "number" | "integer" => {
                let mut minimum = f64_field(obj, "minimum");
                let mut maximum = f64_field(obj, "maximum");
                let mut exclusive_minimum = f64_field(obj, "exclusiveMinimum");
                let mut exclusive_maximum = f64_field(obj, "exclusiveMaximum");
                // Older documents flag the plain bound as exclusive with a boolean.
                if obj.get("exclusiveMinimum") == Some(&Value::Bool(true)) {
                    exclusive_minimum = minimum.take();
                }
                if obj.get("exclusiveMaximum") == Some(&Value::Bool(true)) {
                    exclusive_maximum = maximum.take();
                }
                SchemaNode::Number {
                    integer: kind == "integer",
                    minimum,
                    maximum,
                    exclusive_minimum,
                    exclusive_maximum,
                }
            }
            "boolean" => SchemaNode::Boolean,
            "null" => SchemaNode::Null,
            "array" => SchemaNode::Array {
                items: obj
                    .get("items")
                    .filter(|items| items.is_object())
                    .map(|items| Box::new(Self::from_json(items))),
                min_items: usize_field(obj, "minItems"),
                max_items: usize_field(obj, "maxItems"),
            },
            "object" => Self::object_from(obj),
            _ => Self::from_untyped(obj),
        }
    }

    fn from_untyped(obj: &Map<String, Value>) -> Self {
        if obj.get("properties").map_or(false, Value::is_object) {
            return Self::object_from(obj);
        }
        for key in ["anyOf", "oneOf"] {
            if let Some(variants) = obj.get(key).and_then(Value::as_array) {
                if !variants.is_empty() {
                    return SchemaNode::Union(variants.iter().map(Self::from_json).collect());
                }
            }
        }
        SchemaNode::Unknown
    }

    fn object_from(obj: &Map<String, Value>) -> Self {
        let properties = obj
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, schema)| (name.clone(), Self::from_json(schema)))
                    .collect()
            })
            .unwrap_or_default();
        let required = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let additional = match obj.get("additionalProperties") {
            Some(Value::Bool(true)) => Additional::Allowed,
            Some(Value::Bool(false)) => Additional::Forbidden,
            Some(schema @ Value::Object(_)) => Additional::Schema(Box::new(Self::from_json(schema))),
            _ => Additional::Unspecified,
        };
        SchemaNode::Object {
            properties,
            required,
            additional,
        }
    }
}

fn usize_field(obj: &Map<String, Value>, key: &str) -> Option<usize> {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn f64_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}
