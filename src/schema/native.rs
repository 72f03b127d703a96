// src/schema/native.rs

use crate::schema::compiler::{compile_tool_input, CompiledSchema};
use crate::schema::node::SchemaNode;
use crate::schema::validator::{ValidationError, ValidationIssue, Validator, ROOT_PATH};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use ::validator::{Validate, ValidationErrors};

/// Validator backed by a Rust argument struct: serde decides the shape,
/// `validator` derive attributes add the field constraints, and the
/// advertised schema is generated from the same type.
///
/// Fields the struct does not know about are passed through untouched.
pub struct TypedValidator<T> {
    schema: Value,
    shape: CompiledSchema,
    _args: PhantomData<fn() -> T>,
}

impl<T> TypedValidator<T>
where
    T: DeserializeOwned + Serialize + Validate + JsonSchema + 'static,
{
    pub fn new() -> Self {
        let schema = args_schema::<T>();
        let shape = compile_tool_input(&SchemaNode::from_json(&schema)).validator;
        Self {
            schema,
            shape,
            _args: PhantomData,
        }
    }

    pub fn shared() -> Arc<dyn Validator> {
        Arc::new(Self::new())
    }
}

impl<T> Default for TypedValidator<T>
where
    T: DeserializeOwned + Serialize + Validate + JsonSchema + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// JSON schema document for an argument type, without the `$schema` marker.
pub fn args_schema<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object", "properties": {} }));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }
    schema
}

impl<T> fmt::Debug for TypedValidator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedValidator")
            .field("args", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Validator for TypedValidator<T>
where
    T: DeserializeOwned + Serialize + Validate + JsonSchema + 'static,
{
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let typed: T = match serde_json::from_value(value.clone()) {
            Ok(typed) => typed,
            // serde only reports the first problem, without a field path.
            Err(e) => {
                return Err(match self.shape.validate(value) {
                    Err(shape_errors) => shape_errors,
                    Ok(_) => decode_error(&e),
                })
            }
        };
        typed.validate().map_err(|errors| field_errors(&errors))?;

        let mut out = match value {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        match serde_json::to_value(&typed) {
            Ok(Value::Object(fields)) => {
                out.extend(fields);
                Ok(Value::Object(out))
            }
            Ok(other) => Ok(other),
            Err(e) => Err(ValidationError::single(ROOT_PATH, e.to_string())),
        }
    }

    fn json_schema(&self) -> Value {
        self.schema.clone()
    }
}

fn decode_error(err: &serde_json::Error) -> ValidationError {
    let message = err.to_string();
    if let Some(field) = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
    {
        return ValidationError::single(field, "required field is missing");
    }
    ValidationError::single(ROOT_PATH, message)
}

fn field_errors(errors: &ValidationErrors) -> ValidationError {
    let mut issues: Vec<ValidationIssue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| ValidationIssue {
                path: field.to_string(),
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed `{}` check", err.code)),
            })
        })
        .collect();
    issues.sort_by(|a, b| a.path.cmp(&b.path));
    ValidationError::new(issues)
}
