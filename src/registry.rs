// src/registry.rs

use crate::schema::{compile_tool_input, CompiledSchema, SchemaNode, ValidationError, Validator};
use crate::tools::{ToolDescriptor, ToolSchema};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tool name -> argument validator. Built once, read-only afterwards.
#[derive(Debug, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
    wrapped: HashSet<String>,
}

impl ValidatorRegistry {
    /// Compiles every descriptor's schema. A tool whose compilation blows up
    /// gets an accept-all validator; the others are unaffected.
    pub fn build(descriptors: &[ToolDescriptor]) -> Self {
        let mut registry = Self::default();
        for descriptor in descriptors {
            let compiled = panic::catch_unwind(AssertUnwindSafe(|| {
                let node = match &descriptor.schema {
                    ToolSchema::Native(validator) => SchemaNode::native(Arc::clone(validator)),
                    ToolSchema::Document(doc) => SchemaNode::from_json(doc),
                };
                compile_tool_input(&node)
            }));
            let validator: Arc<dyn Validator> = match compiled {
                Ok(input) => {
                    if input.wrapped {
                        registry.wrapped.insert(descriptor.name.clone());
                    }
                    Arc::new(input.validator)
                }
                Err(_) => {
                    warn!(tool = %descriptor.name, "Schema compilation failed, accepting any input");
                    Arc::new(CompiledSchema::Any)
                }
            };
            registry.validators.insert(descriptor.name.clone(), validator);
        }
        debug!(tools = registry.validators.len(), "Validator registry built");
        registry
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Validator>> {
        self.validators.get(name)
    }

    /// True when the tool's root schema was wrapped under a single `input` argument.
    pub fn is_wrapped(&self, name: &str) -> bool {
        self.wrapped.contains(name)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validates raw arguments for `name`.
    ///
    /// A tool with no validator takes no arguments, so the result is `{}`.
    /// Missing or `null` arguments are treated as `{}`.
    pub fn resolve(&self, name: &str, raw_args: Option<Value>) -> Result<Value, ValidationError> {
        let Some(validator) = self.validators.get(name) else {
            return Ok(Value::Object(Map::new()));
        };
        let raw_args = match raw_args {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(args) => args,
        };
        validator.validate(&raw_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationIssue;
    use serde_json::json;

    #[derive(Debug)]
    struct Exploding;

    impl Validator for Exploding {
        fn validate(&self, _value: &Value) -> Result<Value, ValidationError> {
            Err(ValidationError::new(vec![ValidationIssue {
                path: "<root>".into(),
                message: "never valid".into(),
            }]))
        }
    }

    fn registry() -> ValidatorRegistry {
        ValidatorRegistry::build(&[
            ToolDescriptor::document(
                "get_balance",
                "Get Balance",
                "Native balance of an address",
                json!({
                    "type": "object",
                    "properties": {
                        "address": { "type": "string", "pattern": "^0x[0-9a-fA-F]{40}$" }
                    },
                    "required": ["address"]
                }),
            ),
            ToolDescriptor::document("get_docs_url", "Docs URL", "Docs root", Value::Null),
            ToolDescriptor::document("echo", "Echo", "Echo a string", json!({ "type": "string" })),
            ToolDescriptor::native("never", "Never", "Rejects everything", Arc::new(Exploding)),
        ])
    }

    #[test]
    fn resolves_valid_input_with_passthrough() {
        let args = json!({
            "address": "0x000000000000000000000000000000000000dEaD",
            "foo": "bar"
        });
        let resolved = registry().resolve("get_balance", Some(args.clone())).unwrap();
        assert_eq!(resolved, args);
    }

    #[test]
    fn rejects_bad_address() {
        let err = registry()
            .resolve("get_balance", Some(json!({ "address": "0xabc" })))
            .unwrap_err();
        assert!(err.to_string().contains("address"));
    }

    #[test]
    fn missing_arguments_fail_required_fields() {
        let err = registry().resolve("get_balance", None).unwrap_err();
        assert_eq!(err.to_string(), "address: required field is missing");
    }

    #[test]
    fn unknown_tool_resolves_to_empty_object() {
        let resolved = registry()
            .resolve("not_registered", Some(json!({ "x": 1 })))
            .unwrap();
        assert_eq!(resolved, json!({}));
    }

    #[test]
    fn schemaless_tool_accepts_nothing_or_anything() {
        let registry = registry();
        assert_eq!(registry.resolve("get_docs_url", None).unwrap(), json!({}));
        assert_eq!(
            registry.resolve("get_docs_url", Some(Value::Null)).unwrap(),
            json!({})
        );
        assert!(registry.resolve("get_docs_url", Some(json!([1, 2]))).is_err());
    }

    #[test]
    fn native_validators_are_used_as_is() {
        let registry = registry();
        let err = registry.resolve("never", Some(json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "<root>: never valid");
        assert!(!registry.is_wrapped("never"));
    }

    #[test]
    fn non_object_roots_are_marked_wrapped() {
        let registry = registry();
        assert!(registry.is_wrapped("echo"));
        assert!(!registry.is_wrapped("get_balance"));
        assert_eq!(
            registry.resolve("echo", Some(json!({ "input": "gm" }))).unwrap(),
            json!({ "input": "gm" })
        );
        assert_eq!(registry.len(), 4);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("not_registered").is_none());
    }
}
