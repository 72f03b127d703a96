//! # Schema Module
//!
//! Everything needed to check tool arguments before a handler runs.
//!
//! Providers describe their inputs either with a JSON-Schema-like document
//! or with a validator they built themselves. Documents are read into a
//! [`SchemaNode`] and compiled into a [`CompiledSchema`]; both forms are used
//! through the same [`Validator`] trait.

pub mod compiler;
pub mod native;
pub mod node;
pub mod validator;

pub use compiler::{compile, compile_tool_input, CompiledSchema, ToolInput, WRAPPED_INPUT_FIELD};
pub use native::TypedValidator;
pub use node::SchemaNode;
pub use validator::{ValidationError, ValidationIssue, Validator};
