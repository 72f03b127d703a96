//! # Tools Module
//!
//! Provider contract, the aggregated catalog, and the call dispatcher.

pub mod aggregator;
pub mod dispatcher;

use crate::schema::Validator;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

pub use aggregator::{AggregateError, AggregatorBuilder, ListedTool, ToolAggregator};
pub use dispatcher::Dispatcher;

/// How a tool describes its input.
#[derive(Debug, Clone)]
pub enum ToolSchema {
    /// Schema document, compiled once at startup.
    Document(Value),
    /// Validator the provider built itself; used as-is.
    Native(Arc<dyn Validator>),
}

impl ToolSchema {
    /// The document shown to callers.
    pub fn advertised(&self) -> Value {
        match self {
            ToolSchema::Document(doc) => doc.clone(),
            ToolSchema::Native(validator) => validator.json_schema(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub schema: ToolSchema,
}

impl ToolDescriptor {
    pub fn document(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: description.into(),
            schema: ToolSchema::Document(schema),
        }
    }

    pub fn native(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: description.into(),
            schema: ToolSchema::Native(validator),
        }
    }
}

/// Failures raised by provider handlers.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("request to {url} failed: {message}")]
    Upstream {
        url: String,
        status: Option<u16>,
        message: String,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{0} is not configured on the server")]
    MissingConfig(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("tool not handled by this provider: {0}")]
    UnknownTool(String),
}

impl ToolError {
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::Upstream { .. } => "upstream_error",
            ToolError::Timeout { .. } => "timeout",
            ToolError::MissingConfig(_) => "missing_configuration",
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::UnknownTool(_) => "unknown_tool",
        }
    }

    /// `{"error", "reason", ...context}` payload reported to the caller.
    pub fn payload(&self) -> Value {
        let mut payload = json!({
            "error": self.code(),
            "reason": self.to_string(),
        });
        match self {
            ToolError::Upstream {
                url,
                status,
                message,
            } => {
                payload["url"] = json!(url);
                payload["upstream_message"] = json!(message);
                if let Some(status) = status {
                    payload["status"] = json!(status);
                }
            }
            ToolError::Timeout { url } => payload["url"] = json!(url),
            ToolError::MissingConfig(setting) => payload["setting"] = json!(setting),
            _ => {}
        }
        payload
    }
}

/// A source of tools plus the one function that runs them.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Short name used in logs and collision warnings.
    fn provider_name(&self) -> &str;

    /// Tools this provider offers. Read once at startup.
    fn list_tools(&self) -> Vec<ToolDescriptor>;

    /// Runs `name` with arguments that already passed validation.
    async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError>;
}
