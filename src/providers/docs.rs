// src/providers/docs.rs

use crate::config::Config;
use crate::providers::http::{read_json, request_error};
use crate::tools::{ToolDescriptor, ToolError, ToolProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_LIMIT: u64 = 5;

/// Sei documentation lookups.
pub struct DocsProvider {
    client: Client,
    base_url: String,
    search_url: Option<String>,
}

impl DocsProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.docs_base_url.clone(),
            search_url: config.docs_search_url.clone(),
        }
    }

    async fn search(&self, args: &Value) -> Result<Value, ToolError> {
        let search_url = self
            .search_url
            .as_deref()
            .ok_or_else(|| ToolError::MissingConfig("DOCS_SEARCH_URL".to_string()))?;
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query'".to_string()))?;
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_LIMIT);

        let res = self
            .client
            .get(search_url)
            .query(&[("query", query.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| request_error(search_url, e))?;
        let results = read_json(search_url, res).await?;
        Ok(json!({
            "query": query,
            "limit": limit,
            "results": results,
        }))
    }
}

#[async_trait]
impl ToolProvider for DocsProvider {
    fn provider_name(&self) -> &str {
        "docs"
    }

    fn list_tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::document(
                "search_docs",
                "Search Sei Docs",
                "Search the Sei documentation and return the best matching pages.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "minLength": 1 },
                        "limit": { "type": "integer", "minimum": 1, "maximum": 20 }
                    },
                    "required": ["query"]
                }),
            ),
            // Takes no input and declares no schema.
            ToolDescriptor::document(
                "get_docs_url",
                "Sei Docs URL",
                "Returns the official Sei documentation URL.",
                Value::Null,
            ),
        ]
    }

    async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "search_docs" => self.search(&args).await,
            "get_docs_url" => Ok(Value::String(self.base_url.clone())),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
