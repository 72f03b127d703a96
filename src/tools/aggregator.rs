// src/tools/aggregator.rs

use crate::registry::ValidatorRegistry;
use crate::schema::compiler::wrap_input_schema;
use crate::tools::{ToolDescriptor, ToolProvider};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("tool `{name}` is declared by both `{first}` and `{second}`")]
    DuplicateTool {
        name: String,
        first: String,
        second: String,
    },
}

/// One entry of the external `tools/list` catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ListedTool {
    pub name: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

struct CatalogEntry {
    descriptor: ToolDescriptor,
    provider: usize,
}

/// Flat catalog over every registered provider.
///
/// Providers live in an arena; `routes` maps a tool name to its catalog slot,
/// and each slot remembers the index of the provider that owns it.
pub struct ToolAggregator {
    providers: Vec<Arc<dyn ToolProvider>>,
    catalog: Vec<CatalogEntry>,
    routes: HashMap<String, usize>,
    registry: ValidatorRegistry,
}

#[derive(Default)]
pub struct AggregatorBuilder {
    providers: Vec<Arc<dyn ToolProvider>>,
    strict_names: bool,
}

impl AggregatorBuilder {
    /// Providers are consulted in registration order; on a name collision the
    /// later one wins.
    pub fn provider(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Reject duplicate tool names instead of letting the later provider win.
    pub fn strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    pub fn build(self) -> Result<ToolAggregator, AggregateError> {
        let providers = self.providers;
        let mut catalog: Vec<CatalogEntry> = Vec::new();
        let mut routes: HashMap<String, usize> = HashMap::new();

        for (index, provider) in providers.iter().enumerate() {
            let tools = provider.list_tools();
            info!(
                provider = provider.provider_name(),
                tools = tools.len(),
                "Registering tool provider"
            );
            for descriptor in tools {
                match routes.get(&descriptor.name) {
                    Some(&slot) => {
                        let first = providers[catalog[slot].provider].provider_name().to_string();
                        let second = provider.provider_name().to_string();
                        if self.strict_names {
                            return Err(AggregateError::DuplicateTool {
                                name: descriptor.name,
                                first,
                                second,
                            });
                        }
                        warn!(
                            tool = %descriptor.name,
                            replaced = %first,
                            by = %second,
                            "Duplicate tool name, later provider wins"
                        );
                        catalog[slot] = CatalogEntry {
                            descriptor,
                            provider: index,
                        };
                    }
                    None => {
                        routes.insert(descriptor.name.clone(), catalog.len());
                        catalog.push(CatalogEntry {
                            descriptor,
                            provider: index,
                        });
                    }
                }
            }
        }

        let descriptors: Vec<ToolDescriptor> =
            catalog.iter().map(|entry| entry.descriptor.clone()).collect();
        let registry = ValidatorRegistry::build(&descriptors);
        info!(tools = catalog.len(), providers = providers.len(), "Tool catalog ready");

        Ok(ToolAggregator {
            providers,
            catalog,
            routes,
            registry,
        })
    }
}

impl ToolAggregator {
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Owning provider and descriptor for `name`.
    pub fn route(&self, name: &str) -> Option<(&Arc<dyn ToolProvider>, &ToolDescriptor)> {
        let entry = &self.catalog[*self.routes.get(name)?];
        Some((&self.providers[entry.provider], &entry.descriptor))
    }

    /// Catalog in registration order, with schemas as callers should see them.
    pub fn list_tools(&self) -> Vec<ListedTool> {
        self.catalog
            .iter()
            .map(|entry| {
                let descriptor = &entry.descriptor;
                let advertised = descriptor.schema.advertised();
                let input_schema = if self.registry.is_wrapped(&descriptor.name) {
                    wrap_input_schema(&advertised)
                } else if advertised.is_object() {
                    advertised
                } else {
                    json!({ "type": "object" })
                };
                ListedTool {
                    name: descriptor.name.clone(),
                    title: descriptor.title.clone(),
                    description: descriptor.description.clone(),
                    input_schema,
                }
            })
            .collect()
    }
}
