// src/lib.rs

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub mod api;
pub mod config;
pub mod mcp;
pub mod providers;
pub mod registry;
pub mod schema;
pub mod tools;

use providers::{http::build_client, ChainProvider, DocsProvider, WalletProvider};
use tools::{Dispatcher, ToolAggregator};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// Aggregated tool catalog and call entry point
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Registers every provider and compiles the tool catalog.
    pub fn from_config(config: config::Config) -> Result<Self> {
        let client = build_client(config.request_timeout)?;

        // Registration order matters: on a duplicate name the later provider wins.
        let aggregator = ToolAggregator::builder()
            .strict_names(config.strict_tool_names)
            .provider(Arc::new(WalletProvider::new()))
            .provider(Arc::new(ChainProvider::new(client.clone(), &config)))
            .provider(Arc::new(DocsProvider::new(client, &config)))
            .build()
            .context("Failed to build tool catalog")?;
        info!(tools = aggregator.len(), "Tool catalog compiled");

        Ok(Self::with_dispatcher(config, Dispatcher::new(aggregator)))
    }

    pub fn with_dispatcher(config: config::Config, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }
}
