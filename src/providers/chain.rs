// src/providers/chain.rs

use crate::config::{Config, SEI_DEVNET_CHAIN_ID, SEI_MAINNET_CHAIN_ID, SEI_TESTNET_CHAIN_ID};
use crate::providers::http::{hex_quantity, json_rpc, redact_url};
use crate::tools::{ToolDescriptor, ToolError, ToolProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

// Normalize common chain_id aliases users might pass via MCP
pub fn normalize_chain_id(input: &str) -> String {
    let mut s = input.trim().to_lowercase();
    s = s.replace([' ', '_'], "-");
    while s.contains("--") {
        s = s.replace("--", "-");
    }

    match s.as_str() {
        "mainnet" | "main" | "sei" | "pacific-1" | "sei-mainnet" => SEI_MAINNET_CHAIN_ID.to_string(),
        "testnet" | "test" | "atlantic-2" | "sei-testnet" => SEI_TESTNET_CHAIN_ID.to_string(),
        "devnet" | "dev" | "arctic-1" | "sei-devnet" => SEI_DEVNET_CHAIN_ID.to_string(),
        _ => s,
    }
}

fn chain_id_property() -> Value {
    json!({
        "type": "string",
        "description": "Chain id or alias (mainnet, testnet, devnet). Defaults to the server's default chain."
    })
}

fn block_property() -> Value {
    json!({
        "description": "Block number or tag. Defaults to latest.",
        "anyOf": [
            { "type": "string", "enum": ["latest", "earliest", "pending", "safe", "finalized"] },
            { "type": "integer", "minimum": 0 }
        ]
    })
}

/// Read-only EVM queries over JSON-RPC.
pub struct ChainProvider {
    client: Client,
    rpc_urls: HashMap<String, String>,
    default_chain_id: String,
}

impl ChainProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            rpc_urls: config.chain_rpc_urls.clone(),
            default_chain_id: config.default_chain_id.clone(),
        }
    }

    fn rpc_url(&self, args: &Value) -> Result<(String, &str), ToolError> {
        let chain_id = args
            .get("chain_id")
            .and_then(Value::as_str)
            .map(normalize_chain_id)
            .unwrap_or_else(|| self.default_chain_id.clone());
        match self.rpc_urls.get(&chain_id) {
            Some(url) => Ok((chain_id, url.as_str())),
            None => {
                let mut keys: Vec<&str> = self.rpc_urls.keys().map(String::as_str).collect();
                keys.sort_unstable();
                Err(ToolError::InvalidArguments(format!(
                    "RPC URL not configured for chain_id '{}'. Available: {}",
                    chain_id,
                    keys.join(", ")
                )))
            }
        }
    }

    async fn get_chain_info(&self, args: &Value) -> Result<Value, ToolError> {
        let (chain_id, url) = self.rpc_url(args)?;
        let rpc_chain_id = json_rpc(&self.client, url, "eth_chainId", json!([])).await?;
        let block_number = json_rpc(&self.client, url, "eth_blockNumber", json!([])).await?;
        let gas_price = json_rpc(&self.client, url, "eth_gasPrice", json!([])).await?;
        Ok(json!({
            "chain_id": chain_id,
            "rpc_chain_id": hex_quantity(&rpc_chain_id),
            "latest_block": hex_quantity(&block_number),
            "gas_price_wei": hex_quantity(&gas_price),
        }))
    }

    async fn get_balance(&self, args: &Value) -> Result<Value, ToolError> {
        let (chain_id, url) = self.rpc_url(args)?;
        let address = required_str(args, "address")?;
        let block = block_param(args.get("block"));
        let raw = json_rpc(&self.client, url, "eth_getBalance", json!([address, block])).await?;
        let amount = hex_quantity(&raw).ok_or_else(|| ToolError::Upstream {
            url: redact_url(url),
            status: None,
            message: format!("unexpected balance value: {}", raw),
        })?;
        Ok(json!({
            "address": address,
            "chain_id": chain_id,
            "block": block,
            "amount": amount,
            // For EVM chains, the native balance is returned in wei
            "denom": "wei",
        }))
    }

    async fn get_block(&self, args: &Value) -> Result<Value, ToolError> {
        let (chain_id, url) = self.rpc_url(args)?;
        let block = block_param(args.get("block"));
        let full = args
            .get("include_transactions")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let found = json_rpc(&self.client, url, "eth_getBlockByNumber", json!([block, full])).await?;
        Ok(json!({
            "chain_id": chain_id,
            "found": !found.is_null(),
            "block": found,
        }))
    }

    async fn get_transaction(&self, args: &Value) -> Result<Value, ToolError> {
        let (chain_id, url) = self.rpc_url(args)?;
        let hash = required_str(args, "hash")?;
        let tx = json_rpc(&self.client, url, "eth_getTransactionByHash", json!([hash])).await?;
        let receipt = if tx.is_null() {
            Value::Null
        } else {
            json_rpc(&self.client, url, "eth_getTransactionReceipt", json!([hash])).await?
        };
        Ok(json!({
            "chain_id": chain_id,
            "found": !tx.is_null(),
            "transaction": tx,
            "receipt": receipt,
        }))
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing or invalid required argument: '{}'", key)))
}

fn block_param(block: Option<&Value>) -> String {
    match block {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(n) => format!("0x{:x}", n),
            None => "latest".to_string(),
        },
        Some(Value::String(tag)) => tag.clone(),
        _ => "latest".to_string(),
    }
}

#[async_trait]
impl ToolProvider for ChainProvider {
    fn provider_name(&self) -> &str {
        "chain"
    }

    fn list_tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::document(
                "get_chain_info",
                "Get Chain Info",
                "Chain id, latest block number and gas price for a Sei EVM network.",
                json!({
                    "type": "object",
                    "properties": { "chain_id": chain_id_property() }
                }),
            ),
            ToolDescriptor::document(
                "get_balance",
                "Get Balance",
                "Native balance (in wei) of an EVM address.",
                json!({
                    "type": "object",
                    "properties": {
                        "address": {
                            "type": "string",
                            "pattern": "^0x[0-9a-fA-F]{40}$",
                            "description": "0x-prefixed EVM address"
                        },
                        "chain_id": chain_id_property(),
                        "block": block_property()
                    },
                    "required": ["address"]
                }),
            ),
            ToolDescriptor::document(
                "get_block",
                "Get Block",
                "Fetch a block by number or tag.",
                json!({
                    "type": "object",
                    "properties": {
                        "block": block_property(),
                        "include_transactions": {
                            "type": "boolean",
                            "description": "Return full transaction objects instead of hashes."
                        },
                        "chain_id": chain_id_property()
                    }
                }),
            ),
            ToolDescriptor::document(
                "get_transaction",
                "Get Transaction",
                "Fetch a transaction and its receipt by hash.",
                json!({
                    "type": "object",
                    "properties": {
                        "hash": { "type": "string", "pattern": "^0x[0-9a-fA-F]{64}$" },
                        "chain_id": chain_id_property()
                    },
                    "required": ["hash"]
                }),
            ),
        ]
    }

    async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        debug!(tool = name, "Chain provider invoked");
        match name {
            "get_chain_info" => self.get_chain_info(&args).await,
            "get_balance" => self.get_balance(&args).await,
            "get_block" => self.get_block(&args).await,
            "get_transaction" => self.get_transaction(&args).await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_chain_aliases() {
        assert_eq!(normalize_chain_id("Mainnet"), SEI_MAINNET_CHAIN_ID);
        assert_eq!(normalize_chain_id("pacific_1"), SEI_MAINNET_CHAIN_ID);
        assert_eq!(normalize_chain_id(" atlantic--2 "), SEI_TESTNET_CHAIN_ID);
        assert_eq!(normalize_chain_id("arctic 1"), SEI_DEVNET_CHAIN_ID);
        assert_eq!(normalize_chain_id("1329"), "1329");
    }

    #[test]
    fn block_params() {
        assert_eq!(block_param(None), "latest");
        assert_eq!(block_param(Some(&json!(255))), "0xff");
        assert_eq!(block_param(Some(&json!("finalized"))), "finalized");
    }

    #[test]
    fn unknown_chain_lists_available_ids() {
        let provider = ChainProvider::new(Client::new(), &Config::default());
        let err = provider.rpc_url(&json!({ "chain_id": "42" })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid arguments: RPC URL not configured for chain_id '42'. Available: 1328, 1329"
        );
    }
}
