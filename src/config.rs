// src/config.rs

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

pub const SEI_MAINNET_CHAIN_ID: &str = "1329";
pub const SEI_TESTNET_CHAIN_ID: &str = "1328";
pub const SEI_DEVNET_CHAIN_ID: &str = "713715";

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// EVM JSON-RPC endpoints keyed by decimal chain id.
    /// Defaults cover Sei mainnet (1329) and testnet (1328).
    pub chain_rpc_urls: HashMap<String, String>,
    pub default_chain_id: String,

    // Documentation
    pub docs_base_url: String,
    pub docs_search_url: Option<String>,

    /// Upper bound for every outbound HTTP request made by a tool.
    pub request_timeout: Duration,

    /// Refuse to start when two providers declare the same tool name.
    pub strict_tool_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            chain_rpc_urls: default_rpc_urls(),
            default_chain_id: SEI_MAINNET_CHAIN_ID.to_string(),
            docs_base_url: "https://docs.sei.io/".to_string(),
            docs_search_url: None,
            request_timeout: Duration::from_secs(15),
            strict_tool_names: false,
        }
    }
}

fn default_rpc_urls() -> HashMap<String, String> {
    HashMap::from([
        (
            SEI_MAINNET_CHAIN_ID.to_string(),
            "https://evm-rpc.sei-apis.com".to_string(),
        ),
        (
            SEI_TESTNET_CHAIN_ID.to_string(),
            "https://evm-rpc-testnet.sei-apis.com".to_string(),
        ),
    ])
}

impl Config {
    /// Returns a list of configured chain IDs
    pub fn supported_chains(&self) -> Vec<String> {
        let mut chains: Vec<String> = self.chain_rpc_urls.keys().cloned().collect();
        chains.sort();
        chains
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let chain_rpc_urls = match env::var("CHAIN_RPC_URLS") {
            Ok(raw) => serde_json::from_str::<HashMap<String, String>>(&raw)
                .context("CHAIN_RPC_URLS must be a JSON map of chain_id -> RPC URL")?,
            Err(_) => defaults.chain_rpc_urls,
        };

        let request_timeout_secs: u64 = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a valid number")?;

        let strict_tool_names = match env::var("STRICT_TOOL_NAMES") {
            Ok(raw) => parse_flag(&raw).context("STRICT_TOOL_NAMES must be true or false")?,
            Err(_) => false,
        };

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            chain_rpc_urls,
            default_chain_id: env::var("DEFAULT_CHAIN_ID")
                .unwrap_or(defaults.default_chain_id),
            docs_base_url: env::var("DOCS_BASE_URL").unwrap_or(defaults.docs_base_url),
            docs_search_url: env::var("DOCS_SEARCH_URL").ok(),
            request_timeout: Duration::from_secs(request_timeout_secs),
            strict_tool_names,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_sei() {
        let config = Config::default();
        assert_eq!(config.default_chain_id, SEI_MAINNET_CHAIN_ID);
        assert_eq!(
            config.supported_chains(),
            vec![SEI_TESTNET_CHAIN_ID.to_string(), SEI_MAINNET_CHAIN_ID.to_string()]
        );
        assert!(!config.strict_tool_names);
    }

    #[test]
    fn parses_flags() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
