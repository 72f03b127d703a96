//! # Providers Module
//!
//! Tool providers wired into the aggregated catalog.
//!
//! - `wallet` - offline key helpers, arguments checked by typed validators
//! - `chain` - EVM JSON-RPC queries against the configured Sei endpoints
//! - `docs` - Sei documentation search

pub mod chain;
pub mod docs;
pub mod http;
pub mod wallet;

pub use chain::ChainProvider;
pub use docs::DocsProvider;
pub use wallet::WalletProvider;
