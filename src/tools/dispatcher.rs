// src/tools/dispatcher.rs

use crate::mcp::protocol::ToolCallResult;
use crate::tools::{ListedTool, ToolAggregator};
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Entry point for tool calls: validate, route, run, and wrap the outcome.
///
/// Whatever happens inside a handler, `handle` returns an envelope.
pub struct Dispatcher {
    aggregator: ToolAggregator,
}

impl Dispatcher {
    pub fn new(aggregator: ToolAggregator) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &ToolAggregator {
        &self.aggregator
    }

    pub fn list_tools(&self) -> Vec<ListedTool> {
        self.aggregator.list_tools()
    }

    pub async fn handle(&self, name: &str, raw_args: Option<Value>) -> ToolCallResult {
        let Some((provider, _)) = self.aggregator.route(name) else {
            warn!(tool = name, "Call for unknown tool");
            return ToolCallResult::error(json!({
                "error": "unknown_tool",
                "reason": format!("Tool not found: {}", name),
                "tool": name,
            }));
        };

        let args = match self.aggregator.registry().resolve(name, raw_args) {
            Ok(args) => args,
            Err(err) => {
                debug!(tool = name, error = %err, "Rejected tool arguments");
                return ToolCallResult::error(json!({
                    "error": "invalid_arguments",
                    "reason": err.to_string(),
                    "tool": name,
                    "issues": err.issues,
                }));
            }
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(provider.invoke(name, args))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(value)) => {
                info!(tool = name, provider = provider.provider_name(), elapsed_ms, "Tool call succeeded");
                ToolCallResult::success(value)
            }
            Ok(Err(err)) => {
                warn!(tool = name, provider = provider.provider_name(), elapsed_ms, error = %err, "Tool call failed");
                let mut payload = err.payload();
                payload["tool"] = json!(name);
                ToolCallResult::error(payload)
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(tool = name, provider = provider.provider_name(), reason = %reason, "Tool handler panicked");
                ToolCallResult::error(json!({
                    "error": "handler_panicked",
                    "reason": reason,
                    "tool": name,
                }))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::aggregator::tests::{tool, StaticProvider};
    use crate::tools::{ToolDescriptor, ToolError, ToolProvider};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct FlakyProvider;

    #[async_trait]
    impl ToolProvider for FlakyProvider {
        fn provider_name(&self) -> &str {
            "flaky"
        }

        fn list_tools(&self) -> Vec<ToolDescriptor> {
            vec![
                tool("slow", json!({ "type": "object" })),
                tool("explode", json!({ "type": "object" })),
            ]
        }

        async fn invoke(&self, name: &str, _args: Value) -> Result<Value, ToolError> {
            match name {
                "slow" => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Err(ToolError::Timeout {
                        url: "https://evm-rpc.sei-apis.com/".into(),
                    })
                }
                "explode" => panic!("rpc client poisoned"),
                other => Err(ToolError::UnknownTool(other.to_string())),
            }
        }
    }

    fn dispatcher() -> Dispatcher {
        let aggregator = ToolAggregator::builder()
            .provider(Arc::new(StaticProvider {
                name: "chain",
                tools: vec![tool(
                    "get_balance",
                    json!({
                        "type": "object",
                        "properties": {
                            "address": { "type": "string", "pattern": "^0x[0-9a-fA-F]{40}$" },
                            "quantity": { "type": "number" }
                        },
                        "required": ["address"]
                    }),
                )],
            }))
            .provider(Arc::new(FlakyProvider))
            .build()
            .unwrap();
        Dispatcher::new(aggregator)
    }

    #[tokio::test]
    async fn unknown_tool_is_a_payload() {
        let result = dispatcher().handle("doesNotExist", None).await;
        assert!(result.is_error);
        let payload = result.payload().unwrap();
        assert_eq!(payload["error"], "unknown_tool");
        assert_eq!(payload["tool"], "doesNotExist");
    }

    #[tokio::test]
    async fn validation_failure_stops_before_the_handler() {
        let result = dispatcher()
            .handle(
                "get_balance",
                Some(json!({ "address": "0xabc", "quantity": "ten" })),
            )
            .await;
        assert!(result.is_error);
        let payload = result.payload().unwrap();
        assert_eq!(payload["error"], "invalid_arguments");
        let reason = payload["reason"].as_str().unwrap();
        assert!(reason.contains("address: does not match pattern"));
        assert!(reason.contains("quantity: expected number, got string"));
        assert_eq!(payload["issues"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn valid_call_reaches_the_owner_with_passthrough() {
        let args = json!({ "address": "0x000000000000000000000000000000000000dEaD", "foo": "bar" });
        let result = dispatcher().handle("get_balance", Some(args.clone())).await;
        assert!(!result.is_error);
        let payload = result.payload().unwrap();
        assert_eq!(payload["provider"], "chain");
        assert_eq!(payload["args"], args);
    }

    #[tokio::test]
    async fn handler_errors_become_payloads() {
        let result = dispatcher().handle("slow", Some(json!({}))).await;
        assert!(result.is_error);
        let payload = result.payload().unwrap();
        assert_eq!(payload["error"], "timeout");
        assert_eq!(payload["url"], "https://evm-rpc.sei-apis.com/");
        assert_eq!(payload["tool"], "slow");
    }

    #[tokio::test]
    async fn handler_panics_are_contained() {
        let dispatcher = dispatcher();
        let result = dispatcher.handle("explode", None).await;
        assert!(result.is_error);
        let payload = result.payload().unwrap();
        assert_eq!(payload["error"], "handler_panicked");
        assert_eq!(payload["reason"], "rpc client poisoned");

        // The dispatcher keeps serving after a panic.
        let after = dispatcher.handle("slow", None).await;
        assert_eq!(after.payload().unwrap()["error"], "timeout");
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_interfere() {
        let dispatcher = Arc::new(dispatcher());
        let calls = (0..8).map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                if i % 2 == 0 {
                    dispatcher.handle("explode", None).await
                } else {
                    dispatcher
                        .handle(
                            "get_balance",
                            Some(json!({ "address": "0x000000000000000000000000000000000000dEaD" })),
                        )
                        .await
                }
            }
        });
        let results = futures::future::join_all(calls).await;
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.is_error, i % 2 == 0);
        }
    }
}
