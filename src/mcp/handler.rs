//! # MCP Handler Module
//!
//! This module implements the Model Context Protocol (MCP) surface of the
//! server. It answers the JSON-RPC methods and hands every tool call to the
//! [`Dispatcher`](crate::tools::Dispatcher).
//!
//! ## Supported Methods
//! - `initialize` - server info and capabilities
//! - `ping` - liveness check
//! - `tools/list` - the aggregated tool catalog
//! - `tools/call` - validate and run one tool
//! - `<tool name>` - shorthand for `tools/call` with `params` as the arguments
//!
//! Tool failures come back as tool output (`isError: true`); only malformed
//! requests produce JSON-RPC errors.

use crate::{
    mcp::protocol::{error_codes, Request, Response},
    AppState,
};
use serde_json::{json, Value};
use tracing::{error, info};

pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "ping" => Response::success(req.id, json!({})),
        "tools/list" => handle_tools_list(&req, &state),
        "tools/call" => handle_tool_call(req, &state).await,
        // Direct method calls by tool name are rewritten into tools/call
        method if state.dispatcher.aggregator().contains(method) => {
            let name = req.method.clone();
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": name,
                    "arguments": req.params.clone().unwrap_or_else(|| json!({}))
                })),
            };
            handle_tool_call(wrapped, &state).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

/// Handles a 'tools/call' request by dispatching it to the owning provider.
async fn handle_tool_call(req: Request, state: &AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    let args = params.get("arguments").cloned();
    let result = state.dispatcher.handle(tool_name, args).await;

    match serde_json::to_value(&result) {
        Ok(value) => Response::success(req.id, value),
        Err(e) => {
            error!("Failed to serialize tool result: {}", e);
            Response::error(
                req.id,
                error_codes::INTERNAL_ERROR,
                format!("Failed to serialize tool result: {}", e),
            )
        }
    }
}

/// Handles the 'initialize' request.
fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "sei_mcp",
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions =
        "Sei MCP server: EVM chain queries, offline wallet helpers and documentation search. Every tool validates its arguments before running.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

/// Handles the 'tools/list' request with the aggregated catalog.
fn handle_tools_list(req: &Request, state: &AppState) -> Response {
    let tools: Vec<Value> = state
        .dispatcher
        .list_tools()
        .into_iter()
        .filter_map(|tool| serde_json::to_value(tool).ok())
        .collect();
    Response::success(req.id.clone(), json!({ "tools": tools }))
}
