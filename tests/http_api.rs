//! End-to-end tests through the HTTP router, with local upstream stand-ins.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tower::ServiceExt;

use sei_mcp_server::{api, config::Config, AppState};

const DEAD: &str = "0x000000000000000000000000000000000000dEaD";

async fn spawn_upstream(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn fake_rpc(Json(body): Json<Value>) -> Json<Value> {
    let result = match body["method"].as_str().unwrap_or_default() {
        "eth_getBalance" => json!("0xde0b6b3a7640000"),
        "eth_chainId" => json!("0x531"),
        "eth_blockNumber" => json!("0x10"),
        "eth_gasPrice" => json!("0x174876e800"),
        "eth_getTransactionByHash" => Value::Null,
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": { "code": -32601, "message": "method not found" }
            }))
        }
    };
    Json(json!({ "jsonrpc": "2.0", "id": body["id"], "result": result }))
}

async fn slow_rpc(Json(body): Json<Value>) -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "jsonrpc": "2.0", "id": body["id"], "result": "0x0" }))
}

async fn test_app(rpc_url: &str, docs_search_url: Option<String>) -> Router {
    let config = Config {
        chain_rpc_urls: HashMap::from([("1329".to_string(), rpc_url.to_string())]),
        docs_search_url,
        request_timeout: Duration::from_millis(300),
        ..Config::default()
    };
    api::router(AppState::from_config(config).unwrap())
}

async fn rpc(app: &Router, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/rpc")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn call_tool(app: &Router, name: &str, arguments: Value) -> Value {
    let resp = rpc(
        app,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        }),
    )
    .await;
    assert!(resp.get("error").is_none(), "unexpected rpc error: {}", resp);
    resp["result"].clone()
}

fn payload(result: &Value) -> Value {
    serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_get_balance_through_rpc() {
    let upstream = spawn_upstream(Router::new().route("/", post(fake_rpc))).await;
    let app = test_app(&upstream, None).await;

    let result = call_tool(&app, "get_balance", json!({ "address": DEAD, "chain_id": "mainnet" })).await;
    assert!(result.get("isError").is_none());
    assert_eq!(result["structuredContent"]["amount"], "1000000000000000000");
    assert_eq!(result["structuredContent"]["chain_id"], "1329");
    assert_eq!(result["structuredContent"]["denom"], "wei");
}

#[tokio::test]
async fn test_invalid_address_never_reaches_upstream() {
    // No upstream is listening on this port; a validation failure must short-circuit.
    let app = test_app("http://127.0.0.1:9", None).await;

    let result = call_tool(&app, "get_balance", json!({ "address": "0xabc" })).await;
    assert_eq!(result["isError"], true);
    let payload = payload(&result);
    assert_eq!(payload["error"], "invalid_arguments");
    assert!(payload["reason"].as_str().unwrap().contains("address"));
}

#[tokio::test]
async fn test_chain_info_and_missing_transaction() {
    let upstream = spawn_upstream(Router::new().route("/", post(fake_rpc))).await;
    let app = test_app(&upstream, None).await;

    let info = call_tool(&app, "get_chain_info", json!({})).await;
    assert_eq!(info["structuredContent"]["rpc_chain_id"], "1329");
    assert_eq!(info["structuredContent"]["latest_block"], "16");
    assert_eq!(info["structuredContent"]["gas_price_wei"], "100000000000");

    let hash = format!("0x{}", "ab".repeat(32));
    let tx = call_tool(&app, "get_transaction", json!({ "hash": hash })).await;
    assert_eq!(tx["structuredContent"]["found"], false);
}

#[tokio::test]
async fn test_upstream_rpc_error_is_reported_as_tool_output() {
    let upstream = spawn_upstream(Router::new().route("/", post(fake_rpc))).await;
    let app = test_app(&upstream, None).await;

    let result = call_tool(&app, "get_block", json!({ "block": 12 })).await;
    assert_eq!(result["isError"], true);
    let payload = payload(&result);
    assert_eq!(payload["error"], "upstream_error");
    assert_eq!(payload["tool"], "get_block");
    assert!(payload["reason"]
        .as_str()
        .unwrap()
        .contains("eth_getBlockByNumber: method not found"));
}

#[tokio::test]
async fn test_handler_timeout_yields_error_envelope() {
    let upstream = spawn_upstream(Router::new().route("/", post(slow_rpc))).await;
    let app = test_app(&upstream, None).await;

    let result = call_tool(&app, "get_balance", json!({ "address": DEAD })).await;
    assert_eq!(result["isError"], true);
    let payload = payload(&result);
    assert_eq!(payload["error"], "timeout");
    assert!(payload["url"].as_str().unwrap().starts_with("http://127.0.0.1"));
}

#[tokio::test]
async fn test_docs_search_failure_keeps_status() {
    let upstream = spawn_upstream(Router::new().route(
        "/search",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "index rebuilding") }),
    ))
    .await;
    let app = test_app("http://127.0.0.1:9", Some(format!("{}/search?key=secret", upstream))).await;

    let result = call_tool(&app, "search_docs", json!({ "query": "staking", "limit": 3 })).await;
    assert_eq!(result["isError"], true);
    let payload = payload(&result);
    assert_eq!(payload["error"], "upstream_error");
    assert_eq!(payload["status"], 503);
    assert_eq!(payload["upstream_message"], "index rebuilding");
    assert!(!payload["url"].as_str().unwrap().contains("secret"));
}

#[tokio::test]
async fn test_docs_search_limit_is_validated() {
    let app = test_app("http://127.0.0.1:9", Some("http://127.0.0.1:9/search".into())).await;

    let result = call_tool(&app, "search_docs", json!({ "query": "staking", "limit": 50 })).await;
    let payload = payload(&result);
    assert_eq!(payload["error"], "invalid_arguments");
    assert_eq!(payload["reason"], "limit: must be <= 20");
}

#[tokio::test]
async fn test_unknown_tool_returns_payload() {
    let app = test_app("http://127.0.0.1:9", None).await;

    let result = call_tool(&app, "doesNotExist", json!({})).await;
    assert_eq!(result["isError"], true);
    let payload = payload(&result);
    assert_eq!(payload["error"], "unknown_tool");
    assert_eq!(payload["tool"], "doesNotExist");
}

#[tokio::test]
async fn test_tools_list_echoes_schemas() {
    let app = test_app("http://127.0.0.1:9", None).await;

    let resp = rpc(&app, json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" })).await;
    let tools = resp["result"]["tools"].as_array().unwrap();
    let balance = tools.iter().find(|t| t["name"] == "get_balance").unwrap();
    assert_eq!(balance["title"], "Get Balance");
    assert_eq!(
        balance["inputSchema"]["properties"]["address"]["pattern"],
        "^0x[0-9a-fA-F]{40}$"
    );
    let docs_url = tools.iter().find(|t| t["name"] == "get_docs_url").unwrap();
    assert_eq!(docs_url["inputSchema"], json!({ "type": "object" }));
    let derive = tools.iter().find(|t| t["name"] == "derive_address").unwrap();
    assert_eq!(derive["inputSchema"]["required"], json!(["private_key"]));
}

#[tokio::test]
async fn test_rpc_rejects_get() {
    let app = test_app("http://127.0.0.1:9", None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/api/rpc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health_and_tool_listing_endpoints() {
    let app = test_app("http://127.0.0.1:9", None).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["tools"], 9);
    assert_eq!(health["chains"], json!(["1329"]));

    let response = app
        .oneshot(Request::builder().uri("/api/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let tools: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(tools.as_array().unwrap().len(), 9);
}
