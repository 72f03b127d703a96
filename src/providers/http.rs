// src/providers/http.rs

use crate::tools::ToolError;
use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// HTTP client shared by every provider. The timeout bounds each outbound call.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Strips credentials and query strings before a URL is shown to callers.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        Err(_) => raw.split('?').next().unwrap_or(raw).to_string(),
    }
}

pub fn request_error(url: &str, err: reqwest::Error) -> ToolError {
    let url = redact_url(url);
    if err.is_timeout() {
        ToolError::Timeout { url }
    } else {
        ToolError::Upstream {
            url,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Reads a JSON body. Non-JSON bodies from a successful call are kept as `raw`.
pub async fn read_json(url: &str, res: Response) -> Result<Value, ToolError> {
    let status = res.status();
    let body = res.text().await.map_err(|e| request_error(url, e))?;
    if !status.is_success() {
        return Err(ToolError::Upstream {
            url: redact_url(url),
            status: Some(status.as_u16()),
            message: body,
        });
    }
    Ok(serde_json::from_str::<Value>(&body)
        .unwrap_or_else(|_| json!({ "status": status.as_u16(), "raw": body })))
}

/// Single EVM JSON-RPC call; returns the `result` member.
pub async fn json_rpc(
    client: &Client,
    url: &str,
    method: &str,
    params: Value,
) -> Result<Value, ToolError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });
    let res = client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| request_error(url, e))?;
    let body = read_json(url, res).await?;
    if let Some(err) = body.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(ToolError::Upstream {
            url: redact_url(url),
            status: None,
            message: format!("{}: {}", method, message),
        });
    }
    body.get("result").cloned().ok_or_else(|| ToolError::Upstream {
        url: redact_url(url),
        status: None,
        message: format!("RPC response missing 'result' field: {}", body),
    })
}

/// Parses a `0x`-prefixed hex quantity into a decimal string.
pub fn hex_quantity(value: &Value) -> Option<String> {
    let raw = value.as_str()?;
    u128::from_str_radix(raw.trim_start_matches("0x"), 16)
        .ok()
        .map(|n| n.to_string())
}
