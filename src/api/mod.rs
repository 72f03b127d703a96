//! # API Module
//!
//! HTTP front for the MCP server.
//!
//! ## Available Endpoints
//! - `GET /api/health` - liveness and catalog size
//! - `GET /api/tools` - the aggregated tool catalog
//! - `POST /api/rpc` - JSON-RPC endpoint for MCP requests
//!
//! Other methods on these paths are answered with `405 Method Not Allowed`.

pub mod health;
pub mod rpc;
pub mod tools;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health::health_handler))
        .route("/tools", get(tools::list_tools_handler))
        .route("/rpc", post(rpc::rpc_handler));

    Router::new()
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
