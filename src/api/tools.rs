use axum::{extract::State, Json};
use crate::{tools::ListedTool, AppState};

// Same catalog as `tools/list`, for quick inspection over plain HTTP
pub async fn list_tools_handler(State(state): State<AppState>) -> Json<Vec<ListedTool>> {
    Json(state.dispatcher.list_tools())
}
