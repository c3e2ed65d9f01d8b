use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::state::AppState;

const DEFAULT_THREAD_ID: &str = "default";

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let thread_id = payload.thread_id.as_deref().unwrap_or(DEFAULT_THREAD_ID);
    let answer = state.workflow.ask(&payload.question, thread_id).await?;
    Ok(Json(answer))
}
