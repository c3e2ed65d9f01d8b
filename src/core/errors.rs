use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures while writing to or reading from the document store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("embedding count mismatch: expected {expected}, got {actual}")]
    EmbeddingCount { expected: usize, actual: usize },
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Failures while building an index or answering a retrieval query.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Embedding(String),
    #[error("index build failed: {0}")]
    IndexBuild(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The language model call failed; no answer is available for this turn.
#[derive(Debug, Error)]
#[error("generation failed: {0}")]
pub struct GenerationError(pub String);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend error: {0}")]
    Backend(String),
}

impl SessionError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        SessionError::Backend(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document type: {0}")]
    Unsupported(String),
    #[error("text extraction failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("document '{0}' contains no extractable text")]
    EmptyDocument(String),
    #[error("failed to persist upload: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors surfaced by a conversation turn. A failed turn never yields an answer.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    Graph(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidInput(msg) => ApiError::BadRequest(msg),
            WorkflowError::Generation(e) => ApiError::Upstream(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Extract(ExtractError::Unsupported(msg)) => ApiError::BadRequest(msg),
            IngestError::EmptyDocument(_) => ApiError::BadRequest(err.to_string()),
            IngestError::Storage(StorageError::Embedding(msg)) => ApiError::Upstream(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failure_maps_to_bad_gateway() {
        let err: ApiError = WorkflowError::Generation(GenerationError("timeout".into())).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn invalid_input_maps_to_bad_request() {
        let err: ApiError = WorkflowError::InvalidInput("question is empty".into()).into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "question is empty"));
    }

    #[test]
    fn empty_document_maps_to_bad_request() {
        let err: ApiError = IngestError::EmptyDocument("scan.pdf".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_error_is_transparent_inside_retrieval() {
        let err = RetrievalError::from(StorageError::Backend("disk full".into()));
        assert_eq!(err.to_string(), "storage backend error: disk full");
    }
}
