use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ratings_core::query::ListingError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("database unavailable")]
    Unavailable,
    #[error("{0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            sentry_anyhow::capture_anyhow(err);
            tracing::error!(error = %format!("{err:#}"), "request failed");
        }

        let status = self.status();
        let message = match &self {
            ApiError::Internal(err) => format!("{err:#}"),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
