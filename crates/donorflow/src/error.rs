use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use donorflow_core::error::{IngestError, PersistenceError};
use donorflow_core::upload::{RejectionBody, UploadRejection};
use serde_json::json;

/// Handler error with its HTTP mapping.
#[derive(Debug)]
pub enum ApiError {
    Upload(UploadRejection),
    Ingest(IngestError),
    Persistence(PersistenceError),
    BadRequest(String),
}

impl From<UploadRejection> for ApiError {
    fn from(err: UploadRejection) -> Self {
        ApiError::Upload(err)
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        ApiError::Ingest(err)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        ApiError::Persistence(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Upload(rejection) => {
                tracing::debug!(error = %rejection, "upload rejected");
                (StatusCode::BAD_REQUEST, Json(RejectionBody::from(&rejection))).into_response()
            }
            ApiError::Ingest(err) => {
                tracing::info!(error = %err, "donor batch rejected");
                (StatusCode::BAD_REQUEST, Json(RejectionBody::from(&err))).into_response()
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Persistence(err) => persistence_response(err),
        }
    }
}

fn persistence_response(err: PersistenceError) -> Response {
    match err {
        PersistenceError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Donor not found" })),
        )
            .into_response(),
        PersistenceError::DuplicateEmail(_) => (
            StatusCode::CONFLICT,
            Json(json!({ "message": err.to_string() })),
        )
            .into_response(),
        PersistenceError::Constraint(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Validation failed", "errors": errors })),
        )
            .into_response(),
        PersistenceError::Sqlx(_) | PersistenceError::Corrupt(_) => {
            tracing::error!(error = %err, "donor storage failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Internal server error" })),
            )
                .into_response()
        }
    }
}
