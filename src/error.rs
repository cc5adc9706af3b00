//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Template language failures. Syntax errors are hard failures of the whole expansion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template syntax: {construct} at line {line}, column {column}: {message}")]
    Syntax {
        construct: &'static str,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("record '{record}' expects {expected} values, got {actual}")]
    RecordArity {
        record: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("catalog unreachable: {0}")]
    Connectivity(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("render failed for table '{table}' artifact '{artifact}': {message}")]
    Render {
        table: String,
        artifact: String,
        message: String,
    },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("archive: {0}")]
    Archive(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    /// Catalog reads: transport-level failures are connectivity errors, everything else stays a db error.
    pub fn from_catalog(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => AppError::Connectivity(e.to_string()),
            other => AppError::Db(other),
        }
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(e: zip::result::ZipError) -> Self {
        AppError::Archive(e.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Connectivity(_) => (StatusCode::SERVICE_UNAVAILABLE, "connectivity_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Template(_) => (StatusCode::UNPROCESSABLE_ENTITY, "template_syntax_error"),
            AppError::Render { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "template_render_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Archive(_) => (StatusCode::INTERNAL_SERVER_ERROR, "archive_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let details = match &self {
            AppError::Render { table, artifact, .. } => Some(serde_json::json!({
                "table": table,
                "artifact": artifact,
            })),
            AppError::Template(TemplateError::Syntax { construct, line, column, .. }) => Some(serde_json::json!({
                "construct": construct,
                "line": line,
                "column": column,
            })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
