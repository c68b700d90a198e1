//! Typed errors and HTTP mapping.

use crate::sql::ScalarKind;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("unable to read descriptor file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse descriptor: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid descriptor: {0}")]
    Validation(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("cannot render {kind}: missing {missing}")]
    MissingContext {
        kind: &'static str,
        missing: &'static str,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("expected a single resource for {table}, found {count}")]
    TooManyRows { table: String, count: usize },
    #[error("no type descriptor for table {0}")]
    UnknownTable(String),
    #[error("row of {table} has {found} columns, expected {expected}")]
    LayoutMismatch {
        table: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("database: {0}")]
    Query(#[from] sqlx::Error),
    #[error("column {column} does not hold a value of kind {expected:?}")]
    ScanTypeMismatch { column: String, expected: ScalarKind },
    #[error("request data: {0}")]
    RequestData(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Error envelope understood by the workflow client.
#[derive(Serialize)]
pub struct ErrorBody {
    pub status: ErrorStatus,
}

#[derive(Serialize)]
pub struct ErrorStatus {
    pub code: u16,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RequestData(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Query(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Descriptor(_)
            | AppError::Template(_)
            | AppError::Format(_)
            | AppError::Query(_)
            | AppError::ScanTypeMismatch { .. }
            | AppError::Unsupported(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            status: ErrorStatus {
                code: status.as_u16(),
                description: self.to_string(),
                tx: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
