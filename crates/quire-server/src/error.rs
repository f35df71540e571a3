//! Error types and their HTTP rendering.

use std::net::SocketAddr;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use quire_content::ResolveError;
use serde::Serialize;

/// Errors starting or running the server process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    Bind(SocketAddr, #[source] std::io::Error),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("File watch error: {0}")]
    Watch(String),

    #[error("Server task failed: {0}")]
    Task(String),
}

/// A request-level failure, rendered as a JSON body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid path")]
    InvalidPath { path: String },

    #[error("File not found")]
    NotFound { path: String },

    #[error("Method not allowed")]
    MethodNotAllowed { method: Method },

    #[error("Internal server error")]
    Internal { path: String },
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    kind: &'static str,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
}

impl ApiError {
    /// Machine-readable kind carried in the body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "InvalidPath",
            Self::NotFound { .. } => "NotFound",
            Self::MethodNotAllowed { .. } => "MethodNotAllowed",
            Self::Internal { .. } => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPath { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidPath { path, .. } => Self::InvalidPath { path },
            // Directories are reported like absent files.
            ResolveError::NotFound { path } | ResolveError::NotAFile { path } => {
                Self::NotFound { path }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.kind(),
            error: self.to_string(),
            path: match &self {
                Self::InvalidPath { path } | Self::NotFound { path } | Self::Internal { path } => {
                    Some(path.as_str())
                }
                Self::MethodNotAllowed { .. } => None,
            },
            method: match &self {
                Self::MethodNotAllowed { method } => Some(method.as_str()),
                _ => None,
            },
        };

        let mut response = (self.status(), Json(body)).into_response();
        if matches!(self, Self::MethodNotAllowed { .. }) {
            response.headers_mut().insert(
                header::ALLOW,
                header::HeaderValue::from_static("GET, HEAD"),
            );
        }
        response
    }
}
