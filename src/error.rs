// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Instagram reported the access token as invalid or expired.
    #[error("Instagram rejected the access token: {0}")]
    BadToken(String),

    /// Any other failed Instagram request (non-2xx, transport error, timeout).
    #[error(
        "Http request to {url} failed {} and error message: {message}",
        describe_status(.status)
    )]
    Http {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error(transparent)]
    AuthFlow(#[from] AuthFlowError),

    #[error("Malformed media item: {0}")]
    MalformedMedia(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Access forbidden")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failures of the one-time OAuth handshake.
#[derive(Debug, thiserror::Error)]
pub enum AuthFlowError {
    /// The redirect carried an `error` parameter or no `code` (user denied).
    #[error("Unable to get request token: {0}")]
    Rejected(String),

    /// The code/token exchange chain itself failed.
    #[error("Access token request failed: {0}")]
    Exchange(String),
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("with a status of {}", code),
        None => "without a response".to_string(),
    }
}

impl AppError {
    /// Whether the stored credential should be discarded.
    pub fn is_bad_token(&self) -> bool {
        matches!(self, AppError::BadToken(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::BadToken(_) => (StatusCode::BAD_GATEWAY, "bad_token", None),
            AppError::Http { .. } => {
                tracing::warn!(error = %self, "Instagram request failed");
                (StatusCode::BAD_GATEWAY, "instagram_error", None)
            }
            AppError::AuthFlow(err) => {
                (StatusCode::BAD_REQUEST, "auth_flow", Some(err.to_string()))
            }
            AppError::MalformedMedia(msg) => {
                tracing::error!(error = %msg, "Malformed media from Instagram");
                (StatusCode::BAD_GATEWAY, "malformed_media", None)
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
