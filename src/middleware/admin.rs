// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin bearer token middleware for profile management and `/tasks/*`.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer <ADMIN_TOKEN>`.
///
/// With no admin token configured every admin route is closed.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        tracing::warn!(path = %request.uri().path(), "Admin route called but ADMIN_TOKEN is unset");
        return Err(AppError::Forbidden);
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(presented) = presented else {
        return Err(AppError::Unauthorized);
    };

    if !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!(path = %request.uri().path(), "Blocked admin request with wrong token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
