// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scheduled maintenance routes.
//!
//! Called by a scheduler (cron, Cloud Scheduler), not by users. They sit
//! behind the admin token.

use crate::error::{AppError, Result};
use crate::services::RefreshReport;
use crate::AppState;
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/refresh-feeds", post(refresh_feeds))
        .route("/tasks/refresh-tokens", post(refresh_tokens))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshFeedsPayload {
    #[serde(default)]
    limit: Option<usize>,
}

/// Refresh every connected feed. The JSON body is optional.
async fn refresh_feeds(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RefreshReport>> {
    let payload: RefreshFeedsPayload = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshFeedsPayload::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid payload: {}", e)))?
    };

    let limit = payload.limit.unwrap_or(state.config.feed_limit);
    let report = state.refresher.refresh_authorized_feeds(Some(limit)).await?;
    Ok(Json(report))
}

async fn refresh_tokens(State(state): State<Arc<AppState>>) -> Result<Json<RefreshReport>> {
    Ok(Json(state.refresher.refresh_tokens().await?))
}
