// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and feed API routes.

use crate::error::{AppError, Result};
use crate::models::{Feed, Profile};
use crate::services::ProfileSummary;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Upper bound on `?limit=` for the public feed.
const MAX_FEED_LIMIT: usize = 1000;

/// Routes anyone may call.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profiles/{username}/feed", get(get_feed))
}

/// Routes behind the admin token. The middleware is applied in routes/mod.rs.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profiles", post(create_profile))
        .route("/api/profiles/{username}", get(get_profile))
        .route("/api/profiles/{username}/token", delete(clear_token))
}

async fn find_profile(state: &AppState, username: &str) -> Result<Profile> {
    state
        .profiles
        .profile_for_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {}", username)))
}

// ─── Feed ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    #[serde(default)]
    limit: Option<usize>,
}

/// Get a profile's feed. Empty when the profile is not connected.
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Feed>> {
    let limit = params.limit.unwrap_or(state.config.feed_limit);
    if limit > MAX_FEED_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be at most {}",
            MAX_FEED_LIMIT
        )));
    }

    let profile = find_profile(&state, &username).await?;
    Ok(Json(state.profiles.feed(&profile, Some(limit)).await))
}

// ─── Profiles ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    username: String,
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ProfileSummary>)> {
    let mut profile = state.profiles.create_profile(&request.username).await?;
    let summary = state.profiles.summary(&mut profile).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Profile summary including the URL that connects it to Instagram.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ProfileSummary>> {
    let mut profile = find_profile(&state, &username).await?;
    Ok(Json(state.profiles.summary(&mut profile).await?))
}

/// Disconnect the Instagram account.
async fn clear_token(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    let profile = find_profile(&state, &username).await?;
    state.profiles.clear_token(&profile).await?;
    Ok(StatusCode::NO_CONTENT)
}
