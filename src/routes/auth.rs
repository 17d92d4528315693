// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Instagram OAuth redirect route.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::config::Config;
use crate::services::AuthCallback;
use crate::AppState;

/// The callback path is configurable, so the router is built from config.
pub fn routes(config: &Config) -> Router<Arc<AppState>> {
    let path = format!("/{}", config.auth_callback_route.trim_matches('/'));
    Router::new().route(&path, get(auth_callback))
}

/// Handle the redirect back from Instagram.
///
/// `state` carries the profile's identity token. The outcome is only
/// ever reported by redirecting to the success or failure page.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(callback): Query<AuthCallback>,
) -> Redirect {
    let success = Redirect::to(&state.config.success_redirect_to);
    let failure = Redirect::to(&state.config.failure_redirect_to);

    let Some(identity_token) = callback.state.as_deref() else {
        tracing::warn!("OAuth callback without state");
        return failure;
    };

    let profile = match state.profiles.profile_for_identity_token(identity_token).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!("OAuth callback with unknown or used state");
            return failure;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve OAuth state");
            return failure;
        }
    };

    match state.profiles.request_token(&profile, &callback).await {
        Ok(_) => success,
        Err(e) => {
            tracing::warn!(
                profile_id = %profile.id,
                error = %e,
                "Instagram authorization failed"
            );
            failure
        }
    }
}
