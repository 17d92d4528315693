// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use instagram_feed::config::Config;
use instagram_feed::db::{FirestoreDb, MemoryStore, ProfileStore, TokenStore};
use instagram_feed::models::{AccessToken, Profile};
use instagram_feed::routes::create_router;
use instagram_feed::services::{FailureNotifier, LogNotifier};
use instagram_feed::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub const ADMIN_TOKEN: &str = "test_admin_token";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test config with both Instagram hosts pointed at the mock server.
#[allow(dead_code)]
pub fn test_config(server: &MockServer) -> Config {
    Config {
        instagram_api_url: server.uri(),
        instagram_graph_url: server.uri(),
        ..Config::default()
    }
}

/// State over a fresh in-memory store.
#[allow(dead_code)]
pub fn test_state(config: Config) -> (Arc<AppState>, MemoryStore) {
    test_state_with_notifier(config, Arc::new(LogNotifier))
}

#[allow(dead_code)]
pub fn test_state_with_notifier(
    config: Config,
    notifier: Arc<dyn FailureNotifier>,
) -> (Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let state = AppState::new(
        config,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        notifier,
    )
    .expect("Failed to build app state");
    (Arc::new(state), store)
}

/// Create a test app. Returns the router, the shared state and the store.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> (axum::Router, Arc<AppState>, MemoryStore) {
    let (state, store) = test_state(config);
    (create_router(state.clone()), state, store)
}

/// Create a profile and give it a stored credential for `user_id`.
#[allow(dead_code)]
pub async fn connected_profile(
    state: &AppState,
    store: &MemoryStore,
    username: &str,
    user_id: &str,
) -> Profile {
    let profile = state.profiles.create_profile(username).await.unwrap();
    store
        .replace_token(&access_token(&profile, user_id))
        .await
        .unwrap();
    profile
}

#[allow(dead_code)]
pub fn access_token(profile: &Profile, user_id: &str) -> AccessToken {
    AccessToken {
        profile_id: profile.id.clone(),
        access_code: "VALID_LONG_LIVED_TOKEN".to_string(),
        user_id: user_id.to_string(),
        username: "instagram_test_username".to_string(),
        user_fullname: None,
        user_profile_picture: None,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

#[allow(dead_code)]
pub async fn stored_profile(store: &MemoryStore, username: &str) -> Profile {
    store
        .find_profile_by_username(username)
        .await
        .unwrap()
        .expect("profile should exist")
}

// ─── Instagram response fixtures ─────────────────────────────────────────────

#[allow(dead_code)]
pub fn image_item(id: &str, timestamp: &str) -> Value {
    json!({
        "id": id,
        "media_type": "IMAGE",
        "media_url": format!("https://scontent.test/{}.jpg", id),
        "permalink": format!("https://www.instagram.com/p/{}/", id),
        "caption": format!("caption {}", id),
        "timestamp": timestamp,
    })
}

#[allow(dead_code)]
pub fn video_item(id: &str, timestamp: &str) -> Value {
    json!({
        "id": id,
        "media_type": "VIDEO",
        "media_url": format!("https://video.test/{}.mp4", id),
        "thumbnail_url": format!("https://scontent.test/{}-thumb.jpg", id),
        "permalink": format!("https://www.instagram.com/p/{}/", id),
        "timestamp": timestamp,
    })
}

/// Carousel whose children are `(id, media_type)` pairs.
#[allow(dead_code)]
pub fn carousel_item(id: &str, timestamp: &str, children: &[(&str, &str)]) -> Value {
    let children: Vec<Value> = children
        .iter()
        .map(|(child_id, kind)| {
            json!({
                "id": child_id,
                "media_type": kind,
                "media_url": format!("https://cdn.test/{}", child_id),
                "thumbnail_url": format!("https://cdn.test/{}-thumb.jpg", child_id),
            })
        })
        .collect();

    json!({
        "id": id,
        "media_type": "CAROUSEL_ALBUM",
        "media_url": format!("https://cdn.test/{}", id),
        "permalink": format!("https://www.instagram.com/p/{}/", id),
        "timestamp": timestamp,
        "children": { "data": children },
    })
}

/// A media page, with a `next` link when given.
#[allow(dead_code)]
pub fn media_page(items: Vec<Value>, next: Option<String>) -> Value {
    match next {
        Some(next) => json!({
            "data": items,
            "paging": { "cursors": { "after": "AFTER" }, "next": next },
        }),
        None => json!({ "data": items, "paging": { "cursors": { "after": "AFTER" } } }),
    }
}

#[allow(dead_code)]
pub fn bad_token_body() -> Value {
    json!({
        "meta": {
            "code": 400,
            "error_type": "OAuthAccessTokenException",
            "error_message": "The access_token provided is invalid."
        }
    })
}

/// Timestamp `n` days into March 2020, Instagram's format.
#[allow(dead_code)]
pub fn day(n: u32) -> String {
    format!("2020-03-{:02}T12:00:00+0000", n)
}

#[allow(dead_code)]
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|r| r.len())
        .unwrap_or(0)
}
