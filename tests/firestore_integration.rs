// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). They are skipped otherwise.

use instagram_feed::db::{FeedCache, ProfileStore, TokenStore};
use instagram_feed::error::AppError;
use instagram_feed::models::{CachedFeed, Profile};

mod common;
use common::{access_token, carousel_item, image_item, test_db};

/// Unique suffix for test isolation; the emulator keeps data between tests.
fn unique(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

fn test_profile() -> Profile {
    Profile {
        id: unique("profile"),
        username: unique("user"),
        identity_token: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[tokio::test]
async fn test_profile_roundtrip_and_username_uniqueness() {
    require_emulator!();
    let db = test_db().await;
    let profile = test_profile();

    db.insert_profile(&profile).await.unwrap();

    let found = db
        .find_profile_by_username(&profile.username)
        .await
        .unwrap();
    assert_eq!(found, Some(profile.clone()));

    let duplicate = Profile {
        id: unique("other"),
        ..profile.clone()
    };
    let err = db.insert_profile(&duplicate).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(db.get_profile(&duplicate.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_identity_token_is_consumed() {
    require_emulator!();
    let db = test_db().await;
    let token = unique("identity");
    let profile = Profile {
        identity_token: Some(token.clone()),
        ..test_profile()
    };
    db.insert_profile(&profile).await.unwrap();

    let taken = db
        .take_profile_by_identity_token(&token)
        .await
        .unwrap()
        .expect("profile should be found");
    assert_eq!(taken.id, profile.id);
    assert_eq!(taken.identity_token, None);

    assert!(db
        .take_profile_by_identity_token(&token)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_racing_identity_token_takes_resolve_once() {
    require_emulator!();
    let db = test_db().await;
    let other = db.clone();
    let token = unique("identity");
    let profile = Profile {
        identity_token: Some(token.clone()),
        ..test_profile()
    };
    db.insert_profile(&profile).await.unwrap();

    let (first, second) = tokio::join!(
        db.take_profile_by_identity_token(&token),
        other.take_profile_by_identity_token(&token)
    );

    let taken: Vec<Profile> = [first.unwrap(), second.unwrap()]
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0].id, profile.id);

    let stored = db.get_profile(&profile.id).await.unwrap().unwrap();
    assert_eq!(stored.identity_token, None);
}

#[tokio::test]
async fn test_racing_inserts_claim_username_once() {
    require_emulator!();
    let db = test_db().await;
    let other = db.clone();
    let username = unique("user");
    let a = Profile {
        username: username.clone(),
        ..test_profile()
    };
    let b = Profile {
        id: unique("other"),
        username: username.clone(),
        ..test_profile()
    };

    let (first, second) = tokio::join!(db.insert_profile(&a), other.insert_profile(&b));

    let (winner, loser, err) = match (first, second) {
        (Ok(()), Err(err)) => (&a, &b, err),
        (Err(err), Ok(())) => (&b, &a, err),
        results => panic!("expected exactly one insert to win: {:?}", results),
    };
    assert!(matches!(err, AppError::Conflict(_)));

    // No orphaned claim and no profile for the loser
    let found = db.find_profile_by_username(&username).await.unwrap();
    assert_eq!(found.map(|p| p.id), Some(winner.id.clone()));
    assert!(db.get_profile(&loser.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_token_replace_and_delete() {
    require_emulator!();
    let db = test_db().await;
    let profile = test_profile();

    let mut token = access_token(&profile, "FAKE_USER_ID");
    db.replace_token(&token).await.unwrap();

    token.access_code = "SECOND_TOKEN".to_string();
    db.replace_token(&token).await.unwrap();
    assert_eq!(db.get_token(&profile.id).await.unwrap(), Some(token));

    db.delete_token(&profile.id).await.unwrap();
    assert!(db.get_token(&profile.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_feed_cache_roundtrip() {
    require_emulator!();
    let db = test_db().await;
    let profile_id = unique("feed");

    let items = vec![
        image_item("a", "2020-03-10T12:00:00+0000"),
        carousel_item("b", "2020-03-09T12:00:00+0000", &[("c1", "IMAGE"), ("c2", "VIDEO")]),
    ]
    .iter()
    .map(|raw| instagram_feed::services::parse_item(raw, false).unwrap().unwrap())
    .collect();

    let feed = CachedFeed {
        profile_id: profile_id.clone(),
        items,
        cached_at: chrono::Utc::now().to_rfc3339(),
    };

    db.store(&profile_id, &feed).await.unwrap();
    assert_eq!(FeedCache::get(&db, &profile_id).await.unwrap(), Some(feed));

    db.invalidate(&profile_id).await.unwrap();
    assert!(FeedCache::get(&db, &profile_id).await.unwrap().is_none());
}
