// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.
//!
//! Everything is lost on restart. Each map is keyed by profile ID, so
//! concurrent refreshes of different profiles never contend.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::db::{FeedCache, ProfileStore, TokenStore};
use crate::error::AppError;
use crate::models::{AccessToken, CachedFeed, Profile};

/// DashMap-backed implementation of every store trait.
#[derive(Clone, Default)]
pub struct MemoryStore {
    profiles: Arc<DashMap<String, Profile>>,
    /// username → profile ID, the uniqueness index
    usernames: Arc<DashMap<String, String>>,
    tokens: Arc<DashMap<String, AccessToken>>,
    feeds: Arc<DashMap<String, CachedFeed>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        match self.usernames.entry(profile.username.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Profile username {} already exists",
                profile.username
            ))),
            Entry::Vacant(slot) => {
                slot.insert(profile.id.clone());
                self.profiles.insert(profile.id.clone(), profile.clone());
                Ok(())
            }
        }
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        Ok(self.profiles.get(id).map(|p| p.clone()))
    }

    async fn find_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Profile>, AppError> {
        let Some(id) = self.usernames.get(username).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.get_profile(&id).await
    }

    async fn take_profile_by_identity_token(
        &self,
        token: &str,
    ) -> Result<Option<Profile>, AppError> {
        for mut entry in self.profiles.iter_mut() {
            if entry.identity_token.as_deref() == Some(token) {
                entry.identity_token = None;
                return Ok(Some(entry.clone()));
            }
        }
        Ok(None)
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), AppError> {
        match self.profiles.get_mut(&profile.id) {
            Some(mut existing) => {
                *existing = profile.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Profile {}", profile.id))),
        }
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let mut profiles: Vec<Profile> = self.profiles.iter().map(|p| p.clone()).collect();
        profiles.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(profiles)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_token(&self, profile_id: &str) -> Result<Option<AccessToken>, AppError> {
        Ok(self.tokens.get(profile_id).map(|t| t.clone()))
    }

    async fn replace_token(&self, token: &AccessToken) -> Result<(), AppError> {
        self.tokens.insert(token.profile_id.clone(), token.clone());
        Ok(())
    }

    async fn delete_token(&self, profile_id: &str) -> Result<(), AppError> {
        self.tokens.remove(profile_id);
        Ok(())
    }
}

#[async_trait]
impl FeedCache for MemoryStore {
    async fn get(&self, profile_id: &str) -> Result<Option<CachedFeed>, AppError> {
        Ok(self.feeds.get(profile_id).map(|f| f.clone()))
    }

    async fn store(&self, profile_id: &str, feed: &CachedFeed) -> Result<(), AppError> {
        self.feeds.insert(profile_id.to_string(), feed.clone());
        Ok(())
    }

    async fn invalidate(&self, profile_id: &str) -> Result<(), AppError> {
        self.feeds.remove(profile_id);
        Ok(())
    }
}
