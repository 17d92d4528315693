// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile workflow: OAuth handshake, credential lifecycle and feeds.
//!
//! A profile is a local name that may be connected to one Instagram
//! account. Connecting goes through the authorize URL, whose `state` is a
//! one-time identity token; the redirect is matched back to the profile by
//! that token and then exchanged for a long-lived credential.

use std::sync::Arc;

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::db::{FeedCache, ProfileStore, TokenStore};
use crate::error::{AppError, AuthFlowError, Result};
use crate::models::{AccessToken, CachedFeed, Feed, Profile};
use crate::services::feed::{fetch_media, FeedOptions};
use crate::services::instagram::InstagramClient;
use crate::time_utils::now_rfc3339;

/// Random bytes behind an identity token (hex encoded to 16 chars).
const IDENTITY_TOKEN_BYTES: usize = 8;
const PROFILE_ID_BYTES: usize = 12;

/// Query parameters Instagram appends to the OAuth redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_reason: Option<String>,
    pub error_description: Option<String>,
}

/// What an admin sees for a profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub username: String,
    pub fullname: String,
    pub avatar: String,
    pub has_auth: bool,
    pub auth_url: String,
}

/// Business logic for profiles; cheap to clone.
#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
    tokens: Arc<dyn TokenStore>,
    cache: Arc<dyn FeedCache>,
    instagram: InstagramClient,
    options: FeedOptions,
    /// Size of a feed fetched on a cache miss
    feed_limit: usize,
    rng: SystemRandom,
}

impl ProfileService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        tokens: Arc<dyn TokenStore>,
        cache: Arc<dyn FeedCache>,
        instagram: InstagramClient,
        options: FeedOptions,
        feed_limit: usize,
    ) -> Self {
        Self {
            profiles,
            tokens,
            cache,
            instagram,
            options,
            feed_limit,
            rng: SystemRandom::new(),
        }
    }

    // ─── Profiles ────────────────────────────────────────────────────────────

    pub async fn create_profile(&self, username: &str) -> Result<Profile> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("username must not be empty".to_string()));
        }

        let profile = Profile {
            id: self.random_hex(PROFILE_ID_BYTES)?,
            username: username.to_string(),
            identity_token: None,
            created_at: now_rfc3339(),
        };
        self.profiles.insert_profile(&profile).await?;

        tracing::info!(profile_id = %profile.id, username = %profile.username, "Created profile");
        Ok(profile)
    }

    pub async fn profile_for_username(&self, username: &str) -> Result<Option<Profile>> {
        self.profiles.find_profile_by_username(username).await
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.profiles.list_profiles().await
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Authorize URL for this profile, minting an identity token if it has none.
    pub async fn auth_url(&self, profile: &mut Profile) -> Result<String> {
        let token = match &profile.identity_token {
            Some(token) => token.clone(),
            None => {
                let token = self.random_hex(IDENTITY_TOKEN_BYTES)?;
                profile.identity_token = Some(token.clone());
                self.profiles.update_profile(profile).await?;
                token
            }
        };

        Ok(self.instagram.authorize_url(&token))
    }

    /// Resolve the profile that owns `token`, consuming the token.
    pub async fn profile_for_identity_token(&self, token: &str) -> Result<Option<Profile>> {
        if token.is_empty() {
            return Ok(None);
        }
        self.profiles.take_profile_by_identity_token(token).await
    }

    /// Complete the handshake and store the resulting credential.
    ///
    /// Any existing credential is only replaced once the whole exchange
    /// chain has succeeded.
    pub async fn request_token(
        &self,
        profile: &Profile,
        callback: &AuthCallback,
    ) -> Result<AccessToken> {
        if let Some(error) = &callback.error {
            let reason = callback
                .error_description
                .as_deref()
                .or(callback.error_reason.as_deref())
                .unwrap_or(error);
            return Err(AuthFlowError::Rejected(reason.to_string()).into());
        }
        let Some(code) = callback.code.as_deref().filter(|c| !c.is_empty()) else {
            return Err(AuthFlowError::Rejected("no authorization code".to_string()).into());
        };

        let (short, details, long) = async {
            let short = self.instagram.exchange_code(code).await?;
            let details = self.instagram.fetch_user_details(&short).await?;
            let long = self.instagram.exchange_for_long_lived_token(&short).await?;
            Ok::<_, AppError>((short, details, long))
        }
        .await
        .map_err(|e| AuthFlowError::Exchange(e.to_string()))?;

        let now = now_rfc3339();
        let token = AccessToken {
            profile_id: profile.id.clone(),
            access_code: long.access_token,
            user_id: if details.id.is_empty() {
                short.user_id
            } else {
                details.id
            },
            username: details.username,
            user_fullname: None,
            user_profile_picture: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.tokens.replace_token(&token).await?;

        tracing::info!(
            profile_id = %profile.id,
            instagram_user = %token.username,
            "Connected Instagram account"
        );
        Ok(token)
    }

    /// Extend the profile's long-lived credential in place.
    pub async fn refresh_token(&self, profile: &Profile) -> Result<AccessToken> {
        let mut token = self
            .tokens
            .get_token(&profile.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access token for {}", profile.username)))?;

        let refreshed = self
            .instagram
            .refresh_long_lived_token(&token.access_code)
            .await?;

        token.access_code = refreshed.access_token;
        token.updated_at = now_rfc3339();
        self.tokens.replace_token(&token).await?;

        tracing::debug!(profile_id = %profile.id, "Refreshed access token");
        Ok(token)
    }

    // ─── Credentials ─────────────────────────────────────────────────────────

    pub async fn has_access(&self, profile: &Profile) -> Result<bool> {
        Ok(self.access_token(profile).await?.is_some())
    }

    pub async fn access_token(&self, profile: &Profile) -> Result<Option<AccessToken>> {
        self.tokens.get_token(&profile.id).await
    }

    /// Disconnect the profile. The cached feed is left as is.
    pub async fn clear_token(&self, profile: &Profile) -> Result<()> {
        self.tokens.delete_token(&profile.id).await?;
        tracing::info!(profile_id = %profile.id, "Cleared access token");
        Ok(())
    }

    // ─── Feeds ───────────────────────────────────────────────────────────────

    /// The profile's feed, from cache when possible, cut to `limit` items.
    ///
    /// A cache miss is always filled with the configured feed limit, so the
    /// caller's `limit` only shapes the response and never what is cached.
    ///
    /// Never fails: a profile without access, or any error on the way,
    /// yields an empty feed.
    pub async fn feed(&self, profile: &Profile, limit: Option<usize>) -> Feed {
        match self.cached_or_fetched(profile).await {
            Ok(mut feed) => {
                if let Some(limit) = limit {
                    feed.items.truncate(limit);
                }
                feed
            }
            Err(e) => {
                tracing::warn!(
                    profile_id = %profile.id,
                    error = %e,
                    "Unable to load feed, returning empty feed"
                );
                Feed::empty()
            }
        }
    }

    async fn cached_or_fetched(&self, profile: &Profile) -> Result<Feed> {
        let Some(token) = self.tokens.get_token(&profile.id).await? else {
            return Ok(Feed::empty());
        };

        if let Some(cached) = self.cache.get(&profile.id).await? {
            return Ok(cached.into());
        }

        let items =
            fetch_media(&self.instagram, &token, Some(self.feed_limit), self.options).await?;
        let cached = CachedFeed {
            profile_id: profile.id.clone(),
            items,
            cached_at: now_rfc3339(),
        };
        self.cache.store(&profile.id, &cached).await?;
        tracing::debug!(
            profile_id = %profile.id,
            items = cached.items.len(),
            "Filled feed cache"
        );
        Ok(cached.into())
    }

    /// Fetch a fresh feed and swap it into the cache.
    ///
    /// The cache is only touched after a successful fetch, so on error the
    /// previous entry survives and the error is returned.
    pub async fn refresh_feed(&self, profile: &Profile, limit: Option<usize>) -> Result<Feed> {
        let token = self
            .tokens
            .get_token(&profile.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access token for {}", profile.username)))?;

        let items = fetch_media(&self.instagram, &token, limit, self.options).await?;
        let cached = CachedFeed {
            profile_id: profile.id.clone(),
            items,
            cached_at: now_rfc3339(),
        };

        self.cache.invalidate(&profile.id).await?;
        self.cache.store(&profile.id, &cached).await?;

        tracing::info!(
            profile_id = %profile.id,
            items = cached.items.len(),
            "Refreshed feed"
        );
        Ok(cached.into())
    }

    pub async fn summary(&self, profile: &mut Profile) -> Result<ProfileSummary> {
        let token = self.access_token(profile).await?;
        let auth_url = self.auth_url(profile).await?;

        Ok(ProfileSummary {
            name: profile.username.clone(),
            username: token.as_ref().map(|t| t.username.clone()).unwrap_or_default(),
            fullname: token
                .as_ref()
                .and_then(|t| t.user_fullname.clone())
                .unwrap_or_default(),
            avatar: token
                .as_ref()
                .and_then(|t| t.user_profile_picture.clone())
                .unwrap_or_default(),
            has_auth: token.is_some(),
            auth_url,
        })
    }

    fn random_hex(&self, len: usize) -> Result<String> {
        let mut bytes = vec![0u8; len];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate random bytes")))?;
        Ok(hex::encode(bytes))
    }
}
