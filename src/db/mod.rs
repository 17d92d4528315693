//! Storage layer: profile, credential and feed-cache stores.
//!
//! The service talks to storage through the traits below. `FirestoreDb` is
//! the production backend; `MemoryStore` backs local development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{AccessToken, CachedFeed, Profile};

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
    /// Username index enforcing uniqueness
    pub const USERNAMES: &str = "usernames";
    /// One document per profile ID, so a write is always a full replace
    pub const TOKENS: &str = "tokens";
    /// Cached feeds (keyed by profile ID)
    pub const FEEDS: &str = "feeds";
}

/// Persistence for profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a new profile. Fails with `Conflict` if the username is taken.
    async fn insert_profile(&self, profile: &Profile) -> Result<(), AppError>;

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError>;

    async fn find_profile_by_username(&self, username: &str)
        -> Result<Option<Profile>, AppError>;

    /// Find the profile holding `token` and clear the token in the same step.
    async fn take_profile_by_identity_token(
        &self,
        token: &str,
    ) -> Result<Option<Profile>, AppError>;

    async fn update_profile(&self, profile: &Profile) -> Result<(), AppError>;

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError>;
}

/// Persistence for the single active credential of each profile.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self, profile_id: &str) -> Result<Option<AccessToken>, AppError>;

    /// Store `token`, discarding whatever the profile had before.
    async fn replace_token(&self, token: &AccessToken) -> Result<(), AppError>;

    async fn delete_token(&self, profile_id: &str) -> Result<(), AppError>;
}

/// Cache of realized feeds. Entries never expire on their own.
#[async_trait]
pub trait FeedCache: Send + Sync {
    async fn get(&self, profile_id: &str) -> Result<Option<CachedFeed>, AppError>;

    /// Unconditional overwrite.
    async fn store(&self, profile_id: &str, feed: &CachedFeed) -> Result<(), AppError>;

    async fn invalidate(&self, profile_id: &str) -> Result<(), AppError>;
}
