// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the store traits.
//!
//! Collections:
//! - profiles (keyed by profile ID)
//! - usernames (keyed by username, claims a name for one profile)
//! - tokens (keyed by profile ID)
//! - feeds (keyed by profile ID, items held as a JSON string)

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreTransaction};
use serde::{Deserialize, Serialize};

use crate::db::{collections, FeedCache, ProfileStore, TokenStore};
use crate::error::AppError;
use crate::models::{AccessToken, CachedFeed, Profile};

/// Attempts for a transaction that keeps losing to concurrent writers.
const MAX_TRANSACTION_ATTEMPTS: usize = 3;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Reserves a username. Written in the same transaction as its profile.
#[derive(Debug, Serialize, Deserialize)]
struct UsernameClaim {
    profile_id: String,
}

/// Feed document. Media variants nest tagged enums several levels deep,
/// so the items are stored as one JSON string.
#[derive(Debug, Serialize, Deserialize)]
struct FeedDocument {
    profile_id: String,
    items_json: String,
    cached_at: String,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// The emulator accepts any bearer token.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJmZWVkIn0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore Emulator");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Offline client; every operation fails with a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Client whose reads join `transaction`, so the documents they return
    /// are checked for concurrent writes at commit.
    fn transaction_reader(
        client: &firestore::FirestoreDb,
        transaction: &FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        client.clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ))
    }

    async fn begin(
        client: &firestore::FirestoreDb,
    ) -> Result<FirestoreTransaction<'_>, AppError> {
        client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))
    }

    /// Commit, returning `Ok(false)` when another writer won and the whole
    /// transaction should be run again.
    async fn commit(transaction: FirestoreTransaction<'_>) -> Result<bool, AppError> {
        match transaction.commit().await {
            Ok(_) => Ok(true),
            Err(FirestoreError::DatabaseError(e)) if e.retry_possible => {
                tracing::debug!(error = ?e, "Transaction contended, retrying");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(format!("Transaction commit failed: {}", e))),
        }
    }

    async fn write_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FirestoreDb {
    /// Claim the username and write the profile in one transaction.
    ///
    /// Reading the claim inside the transaction makes a concurrent insert of
    /// the same username fail its commit; the retry then sees the claim.
    async fn insert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let client = self.get_client()?;
        let claim = UsernameClaim {
            profile_id: profile.id.clone(),
        };

        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let mut transaction = Self::begin(client).await?;
            let reader = Self::transaction_reader(client, &transaction);

            let existing: Result<Option<UsernameClaim>, _> = reader
                .fluent()
                .select()
                .by_id_in(collections::USERNAMES)
                .obj()
                .one(&profile.username)
                .await;

            match existing {
                Ok(None) => {}
                Ok(Some(_)) => {
                    let _ = transaction.rollback().await;
                    return Err(AppError::Conflict(format!(
                        "Profile username {} already exists",
                        profile.username
                    )));
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(AppError::Database(e.to_string()));
                }
            }

            client
                .fluent()
                .update()
                .in_col(collections::USERNAMES)
                .document_id(&profile.username)
                .object(&claim)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add claim to transaction: {}", e))
                })?;

            client
                .fluent()
                .update()
                .in_col(collections::PROFILES)
                .document_id(&profile.id)
                .object(profile)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add profile to transaction: {}", e))
                })?;

            if Self::commit(transaction).await? {
                return Ok(());
            }
            tracing::debug!(attempt, username = %profile.username, "Profile insert contended");
        }

        Err(AppError::Database(format!(
            "Profile insert for {} gave up after {} attempts",
            profile.username, MAX_TRANSACTION_ATTEMPTS
        )))
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Profile>, AppError> {
        let claim: Option<UsernameClaim> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERNAMES)
            .obj()
            .one(username)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match claim {
            Some(claim) => self.get_profile(&claim.profile_id).await,
            None => Ok(None),
        }
    }

    /// Find and clear the identity token in one transaction, so two
    /// redirects carrying the same token cannot both resolve the profile.
    async fn take_profile_by_identity_token(
        &self,
        token: &str,
    ) -> Result<Option<Profile>, AppError> {
        let client = self.get_client()?;
        let token = token.to_string();

        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let mut transaction = Self::begin(client).await?;
            let reader = Self::transaction_reader(client, &transaction);

            let matches: Result<Vec<Profile>, _> = reader
                .fluent()
                .select()
                .from(collections::PROFILES)
                .filter(|q| q.for_all([q.field("identity_token").eq(token.clone())]))
                .limit(1)
                .obj()
                .query()
                .await;

            let mut profile = match matches.map(|m| m.into_iter().next()) {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    let _ = transaction.rollback().await;
                    return Ok(None);
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(AppError::Database(e.to_string()));
                }
            };

            profile.identity_token = None;
            client
                .fluent()
                .update()
                .in_col(collections::PROFILES)
                .document_id(&profile.id)
                .object(&profile)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add profile to transaction: {}", e))
                })?;

            if Self::commit(transaction).await? {
                return Ok(Some(profile));
            }
            tracing::debug!(attempt, "Identity token take contended");
        }

        Err(AppError::Database(format!(
            "Identity token take gave up after {} attempts",
            MAX_TRANSACTION_ATTEMPTS
        )))
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), AppError> {
        if self.get_profile(&profile.id).await?.is_none() {
            return Err(AppError::NotFound(format!("Profile {}", profile.id)));
        }
        self.write_profile(profile).await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .order_by([("username", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl TokenStore for FirestoreDb {
    async fn get_token(&self, profile_id: &str) -> Result<Option<AccessToken>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TOKENS)
            .obj()
            .one(profile_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn replace_token(&self, token: &AccessToken) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::TOKENS)
            .document_id(&token.profile_id)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_token(&self, profile_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::TOKENS)
            .document_id(profile_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl FeedCache for FirestoreDb {
    async fn get(&self, profile_id: &str) -> Result<Option<CachedFeed>, AppError> {
        let doc: Option<FeedDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FEEDS)
            .obj()
            .one(profile_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(doc) = doc else {
            return Ok(None);
        };

        // An undecodable entry is treated as a miss and refetched.
        match serde_json::from_str(&doc.items_json) {
            Ok(items) => Ok(Some(CachedFeed {
                profile_id: doc.profile_id,
                items,
                cached_at: doc.cached_at,
            })),
            Err(e) => {
                tracing::warn!(profile_id, error = %e, "Discarding unreadable cached feed");
                Ok(None)
            }
        }
    }

    async fn store(&self, profile_id: &str, feed: &CachedFeed) -> Result<(), AppError> {
        let doc = FeedDocument {
            profile_id: feed.profile_id.clone(),
            items_json: serde_json::to_string(&feed.items)
                .map_err(|e| AppError::Internal(e.into()))?,
            cached_at: feed.cached_at.clone(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FEEDS)
            .document_id(profile_id)
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn invalidate(&self, profile_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FEEDS)
            .document_id(profile_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
