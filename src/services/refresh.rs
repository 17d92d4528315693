// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic maintenance: refresh every connected feed and credential.
//!
//! Both jobs are triggered over HTTP by a scheduler. Profiles are processed
//! concurrently; one profile failing never stops the others.

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::Serialize;

use crate::error::AppError;
use crate::models::Profile;
use crate::services::profile::ProfileService;

const MAX_CONCURRENT_REFRESHES: usize = 8;

/// Outcome counts for one run over all profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failed: usize,
    pub tokens_cleared: usize,
}

/// A failed feed refresh, as handed to a [`FailureNotifier`].
#[derive(Debug)]
pub struct RefreshFailure<'a> {
    /// Where the operator wants to hear about it
    pub recipient: &'a str,
    pub profile: &'a Profile,
    /// Whether the profile still has a credential after the failure
    pub has_access: bool,
    pub error: &'a AppError,
}

/// Sink for feed refresh failures.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn feed_refresh_failed(&self, failure: RefreshFailure<'_>);
}

/// Records failures as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl FailureNotifier for LogNotifier {
    async fn feed_refresh_failed(&self, failure: RefreshFailure<'_>) {
        tracing::error!(
            recipient = failure.recipient,
            profile = %failure.profile.username,
            has_access = failure.has_access,
            error = %failure.error,
            "Instagram feed refresh failed"
        );
    }
}

enum Outcome {
    Refreshed,
    Failed,
    Cleared,
}

/// Drives [`ProfileService`] over every profile.
#[derive(Clone)]
pub struct FeedRefresher {
    profiles: ProfileService,
    notifier: std::sync::Arc<dyn FailureNotifier>,
    notify_on_error: Option<String>,
}

impl FeedRefresher {
    pub fn new(
        profiles: ProfileService,
        notifier: std::sync::Arc<dyn FailureNotifier>,
        notify_on_error: Option<String>,
    ) -> Self {
        Self {
            profiles,
            notifier,
            notify_on_error: notify_on_error.filter(|r| !r.trim().is_empty()),
        }
    }

    /// Refresh the feed of every profile that has access.
    pub async fn refresh_authorized_feeds(&self, limit: Option<usize>) -> Result<RefreshReport, AppError> {
        let profiles = self.connected_profiles().await?;
        tracing::info!(profiles = profiles.len(), ?limit, "Refreshing authorized feeds");

        let outcomes: Vec<Outcome> = stream::iter(profiles)
            .map(|profile| async move { self.refresh_one_feed(profile, limit).await })
            .buffer_unordered(MAX_CONCURRENT_REFRESHES)
            .collect()
            .await;

        let report = tally(outcomes);
        tracing::info!(
            refreshed = report.refreshed,
            failed = report.failed,
            tokens_cleared = report.tokens_cleared,
            "Feed refresh complete"
        );
        Ok(report)
    }

    /// Extend every stored long-lived credential.
    pub async fn refresh_tokens(&self) -> Result<RefreshReport, AppError> {
        let profiles = self.connected_profiles().await?;
        tracing::info!(profiles = profiles.len(), "Refreshing access tokens");

        let outcomes: Vec<Outcome> = stream::iter(profiles)
            .map(|profile| async move {
                match self.profiles.refresh_token(&profile).await {
                    Ok(_) => Outcome::Refreshed,
                    Err(e) => {
                        tracing::warn!(profile_id = %profile.id, error = %e, "Token refresh failed");
                        self.clear_if_bad_token(&profile, &e).await
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_REFRESHES)
            .collect()
            .await;

        let report = tally(outcomes);
        tracing::info!(
            refreshed = report.refreshed,
            failed = report.failed,
            tokens_cleared = report.tokens_cleared,
            "Token refresh complete"
        );
        Ok(report)
    }

    async fn refresh_one_feed(&self, profile: Profile, limit: Option<usize>) -> Outcome {
        let error = match self.profiles.refresh_feed(&profile, limit).await {
            Ok(_) => return Outcome::Refreshed,
            Err(e) => e,
        };

        tracing::warn!(profile_id = %profile.id, error = %error, "Feed refresh failed");
        let outcome = self.clear_if_bad_token(&profile, &error).await;

        if let Some(recipient) = &self.notify_on_error {
            let has_access = self.profiles.has_access(&profile).await.unwrap_or(false);
            self.notifier
                .feed_refresh_failed(RefreshFailure {
                    recipient,
                    profile: &profile,
                    has_access,
                    error: &error,
                })
                .await;
        }

        outcome
    }

    async fn clear_if_bad_token(&self, profile: &Profile, error: &AppError) -> Outcome {
        if !error.is_bad_token() {
            return Outcome::Failed;
        }
        match self.profiles.clear_token(profile).await {
            Ok(()) => Outcome::Cleared,
            Err(e) => {
                tracing::error!(profile_id = %profile.id, error = %e, "Failed to clear bad token");
                Outcome::Failed
            }
        }
    }

    async fn connected_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let mut connected = Vec::new();
        for profile in self.profiles.list_profiles().await? {
            if self.profiles.has_access(&profile).await? {
                connected.push(profile);
            }
        }
        Ok(connected)
    }
}

fn tally(outcomes: Vec<Outcome>) -> RefreshReport {
    let mut report = RefreshReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Refreshed => report.refreshed += 1,
            Outcome::Failed => report.failed += 1,
            Outcome::Cleared => {
                report.failed += 1;
                report.tokens_cleared += 1;
            }
        }
    }
    report
}
