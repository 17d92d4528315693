// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Instagram-Feed: cached Instagram media feeds for named profiles
//!
//! This crate connects local profiles to Instagram accounts over OAuth,
//! fetches and normalizes their media, and serves the cached feeds over
//! HTTP. Scheduled task endpoints keep feeds and credentials fresh.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::{FeedCache, ProfileStore, TokenStore};
use error::AppError;
use services::{FailureNotifier, FeedOptions, FeedRefresher, InstagramClient, ProfileService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub profiles: ProfileService,
    pub refresher: FeedRefresher,
}

impl AppState {
    /// Wire up services over the given stores.
    pub fn new(
        config: Config,
        profiles: Arc<dyn ProfileStore>,
        tokens: Arc<dyn TokenStore>,
        cache: Arc<dyn FeedCache>,
        notifier: Arc<dyn FailureNotifier>,
    ) -> Result<Self, AppError> {
        let instagram = InstagramClient::new(&config)?;
        let options = FeedOptions {
            ignore_video: config.ignore_video,
        };

        let profiles = ProfileService::new(
            profiles,
            tokens,
            cache,
            instagram,
            options,
            config.feed_limit,
        );
        let refresher =
            FeedRefresher::new(profiles.clone(), notifier, config.notify_on_error.clone());

        Ok(Self {
            config,
            profiles,
            refresher,
        })
    }
}
