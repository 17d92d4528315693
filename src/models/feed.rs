// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Cached and returned feeds.

use serde::{Deserialize, Serialize};

use crate::models::MediaVariant;

/// A profile's realized feed as held in the cache. No TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFeed {
    pub profile_id: String,
    /// Newest first
    pub items: Vec<MediaVariant>,
    /// When the feed was fetched (ISO 8601)
    pub cached_at: String,
}

/// Feed handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    /// Owning profile, `None` for the empty feed
    pub profile_id: Option<String>,
    pub items: Vec<MediaVariant>,
}

impl Feed {
    pub fn new(profile_id: impl Into<String>, items: Vec<MediaVariant>) -> Self {
        Self {
            profile_id: Some(profile_id.into()),
            items,
        }
    }

    /// Feed for a profile without access, or one whose fetch failed.
    pub fn empty() -> Self {
        Self {
            profile_id: None,
            items: Vec::new(),
        }
    }
}

impl From<CachedFeed> for Feed {
    fn from(cached: CachedFeed) -> Self {
        Self::new(cached.profile_id, cached.items)
    }
}
