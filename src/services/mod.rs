// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod feed;
pub mod instagram;
pub mod media_parser;
pub mod profile;
pub mod refresh;

pub use feed::{fetch_media, FeedOptions};
pub use instagram::InstagramClient;
pub use media_parser::parse_item;
pub use profile::{AuthCallback, ProfileService, ProfileSummary};
pub use refresh::{FailureNotifier, FeedRefresher, LogNotifier, RefreshFailure, RefreshReport};
