// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod feed;
pub mod media;
pub mod profile;

pub use feed::{CachedFeed, Feed};
pub use media::{CarouselChild, CarouselMedia, ImageMedia, MediaInfo, MediaType, MediaVariant, VideoMedia};
pub use profile::{AccessToken, Profile};
