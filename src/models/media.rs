// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Parsed Instagram media, ready for display and caching.

use serde::{Deserialize, Serialize};

/// Kind of a single piece of media (a post or a carousel child).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

/// Fields shared by every media variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Instagram media ID
    pub id: String,
    /// Media URL (for carousels, the representative child's URL)
    pub url: String,
    /// Post caption, empty when the post has none
    pub caption: String,
    /// Link to the post on instagram.com
    pub permalink: String,
    /// Publish time as reported by Instagram, empty when absent
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMedia {
    #[serde(flatten)]
    pub info: MediaInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMedia {
    #[serde(flatten)]
    pub info: MediaInfo,
    pub thumbnail_url: String,
}

/// A multi-item post, represented by its first kept child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarouselMedia {
    #[serde(flatten)]
    pub info: MediaInfo,
    /// Type of the representative child
    pub media_type: MediaType,
    pub thumbnail_url: String,
    /// Kept children, in the order Instagram returned them
    pub children: Vec<CarouselChild>,
}

/// Lightweight carousel entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarouselChild {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    pub id: String,
}

/// One parsed feed item.
///
/// Wire shape: carousels serialize as `"type": "carousel"` with the first
/// kept child's kind in `media_type`, not as that child's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaVariant {
    Image(ImageMedia),
    Video(VideoMedia),
    Carousel(CarouselMedia),
}

impl MediaVariant {
    pub fn info(&self) -> &MediaInfo {
        match self {
            MediaVariant::Image(m) => &m.info,
            MediaVariant::Video(m) => &m.info,
            MediaVariant::Carousel(m) => &m.info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn url(&self) -> &str {
        &self.info().url
    }

    pub fn timestamp(&self) -> &str {
        &self.info().timestamp
    }

    /// Thumbnail to show in a grid. Images are their own thumbnail.
    pub fn thumbnail_url(&self) -> &str {
        match self {
            MediaVariant::Image(m) => &m.info.url,
            MediaVariant::Video(m) => &m.thumbnail_url,
            MediaVariant::Carousel(m) => &m.thumbnail_url,
        }
    }

    /// Type of the media actually displayed for this item.
    pub fn media_type(&self) -> MediaType {
        match self {
            MediaVariant::Image(_) => MediaType::Image,
            MediaVariant::Video(_) => MediaType::Video,
            MediaVariant::Carousel(m) => m.media_type,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, MediaVariant::Image(_))
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaVariant::Video(_))
    }

    pub fn is_carousel(&self) -> bool {
        matches!(self, MediaVariant::Carousel(_))
    }

    /// Carousel children; empty for single-media posts.
    pub fn children(&self) -> &[CarouselChild] {
        match self {
            MediaVariant::Carousel(m) => &m.children,
            _ => &[],
        }
    }
}
