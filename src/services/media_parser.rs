// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Turns raw Instagram media documents into [`MediaVariant`]s.
//!
//! The Graph API returns loosely shaped JSON; it is decoded here and
//! nowhere else. Unknown media types, ignored videos and carousels with no
//! remaining children are skipped (`Ok(None)`), not errors.

use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::{
    CarouselChild, CarouselMedia, ImageMedia, MediaInfo, MediaType, MediaVariant, VideoMedia,
};

/// `media_type` discriminator as sent by Instagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaTag {
    Image,
    Video,
    CarouselAlbum,
}

impl MediaTag {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "IMAGE" => Some(MediaTag::Image),
            "VIDEO" => Some(MediaTag::Video),
            "CAROUSEL_ALBUM" => Some(MediaTag::CarouselAlbum),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    id: String,
    permalink: String,
    #[serde(default)]
    media_url: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    children: Option<RawChildren>,
}

#[derive(Debug, Deserialize)]
struct RawChildren {
    data: Vec<RawChild>,
}

#[derive(Debug, Deserialize)]
struct RawChild {
    id: String,
    media_type: String,
    media_url: String,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

/// Parse one media document.
///
/// Returns `Ok(None)` for media that should not appear in the feed and
/// `Err(MalformedMedia)` when a recognised item lacks required fields.
pub fn parse_item(raw: &Value, ignore_video: bool) -> Result<Option<MediaVariant>, AppError> {
    let Some(tag) = raw
        .get("media_type")
        .and_then(Value::as_str)
        .and_then(MediaTag::from_tag)
    else {
        return Ok(None);
    };

    if tag == MediaTag::Video && ignore_video {
        return Ok(None);
    }

    let media = RawMedia::deserialize(raw).map_err(|e| malformed(raw, e))?;

    match tag {
        MediaTag::Image => parse_image(media).map(Some),
        MediaTag::Video => parse_video(media).map(Some),
        MediaTag::CarouselAlbum => parse_carousel(media, ignore_video),
    }
}

fn parse_image(media: RawMedia) -> Result<MediaVariant, AppError> {
    let url = require_url(&media)?;
    Ok(MediaVariant::Image(ImageMedia {
        info: info(media, url),
    }))
}

fn parse_video(mut media: RawMedia) -> Result<MediaVariant, AppError> {
    let url = require_url(&media)?;
    let thumbnail_url = media.thumbnail_url.take().unwrap_or_default();
    Ok(MediaVariant::Video(VideoMedia {
        info: info(media, url),
        thumbnail_url,
    }))
}

fn parse_carousel(
    mut media: RawMedia,
    ignore_video: bool,
) -> Result<Option<MediaVariant>, AppError> {
    let children = media.children.take().ok_or_else(|| {
        AppError::MalformedMedia(format!("carousel {} has no children", media.id))
    })?;

    let kept: Vec<(MediaType, RawChild)> = children
        .data
        .into_iter()
        .filter_map(|child| child_type(&child.media_type).map(|kind| (kind, child)))
        .filter(|(kind, _)| *kind == MediaType::Image || !ignore_video)
        .collect();

    let Some((first_type, first)) = kept.first() else {
        return Ok(None);
    };

    let media_type = *first_type;
    let url = first.media_url.clone();
    // An image child is its own thumbnail, never an empty string.
    let thumbnail_url = match media_type {
        MediaType::Image => first.media_url.clone(),
        MediaType::Video => first.thumbnail_url.clone().unwrap_or_default(),
    };

    let children = kept
        .into_iter()
        .map(|(kind, child)| CarouselChild {
            media_type: kind,
            url: child.media_url,
            id: child.id,
        })
        .collect();

    Ok(Some(MediaVariant::Carousel(CarouselMedia {
        info: info(media, url),
        media_type,
        thumbnail_url,
        children,
    })))
}

/// Carousel children only ever hold images or videos; anything else is dropped.
fn child_type(tag: &str) -> Option<MediaType> {
    match MediaTag::from_tag(tag)? {
        MediaTag::Image => Some(MediaType::Image),
        MediaTag::Video => Some(MediaType::Video),
        MediaTag::CarouselAlbum => None,
    }
}

fn info(media: RawMedia, url: String) -> MediaInfo {
    MediaInfo {
        id: media.id,
        url,
        caption: media.caption.unwrap_or_default(),
        permalink: media.permalink,
        timestamp: media.timestamp.unwrap_or_default(),
    }
}

fn require_url(media: &RawMedia) -> Result<String, AppError> {
    media
        .media_url
        .clone()
        .ok_or_else(|| AppError::MalformedMedia(format!("media {} has no media_url", media.id)))
}

fn malformed(raw: &Value, err: serde_json::Error) -> AppError {
    let id = raw.get("id").and_then(Value::as_str).unwrap_or("<unknown>");
    AppError::MalformedMedia(format!("media {}: {}", id, err))
}
