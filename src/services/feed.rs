// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feed fetching: paginate to a limit, parse, sort, truncate.
//!
//! Handles the core workflow:
//! 1. Pick a page size that reaches the limit in the fewest requests
//! 2. Follow `next` links until the limit is passed or pages run out
//! 3. Parse every raw item (dropping skipped media)
//! 4. Sort newest first and truncate to the limit
//!
//! Pagination stops once the raw count *exceeds* the limit, so it can
//! overshoot by one page; truncation fixes that up. Sorting happens after
//! all pages are merged because filtered pages are not in strict global
//! order.

use std::cmp::Reverse;

use crate::error::{AppError, Result};
use crate::models::{AccessToken, MediaVariant};
use crate::services::instagram::InstagramClient;
use crate::services::media_parser::parse_item;
use crate::time_utils::parse_media_timestamp;

/// Largest page Instagram will return.
pub const MAX_PAGE_SIZE: usize = 100;

/// Beyond this limit pages are always full-size.
const EVEN_SPLIT_CEILING: usize = 1000;

/// Options that shape a fetched feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedOptions {
    /// Drop videos, and carousels left with no images
    pub ignore_video: bool,
}

/// Number of items to request per page for a given limit.
///
/// Spreads the limit evenly over the minimum number of pages.
pub fn page_size(limit: Option<usize>) -> usize {
    match limit {
        None => MAX_PAGE_SIZE,
        Some(n) if n > EVEN_SPLIT_CEILING => MAX_PAGE_SIZE,
        Some(n) if n <= MAX_PAGE_SIZE => n,
        Some(n) => {
            let pages = n.div_ceil(MAX_PAGE_SIZE);
            n.div_ceil(pages)
        }
    }
}

/// Fetch up to `limit` media items (all items when `None`) for a token.
///
/// Any failed page aborts the fetch; nothing partial is returned.
pub async fn fetch_media(
    client: &InstagramClient,
    token: &AccessToken,
    limit: Option<usize>,
    options: FeedOptions,
) -> Result<Vec<MediaVariant>> {
    if limit == Some(0) {
        return Ok(Vec::new());
    }

    let size = page_size(limit);
    let mut page = client
        .fetch_media_page(&token.access_code, &token.user_id, size)
        .await?;
    let mut raw = std::mem::take(&mut page.data);
    let mut pages = 1u32;

    while let Some(next) = page.next_url().map(str::to_owned) {
        if limit.is_some_and(|l| raw.len() > l) {
            break;
        }

        page = client.fetch_media_page_url(&next).await?;
        pages += 1;

        // A page with nothing on it makes no progress.
        if page.data.is_empty() {
            break;
        }
        raw.append(&mut page.data);
    }

    let fetched = raw.len();
    let mut items = raw
        .iter()
        .map(|item| parse_item(item, options.ignore_video))
        .collect::<std::result::Result<Vec<_>, AppError>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    sort_newest_first(&mut items);
    if let Some(l) = limit {
        items.truncate(l);
    }

    tracing::debug!(
        profile_id = %token.profile_id,
        pages,
        page_size = size,
        fetched,
        kept = items.len(),
        "Fetched media"
    );

    Ok(items)
}

/// Stable sort by timestamp, newest first. Missing timestamps sort last.
pub fn sort_newest_first(items: &mut [MediaVariant]) {
    items.sort_by_key(|item| Reverse(parse_media_timestamp(item.timestamp())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageMedia, MediaInfo};

    #[test]
    fn test_page_size_small_limits() {
        assert_eq!(page_size(Some(7)), 7);
        assert_eq!(page_size(Some(1)), 1);
        assert_eq!(page_size(Some(100)), 100);
    }

    #[test]
    fn test_page_size_splits_evenly() {
        assert_eq!(page_size(Some(250)), 84);
        assert_eq!(page_size(Some(101)), 51);
        assert_eq!(page_size(Some(200)), 100);
        assert_eq!(page_size(Some(1000)), 100);
        assert_eq!(page_size(Some(999)), 100);
        assert_eq!(page_size(Some(301)), 76);
    }

    #[test]
    fn test_page_size_unbounded() {
        assert_eq!(page_size(None), 100);
        assert_eq!(page_size(Some(1001)), 100);
        assert_eq!(page_size(Some(50_000)), 100);
    }

    fn image(id: &str, timestamp: &str) -> MediaVariant {
        MediaVariant::Image(ImageMedia {
            info: MediaInfo {
                id: id.to_string(),
                url: format!("https://cdn.test/{}.jpg", id),
                caption: String::new(),
                permalink: format!("https://www.instagram.com/p/{}/", id),
                timestamp: timestamp.to_string(),
            },
        })
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let mut items = vec![
            image("old", "2020-01-01T00:00:00+0000"),
            image("tie-a", "2021-06-01T00:00:00+0000"),
            image("none", ""),
            image("new", "2022-01-01T00:00:00+0000"),
            image("tie-b", "2021-06-01T00:00:00+0000"),
        ];

        sort_newest_first(&mut items);

        let ids: Vec<&str> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["new", "tie-a", "tie-b", "old", "none"]);
    }

    #[test]
    fn test_sort_compares_instants_across_offsets() {
        let mut items = vec![
            image("utc", "2021-06-01T10:00:00+0000"),
            image("ahead", "2021-06-01T11:30:00+0200"),
        ];

        sort_newest_first(&mut items);

        // 11:30+02:00 is 09:30 UTC, so it is older
        assert_eq!(items[0].id(), "utc");
    }
}
