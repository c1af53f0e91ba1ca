// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fetch the channel preview page and turn the relevant post into quotes.

use super::http_client::HttpClient;
use chrono::NaiveDate;
use kurs_core::channel::{parse_posts, parse_quotes, select_post};
use kurs_core::{AliasTable, ChannelQuotes, KursResult, RateBand};
use tracing::{debug, info};

/// Quotes from the post chosen for `today`. Empty when the page has no
/// suitable post.
pub async fn fetch_quotes(
    client: &HttpClient,
    url: &str,
    aliases: &AliasTable,
    band: &RateBand,
    today: NaiveDate,
) -> KursResult<ChannelQuotes> {
    let html = client.get_text(url).await?;
    Ok(quotes_from_page(&html, aliases, band, today))
}

/// Synchronous half of [`fetch_quotes`]; parsed markup never crosses an
/// await point.
pub fn quotes_from_page(
    html: &str,
    aliases: &AliasTable,
    band: &RateBand,
    today: NaiveDate,
) -> ChannelQuotes {
    let posts = parse_posts(html);
    let Some(post) = select_post(&posts, today) else {
        info!(posts = posts.len(), "no channel post with rates");
        return ChannelQuotes::default();
    };
    debug!(published = ?post.published, "selected channel post");
    parse_quotes(&post.text, aliases, band)
}
