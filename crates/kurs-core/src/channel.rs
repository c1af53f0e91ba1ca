// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Secondary source: a public messaging channel that posts a daily list of
//! bank rates, read through its web preview page.
//!
//! A post looks roughly like
//!
//! ```text
//! 16.10.2026 dollar kursi
//! Sotib olish:
//! Hamkorbank — 12 150
//! Ipak Yo'li Bank — 12 140
//! Sotish:
//! Hamkorbank — 12 280
//! ```
//!
//! Lines that carry two figures (`Kapitalbank 12 130 / 12 250`) are read as
//! a full pair regardless of section.

use crate::extract::PageText;
use crate::normalize::{numeric_tokens, NumberStyle, RateBand};
use crate::registry::Registry;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::debug;

static MESSAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".tgme_widget_message").expect("valid selector"));
static MESSAGE_TEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".tgme_widget_message_text").expect("valid selector"));
static MESSAGE_TIME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("valid selector"));

static RATE_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)kurs|курс|dollar|доллар|usd").expect("valid regex"));
static BUY_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)sotib\s*olish|\bolish\b|покупк|\bbuy").expect("valid regex")
});
static SELL_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)sotish|продаж|\bsell").expect("valid regex"));
static LEADING_JUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\p{L}]+").expect("valid regex"));
static TRAILING_JUNK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N})]+$").expect("valid regex"));

/// `dd.mm.yyyy`, the date format used in posts and in snapshots.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// One message from the channel preview page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPost {
    pub text: String,
    pub published: Option<DateTime<FixedOffset>>,
}

/// Posts in page order (oldest first, as the preview lists them).
pub fn parse_posts(html: &str) -> Vec<ChannelPost> {
    let document = Html::parse_document(html);
    document
        .select(&MESSAGE)
        .filter_map(|message| {
            let body = message.select(&MESSAGE_TEXT).next()?;
            let text = PageText::from_html(&body.inner_html()).lines.join("\n");
            if text.is_empty() {
                return None;
            }
            let published = message
                .select(&MESSAGE_TIME)
                .next()
                .and_then(|t| t.value().attr("datetime"))
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok());
            Some(ChannelPost { text, published })
        })
        .collect()
}

/// The newest post stamped with `today`, else with yesterday, else the newest
/// post that mentions the rate keyword.
pub fn select_post(posts: &[ChannelPost], today: NaiveDate) -> Option<&ChannelPost> {
    let stamped = |date: NaiveDate| {
        let stamp = date_stamp(date);
        posts.iter().rev().find(|p| p.text.contains(&stamp))
    };
    stamped(today)
        .or_else(|| stamped(today - Duration::days(1)))
        .or_else(|| posts.iter().rev().find(|p| RATE_KEYWORD.is_match(&p.text)))
}

/// Maps the names used in the channel to canonical registry names.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    exact: HashMap<String, String>,
    stem: HashMap<String, String>,
}

/// Spellings seen in channel posts that do not reduce to a registry name.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("Ipak Yo'li Bank", "Ipak Yo'li Banki"),
    ("Ipak Yuli Bank", "Ipak Yo'li Banki"),
    ("Ипак Йули", "Ipak Yo'li Banki"),
    ("NBU", "NBU (UzNatsbank)"),
    ("Milliy bank", "NBU (UzNatsbank)"),
    ("UzNatsbank", "NBU (UzNatsbank)"),
    ("Нацбанк", "NBU (UzNatsbank)"),
    ("SQB", "SanoatQurilishBank"),
    ("Uzpromstroybank", "SanoatQurilishBank"),
    ("Halk bank", "Xalq Banki"),
    ("Xalq bank", "Xalq Banki"),
    ("Trustbank", "Trastbank"),
    ("MKBank", "Microcreditbank"),
    ("Mikrokreditbank", "Microcreditbank"),
    ("OFB", "Orient Finans Bank"),
    ("Orient Finance", "Orient Finans Bank"),
    ("AAB", "Asia Alliance Bank"),
    ("Asia Alliance", "Asia Alliance Bank"),
    ("KDB", "KDB Bank Uzbekistan"),
    ("Anorbank", "ANOR BANK"),
    ("Apex bank", "APEXBANK"),
    ("Davr bank", "DavrBank"),
    ("Madad Invest", "Madad Invest Bank"),
    ("Hamkor bank", "Hamkorbank"),
    ("Хамкорбанк", "Hamkorbank"),
    ("Капиталбанк", "Kapitalbank"),
    ("Агробанк", "Agrobank"),
    ("Асакабанк", "Asakabank"),
    ("Saderat", "SaderatBank"),
    ("Ziraat", "Ziraat Bank"),
];

/// Lowercased letters and digits only.
fn key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Key without a trailing "bank"/"banki"/"банк".
fn stem(name: &str) -> String {
    let k = key(name);
    for suffix in ["banki", "bank", "банки", "банк"] {
        if let Some(s) = k.strip_suffix(suffix) {
            if !s.is_empty() {
                return s.to_string();
            }
        }
    }
    k
}

impl AliasTable {
    /// Registry names plus the built-in alias list.
    pub fn for_registry(registry: &Registry) -> Self {
        let mut table = Self::default();
        for name in registry.names() {
            table.insert(&name, &name);
        }
        for (alias, canonical) in BUILTIN_ALIASES {
            if registry.get(canonical).is_some() {
                table.insert(alias, canonical);
            }
        }
        table
    }

    pub fn insert(&mut self, alias: &str, canonical: &str) {
        self.exact.insert(key(alias), canonical.to_string());
        self.stem
            .entry(stem(alias))
            .or_insert_with(|| canonical.to_string());
    }

    /// Canonical name for `raw`, if it is known.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.exact
            .get(&key(raw))
            .or_else(|| self.stem.get(&stem(raw)))
            .map(String::as_str)
    }
}

/// Buy and sell quotes from one post, keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelQuotes {
    pub buy: HashMap<String, i64>,
    pub sell: HashMap<String, i64>,
}

impl ChannelQuotes {
    pub fn quote(&self, name: &str) -> (Option<i64>, Option<i64>) {
        (self.buy.get(name).copied(), self.sell.get(name).copied())
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty() && self.sell.is_empty()
    }

    /// Number of distinct sources quoted.
    pub fn len(&self) -> usize {
        let mut names: Vec<&String> = self.buy.keys().chain(self.sell.keys()).collect();
        names.sort();
        names.dedup();
        names.len()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Unknown,
    Buy,
    Sell,
}

/// Read per-source quotes from a post's text.
pub fn parse_quotes(text: &str, aliases: &AliasTable, band: &RateBand) -> ChannelQuotes {
    let mut quotes = ChannelQuotes::default();
    let mut section = Section::Unknown;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        // Dates and other out-of-band figures do not make a line a quote.
        let first_rate = numeric_tokens(line).find(|t| band.parse_number(t).is_some());
        let Some(token) = first_rate else {
            let is_buy = BUY_SECTION.is_match(line);
            let is_sell = SELL_SECTION.is_match(line);
            if is_buy && !is_sell {
                section = Section::Buy;
            } else if is_sell && !is_buy {
                section = Section::Sell;
            }
            continue;
        };

        let split = line.find(token).unwrap_or(line.len());
        let raw_name = clean_name(&line[..split]);
        if raw_name.is_empty() {
            continue;
        }
        let Some(name) = aliases.resolve(&raw_name) else {
            debug!(name = %raw_name, "channel name not in registry");
            continue;
        };
        let values = band.token_values(&line[split..], NumberStyle::Locale, true);
        match (values.as_slice(), section) {
            ([buy, sell, ..], _) => {
                quotes.buy.entry(name.to_string()).or_insert(*buy);
                quotes.sell.entry(name.to_string()).or_insert(*sell);
            }
            ([v], Section::Buy) => {
                quotes.buy.entry(name.to_string()).or_insert(*v);
            }
            ([v], Section::Sell) => {
                quotes.sell.entry(name.to_string()).or_insert(*v);
            }
            _ => {}
        }
    }
    quotes
}

fn clean_name(raw: &str) -> String {
    let s = LEADING_JUNK.replace(raw, "");
    TRAILING_JUNK.replace(&s, "").trim().to_string()
}
