// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Strategy orderings per extractor variant.

use super::patterns::{other_currency_sentinel, re, CurrencyMatcher, Keywords, NUM};
use super::strategies::*;
use super::ExtractorProfile;
use crate::normalize::NumberStyle;
use crate::types::{ExtractorVariant, FetchMode};
use once_cell::sync::Lazy;

static STATIC_MARKUP: Lazy<ExtractorProfile> = Lazy::new(static_markup);
static GENERIC: Lazy<ExtractorProfile> = Lazy::new(generic);
static HAMKOR: Lazy<ExtractorProfile> = Lazy::new(hamkor);
static TBC: Lazy<ExtractorProfile> = Lazy::new(tbc);
static ASAKA: Lazy<ExtractorProfile> = Lazy::new(asaka);
static HAYOT: Lazy<ExtractorProfile> = Lazy::new(hayot);
static BRB: Lazy<ExtractorProfile> = Lazy::new(brb);
static EXTENDED: Lazy<ExtractorProfile> = Lazy::new(extended);

/// The profile applied to a page of `variant` acquired via `mode`.
///
/// Statically fetched markup always goes through the markup profile; the
/// per-variant quirks describe what the browser renders.
pub fn profile_for(variant: ExtractorVariant, mode: FetchMode) -> &'static ExtractorProfile {
    if mode == FetchMode::Static {
        return &STATIC_MARKUP;
    }
    match variant {
        ExtractorVariant::Generic => &GENERIC,
        ExtractorVariant::Hamkor => &HAMKOR,
        ExtractorVariant::Tbc => &TBC,
        ExtractorVariant::Asaka => &ASAKA,
        ExtractorVariant::Hayot => &HAYOT,
        ExtractorVariant::Brb => &BRB,
        ExtractorVariant::Extended => &EXTENDED,
    }
}

fn usd_anchor() -> regex::Regex {
    re(r"(?i)\bUSD\b")
}

fn full_scan(before: usize, after: usize, min_values: usize) -> Extractor {
    Extractor::FullScan(FullScanExtractor {
        anchors: vec![usd_anchor()],
        before,
        after,
        min_values,
        skip_cb: true,
        strip: None,
        every_occurrence: false,
    })
}

fn static_markup() -> ExtractorProfile {
    let currency = CurrencyMatcher::static_markup();
    ExtractorProfile {
        tag: "static",
        numbers: NumberStyle::Locale,
        chain: vec![
            Extractor::Table(TableExtractor {
                keywords: Keywords::static_markup(),
                currency: currency.clone(),
                skip_cb: true,
                fallback: RowFallback::FirstAndLast,
                row_filter: None,
                first_currency_row_only: false,
            }),
            Extractor::Inline(InlineExtractor {
                currency,
                skip_cb: true,
            }),
            Extractor::LabelRegex(LabelRegexExtractor {
                buy: re(&format!(
                    r"(?i)(?:sotib\s*olish|покупка|olish\s*kursi|xarid)\s*[:\-–]?\s*{NUM}"
                )),
                sell: re(&format!(
                    r"(?i)(?:sotish|продажа|sotish\s*kursi|sotuv)\s*[:\-–]?\s*{NUM}"
                )),
            }),
            Extractor::ScriptJson(ScriptJsonExtractor::standard(false)),
            Extractor::FullScan(FullScanExtractor {
                anchors: vec![
                    usd_anchor(),
                    re(r"(?i)Доллар\s*США"),
                    re(r"(?i)\bDollar\b"),
                    re(r"(?i)АҚШ\s*доллари"),
                    re(r"(?i)Доллар"),
                ],
                before: 0,
                after: 600,
                min_values: 2,
                skip_cb: true,
                strip: None,
                every_occurrence: true,
            }),
        ],
    }
}

fn generic() -> ExtractorProfile {
    let keywords = Keywords::generic();
    let currency = CurrencyMatcher::rendered();
    ExtractorProfile {
        tag: "generic",
        numbers: NumberStyle::Locale,
        chain: vec![
            Extractor::Table(TableExtractor {
                keywords: keywords.clone(),
                currency: currency.clone(),
                skip_cb: true,
                fallback: RowFallback::FirstTwo,
                row_filter: None,
                first_currency_row_only: false,
            }),
            Extractor::Inline(InlineExtractor {
                currency: currency.clone(),
                skip_cb: true,
            }),
            Extractor::Proximity(ProximityExtractor {
                currency,
                before: 2,
                after: 20,
                skip_cb: true,
                sentinel: Some(other_currency_sentinel()),
                tokens: true,
            }),
            Extractor::LabelText(LabelTextExtractor {
                buy: keywords.buy,
                sell: keywords.sell,
                window: 7,
                skip_cb: true,
                tokens: true,
            }),
            Extractor::LabelRegex(LabelRegexExtractor {
                buy: re(&format!(
                    r"(?i)(?:sotib\s*olish|покупка|olish\s*kursi|xarid)\s*[:\-–]?\s*{NUM}"
                )),
                sell: re(&format!(
                    r"(?i)(?:sotish|продажа|sotish\s*kursi|sotuv)\s*[:\-–]?\s*{NUM}"
                )),
            }),
            Extractor::ScriptJson(ScriptJsonExtractor::standard(false)),
            Extractor::DataAttributes(DataAttributeExtractor {
                currency_scoped: false,
            }),
            full_scan(200, 800, 1),
        ],
    }
}

fn hamkor() -> ExtractorProfile {
    ExtractorProfile {
        tag: "hamkor",
        numbers: NumberStyle::Strict,
        chain: vec![
            Extractor::Table(TableExtractor {
                keywords: Keywords::hamkor(),
                currency: CurrencyMatcher::loose(r"(?i)USD|Доллар\s*США|АҚШ\s*доллари"),
                skip_cb: true,
                fallback: RowFallback::FirstTwo,
                row_filter: None,
                first_currency_row_only: false,
            }),
            Extractor::LabelText(LabelTextExtractor {
                buy: re(r"(?i)^(купить|покупка)$"),
                sell: re(r"(?i)^(продать|продажа)$"),
                window: 3,
                skip_cb: true,
                tokens: false,
            }),
            Extractor::PairRegex(PairRegexExtractor {
                pattern: re(&format!(r"(?i)купить\s+{NUM}[\s\S]{{0,30}}?продать\s+{NUM}")),
            }),
            full_scan(50, 300, 1),
        ],
    }
}

fn tbc() -> ExtractorProfile {
    let currency = CurrencyMatcher::simple();
    ExtractorProfile {
        tag: "tbc",
        numbers: NumberStyle::Strict,
        chain: vec![
            Extractor::Table(TableExtractor {
                keywords: Keywords::tbc(),
                currency: currency.clone(),
                skip_cb: true,
                fallback: RowFallback::FirstTwo,
                row_filter: None,
                first_currency_row_only: false,
            }),
            Extractor::DataAttributes(DataAttributeExtractor {
                currency_scoped: true,
            }),
            Extractor::Inline(InlineExtractor {
                currency,
                skip_cb: true,
            }),
            Extractor::LabelText(LabelTextExtractor {
                buy: re(r"(?i)(sotib\s*olish|покупка|buying\s*rate|olish)"),
                sell: re(r"(?i)(sotish|продажа|selling\s*rate)"),
                window: 5,
                skip_cb: true,
                tokens: true,
            }),
            Extractor::ScriptJson(ScriptJsonExtractor::standard(true)),
            full_scan(100, 500, 1),
        ],
    }
}

fn asaka() -> ExtractorProfile {
    ExtractorProfile {
        tag: "asaka",
        numbers: NumberStyle::Strict,
        chain: vec![
            Extractor::Proximity(ProximityExtractor {
                currency: CurrencyMatcher::exact_code(),
                before: 0,
                after: 9,
                skip_cb: true,
                sentinel: Some(other_currency_sentinel()),
                tokens: false,
            }),
            Extractor::PairRegex(PairRegexExtractor {
                pattern: re(&format!(r"USD\D{{0,20}}{NUM}\D{{0,30}}{NUM}")),
            }),
        ],
    }
}

fn hayot() -> ExtractorProfile {
    let currency = CurrencyMatcher::loose(r"(?i)USD|AQSH\s*dollari");
    ExtractorProfile {
        tag: "hayot",
        numbers: NumberStyle::Strict,
        chain: vec![
            Extractor::TabRow(TabRowExtractor {
                currency: currency.clone(),
                skip_cb: true,
            }),
            Extractor::Proximity(ProximityExtractor {
                currency,
                before: 0,
                after: 9,
                skip_cb: true,
                sentinel: Some(other_currency_sentinel()),
                tokens: true,
            }),
            Extractor::Table(TableExtractor {
                keywords: Keywords::hayot(),
                currency: CurrencyMatcher::loose(r"(?i)USD|AQSH"),
                skip_cb: true,
                fallback: RowFallback::FirstTwo,
                row_filter: None,
                first_currency_row_only: false,
            }),
        ],
    }
}

fn brb() -> ExtractorProfile {
    ExtractorProfile {
        tag: "brb",
        numbers: NumberStyle::Strict,
        chain: vec![
            Extractor::Table(TableExtractor {
                keywords: Keywords::tbc(),
                currency: CurrencyMatcher::simple(),
                skip_cb: true,
                fallback: RowFallback::None,
                row_filter: Some(re(r"(?i)BRB\s*mobile|мобильн|\bapp\b|ilova")),
                first_currency_row_only: true,
            }),
            Extractor::FullScan(FullScanExtractor {
                anchors: vec![usd_anchor()],
                before: 100,
                after: 500,
                min_values: 2,
                skip_cb: true,
                strip: Some(re(r"(?i)BRB\s*mobile[^\n]*")),
                every_occurrence: false,
            }),
        ],
    }
}

fn extended() -> ExtractorProfile {
    let keywords = Keywords::extended();
    let currency = CurrencyMatcher::simple();
    ExtractorProfile {
        tag: "extended",
        numbers: NumberStyle::Strict,
        chain: vec![
            Extractor::Table(TableExtractor {
                keywords: keywords.clone(),
                currency: currency.clone(),
                skip_cb: true,
                fallback: RowFallback::FirstTwo,
                row_filter: None,
                first_currency_row_only: false,
            }),
            Extractor::Inline(InlineExtractor {
                currency: currency.clone(),
                skip_cb: true,
            }),
            Extractor::Proximity(ProximityExtractor {
                currency,
                before: 0,
                after: 14,
                skip_cb: true,
                sentinel: Some(other_currency_sentinel()),
                tokens: true,
            }),
            Extractor::LabelText(LabelTextExtractor {
                buy: keywords.buy,
                sell: keywords.sell,
                window: 7,
                skip_cb: true,
                tokens: true,
            }),
            Extractor::ScriptJson(ScriptJsonExtractor::standard(true)),
            full_scan(100, 600, 1),
        ],
    }
}
