// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Strategy-chain rate extraction.
//!
//! A page is flattened into a [`PageText`] once, then the profile selected by
//! the source's variant runs its strategies in order. The first strategy that
//! yields at least one plausible value wins; its name becomes the
//! `variant:strategy` tag on the result.

pub mod page;
pub mod patterns;
pub mod profiles;
pub mod strategies;

pub use page::{DataAttrs, PageText};
pub use profiles::profile_for;
pub use strategies::{Ctx, Extractor};

use crate::normalize::{NumberStyle, RateBand};
use crate::types::{FetchMode, RawExtraction, SourceDescriptor};
use tracing::debug;

/// Ordered strategy chain plus the number parser it uses.
#[derive(Debug, Clone)]
pub struct ExtractorProfile {
    pub tag: &'static str,
    pub chain: Vec<Extractor>,
    pub numbers: NumberStyle,
}

impl ExtractorProfile {
    /// Run the chain, stopping at the first hit.
    pub fn run(&self, page: &PageText, band: &RateBand) -> RawExtraction {
        let ctx = Ctx {
            page,
            band,
            numbers: self.numbers,
        };
        for extractor in &self.chain {
            if let Some((buy, sell)) = extractor.apply(&ctx) {
                return RawExtraction {
                    buy,
                    sell,
                    strategy: format!("{}:{}", self.tag, extractor.name()),
                };
            }
        }
        RawExtraction::miss()
    }

    /// Every strategy's result, for diagnostics.
    pub fn trace(&self, page: &PageText, band: &RateBand) -> Vec<RawExtraction> {
        let ctx = Ctx {
            page,
            band,
            numbers: self.numbers,
        };
        self.chain
            .iter()
            .map(|extractor| {
                let (buy, sell) = extractor.apply(&ctx).unwrap_or((None, None));
                RawExtraction {
                    buy,
                    sell,
                    strategy: format!("{}:{}", self.tag, extractor.name()),
                }
            })
            .collect()
    }
}

/// Extract from raw markup fetched over plain HTTP.
pub fn extract_static(source: &SourceDescriptor, html: &str, band: &RateBand) -> RawExtraction {
    let page = PageText::from_html(html);
    let result = profile_for(source.variant, FetchMode::Static).run(&page, band);
    debug!(source = %source.name, strategy = %result.strategy, buy = ?result.buy, sell = ?result.sell, "static extraction");
    result
}

/// Extract from a rendered page's markup and rendered text.
pub fn extract_rendered(
    source: &SourceDescriptor,
    html: &str,
    inner_text: &str,
    band: &RateBand,
) -> RawExtraction {
    let page = PageText::from_rendered(html, inner_text);
    let result = profile_for(source.variant, FetchMode::Rendered).run(&page, band);
    debug!(source = %source.name, strategy = %result.strategy, buy = ?result.buy, sell = ?result.sell, "rendered extraction");
    result
}
