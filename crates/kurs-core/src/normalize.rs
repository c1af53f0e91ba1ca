// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rate normalizer: locale-aware number parsing, the plausibility band,
//! central-bank-style detection and buy/sell order correction.
//!
//! Bank pages write the same figure as `12 140`, `12,140`, `12140.00`,
//! `12 140 so'm` or `12 140,00 сум`. Official reference rates show up next
//! to commercial quotes written with two significant decimals
//! (`12 236,13`); those must never be taken for a buy or sell price.

use crate::types::{KursError, KursResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

static CURRENCY_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)so['‘’`ʻ]?m|сўм|сумов|сум|uzs").expect("valid regex"));

static SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\u{a0}\u{202f}\u{2009}'`’]").expect("valid regex"));

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d[\d.,]*").expect("valid regex"));

static CB_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.,](\d{2})$").expect("valid regex"));

static NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?0[.,]?0*$").expect("valid regex"));

/// Grouped (`12 140`, `12,140`) or plain (`12140`) numbers with an optional
/// short decimal tail.
static NUMERIC_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:\d{1,3}(?:[ \u{a0}\u{202f}\u{2009},]\d{3})+(?:[.,]\d{1,2})?|\d{4,7}(?:[.,]\d{1,2})?)\b",
    )
    .expect("valid regex")
});

/// Which number parser an extractor profile applies to candidate text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberStyle {
    /// [`RateBand::parse_number`]: tolerant, rounds decimals.
    Locale,
    /// [`RateBand::parse_strict`]: whole numbers only.
    Strict,
}

/// The `[min, max]` range a commercial rate must fall within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBand {
    pub min: i64,
    pub max: i64,
}

/// Result of [`RateBand::validate_and_fix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validated {
    pub buy: Option<i64>,
    pub sell: Option<i64>,
    /// Buy and sell were exchanged to restore `buy <= sell`.
    pub swapped: bool,
}

impl RateBand {
    pub fn new(min: i64, max: i64) -> KursResult<Self> {
        if min <= 0 || max <= min {
            return Err(KursError::Config(format!(
                "invalid plausibility band [{min}, {max}]"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, v: i64) -> bool {
        v >= self.min && v <= self.max
    }

    /// Parse a locale-formatted figure into an in-band integer.
    ///
    /// Strips currency words and spacing, resolves grouping vs decimal
    /// separators (a single separator followed by exactly three digits is a
    /// thousands separator), rounds, and rejects anything outside the band.
    pub fn parse_number(&self, raw: &str) -> Option<i64> {
        let cleaned = CURRENCY_WORDS.replace_all(raw, "");
        let cleaned = SPACING.replace_all(&cleaned, "");
        let prefix = LEADING_NUMBER.find(&cleaned)?.as_str();
        let value = resolve_separators(prefix)?;
        if !value.is_finite() {
            return None;
        }
        let rounded = value.round();
        if rounded < self.min as f64 || rounded > self.max as f64 {
            return None;
        }
        Some(rounded as i64)
    }

    /// Parse a whole-number figure, rejecting fractional values, noise such
    /// as `-0.00` and digit runs longer than seven characters.
    pub fn parse_strict(&self, raw: &str) -> Option<i64> {
        if is_noise_token(raw) {
            return None;
        }
        let cleaned = CURRENCY_WORDS.replace_all(raw, "");
        let cleaned = SPACING.replace_all(&cleaned, "");
        let mut s: String = LEADING_NUMBER.find(&cleaned)?.as_str().replace(',', "");
        if s.starts_with('-') {
            return None;
        }
        s = s.trim_start_matches('+').to_string();

        if let Some(dot) = s.find('.') {
            let int_part = &s[..dot];
            let frac = &s[dot + 1..];
            let joined = if frac.chars().all(|c| c == '0') {
                int_part.to_string()
            } else if frac.len() == 3 && !frac.contains('.') {
                format!("{int_part}{frac}")
            } else {
                return None;
            };
            s = joined;
        }

        if s.is_empty() || s.len() > 7 || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let v: i64 = s.parse().ok()?;
        self.contains(v).then_some(v)
    }

    pub fn parse_with(&self, style: NumberStyle, raw: &str) -> Option<i64> {
        match style {
            NumberStyle::Locale => self.parse_number(raw),
            NumberStyle::Strict => self.parse_strict(raw),
        }
    }

    /// In-band values of every numeric token in `text`, in order.
    pub fn token_values(&self, text: &str, style: NumberStyle, skip_cb: bool) -> Vec<i64> {
        numeric_tokens(text)
            .filter(|t| !(skip_cb && is_central_bank_style(t)))
            .filter_map(|t| self.parse_with(style, t))
            .collect()
    }

    /// Drop out-of-band values and restore `buy <= sell`.
    pub fn validate_and_fix(&self, name: &str, buy: Option<i64>, sell: Option<i64>) -> Validated {
        let mut b = buy.filter(|v| self.contains(*v));
        let mut s = sell.filter(|v| self.contains(*v));
        let mut swapped = false;
        if let (Some(bv), Some(sv)) = (b, s) {
            if bv > sv {
                std::mem::swap(&mut b, &mut s);
                swapped = true;
                warn!(source = %name, buy = sv, sell = bv, "buy/sell swapped");
            }
        }
        Validated {
            buy: b,
            sell: s,
            swapped,
        }
    }
}

/// Official reference rate formatting: exactly two decimal digits that are
/// not both zero, e.g. `12 236,13`. `12,140` (three-digit group) and
/// `12140.00` are not.
pub fn is_central_bank_style(raw: &str) -> bool {
    let clean = SPACING.replace_all(raw.trim(), "");
    match CB_STYLE.captures(&clean) {
        Some(caps) => caps.get(1).is_some_and(|d| d.as_str() != "00"),
        None => false,
    }
}

/// Placeholder values like `0`, `-0.00`, `+0,0` used by some SPA widgets
/// for "no change".
pub fn is_noise_token(raw: &str) -> bool {
    let clean = SPACING.replace_all(raw.trim(), "");
    !clean.is_empty() && NOISE.is_match(&clean)
}

/// Numeric-looking substrings of `text`.
pub fn numeric_tokens(text: &str) -> impl Iterator<Item = &str> {
    NUMERIC_TOKEN.find_iter(text).map(|m| m.as_str())
}

fn resolve_separators(s: &str) -> Option<f64> {
    let s = s.trim_end_matches(['.', ',']);
    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    let normalized = if dots == 0 && commas == 0 {
        s.to_string()
    } else if dots > 0 && commas > 0 {
        // Both kinds present: the last one is the decimal mark.
        let last = s.rfind(['.', ','])?;
        let (int_part, frac) = s.split_at(last);
        let int_part: String = int_part
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
            .collect();
        format!("{int_part}.{}", &frac[1..])
    } else {
        let sep = if dots > 0 { '.' } else { ',' };
        let last = s.rfind(sep)?;
        let tail = s.len() - last - 1;
        if dots + commas > 1 || tail == 3 {
            s.replace(sep, "")
        } else {
            s.replace(sep, ".")
        }
    };
    normalized.parse::<f64>().ok()
}
