// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Extraction strategies. Each one is plain configuration interpreted over a
//! [`PageText`]; a profile is an ordered list of them.

use super::page::PageText;
use super::patterns::{CurrencyMatcher, Keywords};
use crate::normalize::{is_central_bank_style, is_noise_token, NumberStyle, RateBand};
use regex::Regex;

/// A `(buy, sell)` candidate.
pub type Pair = (Option<i64>, Option<i64>);

/// Everything a strategy needs to read a page.
pub struct Ctx<'a> {
    pub page: &'a PageText,
    pub band: &'a RateBand,
    pub numbers: NumberStyle,
}

impl Ctx<'_> {
    fn parse(&self, raw: &str) -> Option<i64> {
        self.band.parse_with(self.numbers, raw)
    }

    fn tokens(&self, text: &str, skip_cb: bool) -> Vec<i64> {
        self.band.token_values(text, self.numbers, skip_cb)
    }
}

fn hit(pair: Pair) -> Option<Pair> {
    (pair.0.is_some() || pair.1.is_some()).then_some(pair)
}

fn pair_of(values: &[i64]) -> Pair {
    (values.first().copied(), values.get(1).copied())
}

fn push_unique(values: &mut Vec<i64>, v: i64) {
    if !values.contains(&v) {
        values.push(v);
    }
}

/// What a currency row yields when no header columns were identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFallback {
    None,
    /// First two plausible values in the row.
    FirstTwo,
    /// First and last plausible values in the row.
    FirstAndLast,
}

/// Header-aware table reading.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    pub keywords: Keywords,
    pub currency: CurrencyMatcher,
    pub skip_cb: bool,
    pub fallback: RowFallback,
    /// Rows matching this are ignored (e.g. mobile-app rates).
    pub row_filter: Option<Regex>,
    /// Only the first currency row of each table is considered.
    pub first_currency_row_only: bool,
}

impl TableExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        for table in &ctx.page.tables {
            let mut header: Option<(Option<usize>, Option<usize>, usize)> = None;
            let mut seen_currency_row = false;

            for row in table {
                let joined = row.join(" | ");
                if self.keywords.buy.is_match(&joined) && self.keywords.sell.is_match(&joined) {
                    let buy_col = row.iter().position(|c| self.keywords.buy.is_match(c));
                    let sell_col = row.iter().position(|c| self.keywords.sell.is_match(c));
                    header = Some((buy_col, sell_col, row.len()));
                    continue;
                }
                if self.row_filter.as_ref().is_some_and(|f| f.is_match(&joined)) {
                    continue;
                }
                if !row.iter().any(|c| self.currency.is_match(c)) {
                    continue;
                }
                if self.first_currency_row_only {
                    if seen_currency_row {
                        continue;
                    }
                    seen_currency_row = true;
                }

                if let Some((buy_col, sell_col, header_len)) = header {
                    let offset = self.column_offset(ctx, row, buy_col, sell_col, header_len);
                    let read = |col: Option<usize>| {
                        col.and_then(|i| row.get(i + offset))
                            .filter(|c| !(self.skip_cb && is_central_bank_style(c)))
                            .and_then(|c| ctx.parse(c))
                    };
                    if let Some(pair) = hit((read(buy_col), read(sell_col))) {
                        return Some(pair);
                    }
                }

                if let Some(pair) = self.fallback_values(ctx, row) {
                    return Some(pair);
                }
            }
        }
        None
    }

    /// When the header row lacks the leading label cells of the data rows,
    /// shift header columns so they line up with the first commercial
    /// numeric cell. Central-bank-style cells never anchor the shift.
    fn column_offset(
        &self,
        ctx: &Ctx<'_>,
        row: &[String],
        buy_col: Option<usize>,
        sell_col: Option<usize>,
        header_len: usize,
    ) -> usize {
        if row.len() <= header_len {
            return 0;
        }
        let first_col = match (buy_col, sell_col) {
            (Some(b), Some(s)) => b.min(s),
            (Some(c), None) | (None, Some(c)) => c,
            (None, None) => return 0,
        };
        row.iter()
            .position(|c| !is_central_bank_style(c) && ctx.parse(c).is_some())
            .map(|first_numeric| first_numeric.saturating_sub(first_col))
            .unwrap_or(0)
    }

    fn fallback_values(&self, ctx: &Ctx<'_>, row: &[String]) -> Option<Pair> {
        if self.fallback == RowFallback::None {
            return None;
        }
        let mut values = Vec::new();
        for cell in row {
            if self.skip_cb && is_central_bank_style(cell) {
                continue;
            }
            let tokens = ctx.tokens(cell, self.skip_cb);
            if tokens.is_empty() {
                values.extend(ctx.parse(cell));
            } else {
                values.extend(tokens);
            }
        }
        let pair = match (self.fallback, values.as_slice()) {
            (_, []) => return None,
            (RowFallback::FirstAndLast, [first, .., last]) => (Some(*first), Some(*last)),
            _ => pair_of(&values),
        };
        hit(pair)
    }
}

/// A currency line that itself carries both figures.
#[derive(Debug, Clone)]
pub struct InlineExtractor {
    pub currency: CurrencyMatcher,
    pub skip_cb: bool,
}

impl InlineExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        ctx.page
            .lines
            .iter()
            .filter(|l| self.currency.is_match(l))
            .map(|l| ctx.tokens(l, self.skip_cb))
            .find(|v| v.len() >= 2)
            .map(|v| pair_of(&v))
    }
}

/// Figures on the lines around a currency identifier line.
#[derive(Debug, Clone)]
pub struct ProximityExtractor {
    pub currency: CurrencyMatcher,
    /// Lines scanned before the identifier.
    pub before: usize,
    /// Lines scanned after the identifier.
    pub after: usize,
    pub skip_cb: bool,
    /// A line naming another currency ends the window.
    pub sentinel: Option<Regex>,
    /// Also scan numeric tokens inside longer lines.
    pub tokens: bool,
}

impl ProximityExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        let lines = &ctx.page.lines;
        for (i, line) in lines.iter().enumerate() {
            if !self.currency.is_match(line) {
                continue;
            }
            let mut found = Vec::new();
            for prev in &lines[i.saturating_sub(self.before)..i] {
                if self.is_sentinel(prev) {
                    found.clear();
                    continue;
                }
                self.collect(ctx, prev, &mut found);
            }
            let end = (i + 1 + self.after).min(lines.len());
            for next in &lines[i + 1..end] {
                if found.len() >= 2 || self.is_sentinel(next) {
                    break;
                }
                self.collect(ctx, next, &mut found);
            }
            if let Some(pair) = hit(pair_of(&found)) {
                return Some(pair);
            }
        }
        None
    }

    fn is_sentinel(&self, line: &str) -> bool {
        self.sentinel.as_ref().is_some_and(|s| s.is_match(line))
    }

    fn collect(&self, ctx: &Ctx<'_>, line: &str, found: &mut Vec<i64>) {
        if is_noise_token(line) || (self.skip_cb && is_central_bank_style(line)) {
            return;
        }
        if let Some(v) = ctx.parse(line) {
            push_unique(found, v);
        } else if self.tokens {
            for v in ctx.tokens(line, self.skip_cb) {
                if found.len() >= 2 {
                    break;
                }
                push_unique(found, v);
            }
        }
    }
}

/// Buy and sell labels each followed, within a few lines, by a figure.
#[derive(Debug, Clone)]
pub struct LabelTextExtractor {
    pub buy: Regex,
    pub sell: Regex,
    pub window: usize,
    pub skip_cb: bool,
    pub tokens: bool,
}

impl LabelTextExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        let lines = &ctx.page.lines;
        let (mut buy, mut sell) = (None, None);
        for (i, line) in lines.iter().enumerate() {
            let is_buy = self.buy.is_match(line);
            let is_sell = self.sell.is_match(line);
            if is_buy && !is_sell && buy.is_none() {
                buy = self.value_after(ctx, i);
            }
            if is_sell && !is_buy && sell.is_none() {
                sell = self.value_after(ctx, i);
            }
            if buy.is_some() && sell.is_some() {
                break;
            }
        }
        hit((buy, sell))
    }

    fn value_after(&self, ctx: &Ctx<'_>, i: usize) -> Option<i64> {
        let lines = &ctx.page.lines;
        let end = (i + 1 + self.window).min(lines.len());
        lines[i + 1..end].iter().find_map(|line| {
            if self.skip_cb && is_central_bank_style(line) {
                return None;
            }
            ctx.parse(line).or_else(|| {
                self.tokens
                    .then(|| ctx.tokens(line, self.skip_cb).first().copied())
                    .flatten()
            })
        })
    }
}

/// `label: figure` pairs anywhere in the page text.
#[derive(Debug, Clone)]
pub struct LabelRegexExtractor {
    pub buy: Regex,
    pub sell: Regex,
}

impl LabelRegexExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        let text = ctx.page.full_text();
        let first = |re: &Regex| {
            re.captures_iter(&text)
                .filter_map(|c| c.get(1))
                .filter(|m| !is_central_bank_style(m.as_str()))
                .find_map(|m| ctx.parse(m.as_str()))
        };
        hit((first(&self.buy), first(&self.sell)))
    }
}

/// One regex with two captures, buy then sell.
#[derive(Debug, Clone)]
pub struct PairRegexExtractor {
    pub pattern: Regex,
}

impl PairRegexExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        let text = ctx.page.full_text();
        self.pattern.captures_iter(&text).find_map(|c| {
            let buy = c.get(1).and_then(|m| ctx.parse(m.as_str()));
            let sell = c.get(2).and_then(|m| ctx.parse(m.as_str()));
            hit((buy, sell))
        })
    }
}

/// Rate-like keys in embedded JSON or script state.
#[derive(Debug, Clone)]
pub struct ScriptJsonExtractor {
    pub buy_key: Regex,
    pub sell_key: Regex,
    /// Skip scripts that never mention the currency code.
    pub require_currency_mention: bool,
}

impl ScriptJsonExtractor {
    pub fn standard(require_currency_mention: bool) -> Self {
        Self {
            buy_key: super::patterns::re(
                r#"(?i)"(?:buy|buying|purchase|buyRate|rate_buy|покупка|olish|sotib)[\w]*"\s*:\s*"?([\d.,]+)"?"#,
            ),
            sell_key: super::patterns::re(
                r#"(?i)"(?:sell|selling|sale|sellRate|rate_sell|продажа|sotish)[\w]*"\s*:\s*"?([\d.,]+)"?"#,
            ),
            require_currency_mention,
        }
    }

    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        ctx.page.scripts.iter().find_map(|script| {
            if self.require_currency_mention && !script.to_ascii_uppercase().contains("USD") {
                return None;
            }
            let first = |re: &Regex| {
                re.captures_iter(script)
                    .filter_map(|c| c.get(1))
                    .find_map(|m| ctx.parse(m.as_str()))
            };
            hit((first(&self.buy_key), first(&self.sell_key)))
        })
    }
}

/// `data-buy` / `data-sell` style attributes.
#[derive(Debug, Clone)]
pub struct DataAttributeExtractor {
    /// Only elements whose currency attribute names the dollar.
    pub currency_scoped: bool,
}

impl DataAttributeExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        ctx.page
            .data_attrs
            .iter()
            .filter(|a| {
                !self.currency_scoped
                    || a.currency
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case("usd") || c == "840")
            })
            .find_map(|a| {
                let buy = a.buy.as_deref().and_then(|v| ctx.parse(v));
                let sell = a.sell.as_deref().and_then(|v| ctx.parse(v));
                hit((buy, sell))
            })
    }
}

/// Character window around an anchor in the whole page text.
#[derive(Debug, Clone)]
pub struct FullScanExtractor {
    pub anchors: Vec<Regex>,
    pub before: usize,
    pub after: usize,
    /// Values needed in a window for it to count.
    pub min_values: usize,
    pub skip_cb: bool,
    /// Text removed before scanning.
    pub strip: Option<Regex>,
    /// Try every anchor occurrence instead of only the first.
    pub every_occurrence: bool,
}

impl FullScanExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        let full = ctx.page.full_text();
        let text = match &self.strip {
            Some(strip) => strip.replace_all(&full, "").into_owned(),
            None => full,
        };
        for anchor in &self.anchors {
            let occurrences: Vec<usize> = if self.every_occurrence {
                anchor.find_iter(&text).map(|m| m.start()).collect()
            } else {
                anchor.find(&text).map(|m| m.start()).into_iter().collect()
            };
            for pos in occurrences {
                let window = char_window(&text, pos, self.before, self.after);
                let mut values = Vec::new();
                for v in ctx.tokens(window, self.skip_cb) {
                    push_unique(&mut values, v);
                }
                if values.len() >= self.min_values.max(1) {
                    return hit(pair_of(&values));
                }
            }
        }
        None
    }
}

/// `before` characters back and `after` characters forward from byte `pos`.
fn char_window(text: &str, pos: usize, before: usize, after: usize) -> &str {
    let start = text[..pos]
        .char_indices()
        .rev()
        .take(before)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(pos);
    let end = text[pos..]
        .char_indices()
        .nth(after)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len());
    &text[start..end]
}

/// Rendered rows whose cells are separated by tabs.
#[derive(Debug, Clone)]
pub struct TabRowExtractor {
    pub currency: CurrencyMatcher,
    pub skip_cb: bool,
}

impl TabRowExtractor {
    fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        for raw in &ctx.page.raw_lines {
            if !self.currency.is_match(raw) {
                continue;
            }
            let mut values = Vec::new();
            for cell in raw.split('\t').map(str::trim) {
                if self.skip_cb && is_central_bank_style(cell) {
                    continue;
                }
                if let Some(v) = ctx.parse(cell) {
                    push_unique(&mut values, v);
                }
            }
            if values.len() < 2 {
                values = ctx.tokens(raw, self.skip_cb);
            }
            if values.len() >= 2 {
                return Some(pair_of(&values));
            }
        }
        None
    }
}

/// One step of an extractor chain.
#[derive(Debug, Clone)]
pub enum Extractor {
    Table(TableExtractor),
    Inline(InlineExtractor),
    Proximity(ProximityExtractor),
    LabelText(LabelTextExtractor),
    LabelRegex(LabelRegexExtractor),
    PairRegex(PairRegexExtractor),
    ScriptJson(ScriptJsonExtractor),
    DataAttributes(DataAttributeExtractor),
    FullScan(FullScanExtractor),
    TabRow(TabRowExtractor),
}

impl Extractor {
    /// Strategy name used in the `variant:strategy` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Inline(_) => "inline",
            Self::Proximity(_) => "proximity",
            Self::LabelText(_) => "label-text",
            Self::LabelRegex(_) => "label-regex",
            Self::PairRegex(_) => "pair-regex",
            Self::ScriptJson(_) => "script-json",
            Self::DataAttributes(_) => "data-attr",
            Self::FullScan(_) => "full-scan",
            Self::TabRow(_) => "tab-row",
        }
    }

    /// Run the strategy. `Some` only when at least one side was found.
    pub fn apply(&self, ctx: &Ctx<'_>) -> Option<Pair> {
        match self {
            Self::Table(e) => e.apply(ctx),
            Self::Inline(e) => e.apply(ctx),
            Self::Proximity(e) => e.apply(ctx),
            Self::LabelText(e) => e.apply(ctx),
            Self::LabelRegex(e) => e.apply(ctx),
            Self::PairRegex(e) => e.apply(ctx),
            Self::ScriptJson(e) => e.apply(ctx),
            Self::DataAttributes(e) => e.apply(ctx),
            Self::FullScan(e) => e.apply(ctx),
            Self::TabRow(e) => e.apply(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::patterns::other_currency_sentinel;

    fn band() -> RateBand {
        RateBand::new(12000, 13200).unwrap()
    }

    fn table() -> TableExtractor {
        TableExtractor {
            keywords: Keywords::generic(),
            currency: CurrencyMatcher::rendered(),
            skip_cb: true,
            fallback: RowFallback::FirstTwo,
            row_filter: None,
            first_currency_row_only: false,
        }
    }

    fn page_with_table(rows: &[&[&str]]) -> PageText {
        PageText {
            tables: vec![rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect()],
            ..PageText::default()
        }
    }

    fn run(ex: &Extractor, page: &PageText, numbers: NumberStyle) -> Option<Pair> {
        let band = band();
        ex.apply(&Ctx {
            page,
            band: &band,
            numbers,
        })
    }

    #[test]
    fn test_table_header_columns() {
        let page = page_with_table(&[&["Покупка", "Продажа"], &["USD", "12 140", "12 260"]]);
        let ex = Extractor::Table(table());
        assert_eq!(
            run(&ex, &page, NumberStyle::Locale),
            Some((Some(12140), Some(12260)))
        );
    }

    #[test]
    fn test_table_skips_central_bank_column() {
        let page = page_with_table(&[
            &["Покупка", "Продажа"],
            &["USD", "12 140", "12 260", "12 236,13"],
        ]);
        let ex = Extractor::Table(table());
        assert_eq!(
            run(&ex, &page, NumberStyle::Locale),
            Some((Some(12140), Some(12260)))
        );

        let headerless = page_with_table(&[&["USD", "12 236,13", "12 140", "12 260"]]);
        assert_eq!(
            run(&ex, &headerless, NumberStyle::Locale),
            Some((Some(12140), Some(12260)))
        );
    }

    #[test]
    fn test_table_central_bank_column_before_commercial() {
        let page = page_with_table(&[
            &["", "Покупка", "Продажа"],
            &["USD", "12 236,13", "12 140", "12 260"],
        ]);
        let ex = Extractor::Table(table());
        assert_eq!(
            run(&ex, &page, NumberStyle::Locale),
            Some((Some(12140), Some(12260)))
        );
    }

    #[test]
    fn test_table_row_filter_and_first_row_only() {
        let mut t = table();
        t.fallback = RowFallback::FirstTwo;
        t.row_filter = Some(Regex::new(r"(?i)mobile").unwrap());
        t.first_currency_row_only = true;
        let page = page_with_table(&[
            &["USD BRB mobile", "12 150", "12 250"],
            &["USD", "12 140", "12 260"],
            &["USD", "12 100", "12 300"],
        ]);
        assert_eq!(
            run(&Extractor::Table(t), &page, NumberStyle::Strict),
            Some((Some(12140), Some(12260)))
        );
    }

    #[test]
    fn test_proximity_stops_at_other_currency() {
        let page = PageText::from_text("USD\n12 140\nEUR\n13 100\n13 200");
        let ex = Extractor::Proximity(ProximityExtractor {
            currency: CurrencyMatcher::exact_code(),
            before: 0,
            after: 9,
            skip_cb: true,
            sentinel: Some(other_currency_sentinel()),
            tokens: false,
        });
        assert_eq!(
            run(&ex, &page, NumberStyle::Strict),
            Some((Some(12140), None))
        );
    }

    #[test]
    fn test_proximity_ignores_noise_tokens() {
        let page = PageText::from_text("USD\n-0.00\n12 140\n0\n12 260");
        let ex = Extractor::Proximity(ProximityExtractor {
            currency: CurrencyMatcher::exact_code(),
            before: 0,
            after: 9,
            skip_cb: true,
            sentinel: None,
            tokens: false,
        });
        assert_eq!(
            run(&ex, &page, NumberStyle::Strict),
            Some((Some(12140), Some(12260)))
        );
    }

    #[test]
    fn test_label_text_blocks() {
        let page = PageText::from_text("Курс доллара\nПокупка\n12 140 сум\nПродажа\n12 260 сум");
        let ex = Extractor::LabelText(LabelTextExtractor {
            buy: Keywords::generic().buy,
            sell: Keywords::generic().sell,
            window: 7,
            skip_cb: true,
            tokens: true,
        });
        assert_eq!(
            run(&ex, &page, NumberStyle::Locale),
            Some((Some(12140), Some(12260)))
        );
    }

    #[test]
    fn test_script_json_skips_out_of_band_keys() {
        let page = PageText {
            scripts: vec![r#"[{"ccy":"EUR","buy":"13500"},{"ccy":"USD","buy":"12140","sell":"12260"}]"#.into()],
            ..PageText::default()
        };
        let ex = Extractor::ScriptJson(ScriptJsonExtractor::standard(true));
        assert_eq!(
            run(&ex, &page, NumberStyle::Locale),
            Some((Some(12140), Some(12260)))
        );
    }

    #[test]
    fn test_full_scan_window() {
        let page = PageText::from_text("Главная | Курсы | USD 12140 / 12260 | EUR 13500");
        let ex = Extractor::FullScan(FullScanExtractor {
            anchors: vec![Regex::new(r"(?i)\bUSD\b").unwrap()],
            before: 0,
            after: 40,
            min_values: 2,
            skip_cb: true,
            strip: None,
            every_occurrence: false,
        });
        assert_eq!(
            run(&ex, &page, NumberStyle::Locale),
            Some((Some(12140), Some(12260)))
        );
    }

    #[test]
    fn test_char_window_respects_char_boundaries() {
        let text = "долларUSDдоллар";
        let pos = text.find("USD").unwrap();
        assert_eq!(char_window(text, pos, 2, 5), "арUSDдо");
        assert_eq!(char_window(text, pos, 100, 100), text);
    }

    #[test]
    fn test_tab_row() {
        let page = PageText::from_text("USD\t12 140.00\t12 236.13\t12 260.00");
        let ex = Extractor::TabRow(TabRowExtractor {
            currency: CurrencyMatcher::loose(r"(?i)USD"),
            skip_cb: true,
        });
        assert_eq!(
            run(&ex, &page, NumberStyle::Strict),
            Some((Some(12140), Some(12260)))
        );
    }
}
