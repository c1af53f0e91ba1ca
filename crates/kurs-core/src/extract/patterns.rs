// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Keyword, currency and number patterns shared by the extractor profiles.

use regex::Regex;

/// A grouped (`12 140`, `12,140`) or plain (`12140`) figure, as one capture.
pub const NUM: &str = r"(\d{1,3}(?:[\s,]\d{3})+|\d{4,7})";

pub(crate) fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Column-header / label keywords for the buy and sell sides.
#[derive(Debug, Clone)]
pub struct Keywords {
    pub buy: Regex,
    pub sell: Regex,
}

impl Keywords {
    /// Uzbek, Russian and English labels used by most bank widgets.
    pub fn generic() -> Self {
        Self {
            buy: re(r"(?i)\b(buy|buying|purchase|sotib[\s-]*olish|olish\s*kursi|sotib\s*ol|xarid|xarid\s*kursi|покупк\w*|курс\s*покупки|sotib|pb|alish)\b"),
            sell: re(r"(?i)\b(sell|selling|sale|sotish|sotish\s*kursi|sotuv|sotuv\s*kursi|sotadi|продаж\w*|курс\s*продажи|реализ\w*|ps|berish)\b"),
        }
    }

    /// Narrower set for server-rendered markup.
    pub fn static_markup() -> Self {
        Self {
            buy: re(r"(?i)\b(buy|purchase|sotib[\s-]*olish|olish\s*kursi|xarid|покупк\w*|курс\s*покупки|sotib)\b"),
            sell: re(r"(?i)\b(sell|sale|sotish|sotish\s*kursi|sotuv|продаж\w*|курс\s*продажи|реализ\w*)\b"),
        }
    }

    pub fn extended() -> Self {
        Self {
            buy: re(r"(?i)\b(buy|buying|purchase|sotib\s*olish|olish|покупк\w*|xarid|pokupka)\b"),
            sell: re(r"(?i)\b(sell|selling|sale|sotish|продаж\w*|sotuv|prodazha)\b"),
        }
    }

    pub fn hamkor() -> Self {
        Self {
            buy: re(r"(?i)(покупка|купить|buy|sotib\s*olish)"),
            sell: re(r"(?i)(продажа|продать|sell|sotish)"),
        }
    }

    pub fn tbc() -> Self {
        Self {
            buy: re(r"(?i)(sotib\s*olish|покупка|buy|purchase|xarid|olish)"),
            sell: re(r"(?i)(sotish|продажа|sell|sale)"),
        }
    }

    pub fn hayot() -> Self {
        Self {
            buy: re(r"(?i)(sotib\s*olish|olish|buy|покупка)"),
            sell: re(r"(?i)(sotish|sell|продажа)"),
        }
    }
}

/// Recognises the text that names the US dollar.
#[derive(Debug, Clone)]
pub struct CurrencyMatcher {
    patterns: Vec<Regex>,
}

impl CurrencyMatcher {
    fn from_patterns(patterns: &[&str]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| re(p)).collect(),
        }
    }

    /// Cell/line-anchored identifiers as they appear in rendered pages.
    pub fn rendered() -> Self {
        Self::from_patterns(&[
            r"(?i)^USD\b",
            r"^840$",
            r"(?i)^долл?\.",
            r"(?i)доллар\s*(США|сша)",
            r"(?i)^доллар$",
            r"(?i)^dollar$",
            r"(?i)us\s*dollar",
            r"(?i)aqsh\s*dollari?",
            r"(?i)американский",
            r"(?i)АҚШ\s*доллари",
            r"^\$$",
        ])
    }

    pub fn static_markup() -> Self {
        Self::from_patterns(&[
            r"(?i)^USD\b",
            r"^840$",
            r"(?i)доллар\s*(США|сша)",
            r"(?i)us\s*dollar",
            r"(?i)aqsh\s*dollar",
            r"(?i)^доллар$",
            r"(?i)^dollar$",
            r"(?i)американский",
        ])
    }

    /// Exact code plus the common spelled-out names.
    pub fn simple() -> Self {
        Self::from_patterns(&[r"(?i)^USD$|доллар\s*(США|сша)|us\s*dollar|aqsh\s*dollar|АҚШ"])
    }

    pub fn exact_code() -> Self {
        Self::from_patterns(&[r"(?i)^USD$"])
    }

    /// Unanchored: matches anywhere in the text.
    pub fn loose(pattern: &str) -> Self {
        Self::from_patterns(&[pattern])
    }

    pub fn is_match(&self, text: &str) -> bool {
        let t = text.trim();
        self.patterns.iter().any(|p| p.is_match(t))
    }
}

/// A line that names another currency ends the search window.
pub fn other_currency_sentinel() -> Regex {
    re(r"(?i)^(EUR|RUB|GBP|JPY|CNY|KZT|CHF)\b")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_currency_identifiers() {
        let m = CurrencyMatcher::rendered();
        for s in ["USD", " usd ", "USD/UZS", "840", "Доллар США", "AQSH dollari", "$"] {
            assert!(m.is_match(s), "{s}");
        }
        for s in ["EUR", "12 140", "Курс USD"] {
            assert!(!m.is_match(s), "{s}");
        }
    }

    #[test]
    fn test_keywords_match_cyrillic_words() {
        let k = Keywords::generic();
        assert!(k.buy.is_match("Покупка"));
        assert!(k.buy.is_match("Sotib olish"));
        assert!(k.sell.is_match("Продажа"));
        assert!(!k.sell.is_match("Покупка"));
        assert!(!k.sell.is_match("https://bank.uz"));
    }

    #[test]
    fn test_num_pattern_stops_between_figures() {
        let r = re(&format!(r"USD\D{{0,20}}{NUM}\D{{0,30}}{NUM}"));
        let caps = r.captures("USD 12 140 12 260").unwrap();
        assert_eq!(&caps[1], "12 140");
        assert_eq!(&caps[2], "12 260");
    }
}
