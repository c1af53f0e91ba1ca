// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Owned, `Send` view of a page that the extraction strategies read from.
//!
//! `scraper::Html` is `!Send`, so markup is parsed and flattened here inside
//! synchronous functions; nothing parsed crosses an await point.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").expect("valid selector"));
static INLINE_SCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script:not([src])").expect("valid selector"));
static DATA_RATE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "[data-currency], [data-code], [data-ccy], [data-buy], [data-purchase], [data-sell], [data-sale]",
    )
    .expect("valid selector")
});

/// Elements whose content never shows up in rendered text.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// Elements that start a new line in rendered text.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "thead", "tfoot", "tr",
    "ul", "option", "select",
];

/// Rate-bearing data attributes found on one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataAttrs {
    pub currency: Option<String>,
    pub buy: Option<String>,
    pub sell: Option<String>,
}

/// Flattened page content.
#[derive(Debug, Clone, Default)]
pub struct PageText {
    /// Tables as rows of cell texts.
    pub tables: Vec<Vec<Vec<String>>>,
    /// Trimmed, non-empty text lines.
    pub lines: Vec<String>,
    /// Text lines as rendered, cells still separated by tabs.
    pub raw_lines: Vec<String>,
    /// Bodies of inline `<script>` elements.
    pub scripts: Vec<String>,
    pub data_attrs: Vec<DataAttrs>,
}

impl PageText {
    /// Build from raw markup; rendered text is approximated from the DOM.
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let text = render_text(&document);
        let mut page = Self::structure(&document);
        page.set_text(&text);
        page
    }

    /// Build from a live page: structure from its markup, lines from the
    /// browser's own rendered text.
    pub fn from_rendered(html: &str, inner_text: &str) -> Self {
        let document = Html::parse_document(html);
        let mut page = Self::structure(&document);
        if inner_text.trim().is_empty() {
            page.set_text(&render_text(&document));
        } else {
            page.set_text(inner_text);
        }
        page
    }

    /// Build from plain text only (no tables, scripts or attributes).
    pub fn from_text(text: &str) -> Self {
        let mut page = Self::default();
        page.set_text(text);
        page
    }

    /// All lines joined with newlines.
    pub fn full_text(&self) -> String {
        self.lines.join("\n")
    }

    fn structure(document: &Html) -> Self {
        let tables = document
            .select(&TABLE)
            .map(|table| {
                table
                    .select(&ROW)
                    .map(|row| row.select(&CELL).map(|c| cell_text(&c)).collect::<Vec<_>>())
                    .filter(|cells| !cells.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|rows| !rows.is_empty())
            .collect();

        let scripts = document
            .select(&INLINE_SCRIPT)
            .map(|s| s.text().collect::<String>())
            .filter(|s| !s.trim().is_empty())
            .collect();

        let data_attrs = document
            .select(&DATA_RATE)
            .map(|el| {
                let v = el.value();
                let first = |names: &[&str]| {
                    names
                        .iter()
                        .find_map(|n| v.attr(n))
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                };
                DataAttrs {
                    currency: first(&["data-currency", "data-code", "data-ccy"]),
                    buy: first(&["data-buy", "data-purchase"]),
                    sell: first(&["data-sell", "data-sale"]),
                }
            })
            .collect();

        Self {
            tables,
            lines: Vec::new(),
            raw_lines: Vec::new(),
            scripts,
            data_attrs,
        }
    }

    fn set_text(&mut self, text: &str) {
        self.raw_lines = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.trim_end().to_string())
            .collect();
        self.lines = self.raw_lines.iter().map(|l| l.trim().to_string()).collect();
    }
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    collapse_whitespace(&cell.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accumulates text the way a browser's `innerText` lays it out.
#[derive(Default)]
struct TextBuilder {
    out: String,
    line: String,
}

impl TextBuilder {
    fn push_text(&mut self, text: &str) {
        let collapsed = collapse_whitespace(text);
        if collapsed.is_empty() {
            if !self.line.is_empty() && !self.line.ends_with([' ', '\t']) {
                self.line.push(' ');
            }
            return;
        }
        let leading = text.starts_with(char::is_whitespace);
        if leading && !self.line.is_empty() && !self.line.ends_with([' ', '\t']) {
            self.line.push(' ');
        }
        self.line.push_str(&collapsed);
        if text.ends_with(char::is_whitespace) {
            self.line.push(' ');
        }
    }

    fn tab(&mut self) {
        let trimmed = self.line.trim_end_matches(' ').len();
        self.line.truncate(trimmed);
        self.line.push('\t');
    }

    fn newline(&mut self) {
        let line = self.line.trim_end();
        if !line.trim().is_empty() {
            self.out.push_str(line);
            self.out.push('\n');
        }
        self.line.clear();
    }

    fn finish(mut self) -> String {
        self.newline();
        self.out
    }
}

fn render_text(document: &Html) -> String {
    let mut builder = TextBuilder::default();
    walk(document.root_element(), &mut builder);
    builder.finish()
}

enum Step<'a> {
    Open(ElementRef<'a>),
    Text(&'a str),
    Close { cell: bool, block: bool },
}

/// Depth-first walk with an explicit stack; page nesting is unbounded.
fn walk(root: ElementRef<'_>, out: &mut TextBuilder) {
    let mut stack = vec![Step::Open(root)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Text(text) => out.push_text(text),
            Step::Close { cell, block } => {
                if cell {
                    out.tab();
                } else if block {
                    out.newline();
                }
            }
            Step::Open(el) => {
                let name = el.value().name();
                if HIDDEN.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.newline();
                    continue;
                }
                let block = BLOCK.contains(&name);
                if block {
                    out.newline();
                }
                stack.push(Step::Close {
                    cell: matches!(name, "td" | "th"),
                    block,
                });
                for child in el.children().rev() {
                    if let Some(text) = child.value().as_text() {
                        stack.push(Step::Text(text));
                    } else if let Some(child_el) = ElementRef::wrap(child) {
                        stack.push(Step::Open(child_el));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_and_lines() {
        let html = r#"<html><body>
            <h1>Курсы валют</h1>
            <table>
              <tr><th>Валюта</th><th>Покупка</th><th>Продажа</th></tr>
              <tr><td>USD</td><td>12 140</td><td>12&nbsp;260</td></tr>
            </table>
            <script>var rates = {"buy": "12140"};</script>
            <script src="/app.js"></script>
        </body></html>"#;
        let page = PageText::from_html(html);
        assert_eq!(page.tables.len(), 1);
        assert_eq!(page.tables[0][1], vec!["USD", "12 140", "12 260"]);
        assert!(page.lines.contains(&"Курсы валют".to_string()));
        assert!(page
            .raw_lines
            .iter()
            .any(|l| l.starts_with("USD\t12 140\t12 260")));
        assert_eq!(page.scripts.len(), 1);
        assert!(!page.full_text().contains("var rates"));
    }

    #[test]
    fn test_data_attributes() {
        let html = r#"<div data-currency="USD" data-buy="12 140" data-sale="12 260"></div>"#;
        let page = PageText::from_html(html);
        assert_eq!(
            page.data_attrs,
            vec![DataAttrs {
                currency: Some("USD".into()),
                buy: Some("12 140".into()),
                sell: Some("12 260".into()),
            }]
        );
    }

    #[test]
    fn test_rendered_text_wins_over_markup() {
        let page = PageText::from_rendered("<p>ignored</p>", "USD\n  12 140 \n12 260\n\n");
        assert_eq!(page.lines, vec!["USD", "12 140", "12 260"]);
    }

    #[test]
    fn test_inline_elements_stay_on_one_line() {
        let page = PageText::from_html("<p><span>USD</span> <b>12 140</b> / <b>12 260</b></p>");
        assert_eq!(page.lines, vec!["USD 12 140 / 12 260"]);
    }

    #[test]
    fn test_deeply_nested_markup() {
        let depth = 100_000;
        let html = format!(
            "<html><body>{}<p>USD 12 140 12 260</p>{}</body></html>",
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        let page = PageText::from_html(&html);
        assert!(page.lines.iter().any(|l| l == "USD 12 140 12 260"));
    }
}
