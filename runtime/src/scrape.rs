// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! One collection cycle: every source through its fallback stages, then the
//! channel for whatever is still incomplete.

use crate::acquisition::channel::fetch_quotes;
use crate::acquisition::reference::{fetch_usd, ReferenceRate};
use crate::acquisition::{fetch_rendered, HttpClient};
use crate::config::RuntimeConfig;
use crate::renderer::Renderer;
use chrono::{Local, Utc};
use futures::future::join_all;
use kurs_core::channel::date_stamp;
use kurs_core::extract::{self, profile_for, PageText};
use kurs_core::reconcile::{any_incomplete, apply_channel, finalize, merge_extraction};
use kurs_core::snapshot::{ORIGIN_WEB, ORIGIN_WEB_CHANNEL};
use kurs_core::{
    AliasTable, FetchMode, KursResult, Provenance, ProvenanceTag, RateRecord, RawExtraction,
    Registry, Snapshot, SourceDescriptor,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const TEXT_SNIPPET: usize = 3000;
const HTML_SNIPPET: usize = 4000;

/// Markup and text of a fetched page, whichever way it was acquired.
struct Fetched {
    html: String,
    /// Rendered `innerText`; empty for plain fetches.
    text: String,
}

/// Diagnostic view of one source, for `kurs debug` and the debug endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub bank: String,
    pub url: String,
    pub method: &'static str,
    /// The record a cycle would produce, fallbacks included.
    pub result: RateRecord,
    /// Every strategy of the profile applied to the primary page.
    pub strategies: Vec<RawExtraction>,
    #[serde(rename = "textSnippet")]
    pub text_snippet: String,
    #[serde(rename = "htmlSnippet")]
    pub html_snippet: String,
}

/// Runs sources and cycles. Cheap to share behind an `Arc`.
pub struct Scraper {
    config: RuntimeConfig,
    registry: Arc<Registry>,
    renderer: Arc<dyn Renderer>,
    http: HttpClient,
    aliases: AliasTable,
}

impl Scraper {
    pub fn new(
        config: RuntimeConfig,
        registry: Arc<Registry>,
        renderer: Arc<dyn Renderer>,
    ) -> KursResult<Self> {
        let http = HttpClient::new(config.fetch_timeout)?;
        let aliases = AliasTable::for_registry(&registry);
        Ok(Self {
            config,
            registry,
            renderer,
            http,
            aliases,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    async fn fetch(&self, source: &SourceDescriptor, url: &str, mode: FetchMode) -> KursResult<Fetched> {
        match mode {
            FetchMode::Static => Ok(Fetched {
                html: self.http.get_text(url).await?,
                text: String::new(),
            }),
            FetchMode::Rendered => {
                let settle = self.config.scaled_settle(source.settle);
                let page =
                    fetch_rendered(self.renderer.as_ref(), url, settle, self.config.nav_timeout)
                        .await?;
                Ok(Fetched {
                    html: page.html,
                    text: page.text,
                })
            }
        }
    }

    /// Fetch `url` under `mode` and run the matching extractor profile.
    async fn attempt(
        &self,
        source: &SourceDescriptor,
        url: &str,
        mode: FetchMode,
    ) -> KursResult<RawExtraction> {
        let page = self.fetch(source, url, mode).await?;
        let band = &self.config.band;
        Ok(match mode {
            FetchMode::Static => extract::extract_static(source, &page.html, band),
            FetchMode::Rendered => extract::extract_rendered(source, &page.html, &page.text, band),
        })
    }

    /// Run one stage and merge what it found. Returns whether the stage
    /// failed at the transport level.
    async fn stage(
        &self,
        record: &mut RateRecord,
        source: &SourceDescriptor,
        url: &str,
        mode: FetchMode,
        tag: ProvenanceTag,
    ) -> bool {
        let start = Instant::now();
        match self.attempt(source, url, mode).await {
            Ok(raw) => {
                let filled = merge_extraction(record, &raw, tag, &self.config.band);
                debug!(
                    source = %source.name,
                    stage = tag.as_str(),
                    mode = mode.method_label(),
                    strategy = %raw.strategy,
                    filled,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "stage finished"
                );
                false
            }
            Err(e) => {
                warn!(
                    source = %source.name,
                    stage = tag.as_str(),
                    mode = mode.method_label(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "fetch failed: {e}"
                );
                true
            }
        }
    }

    /// Produce the record for one source: primary page, then the alternate
    /// page, then static markup for rendered sources.
    pub async fn scrape_one(&self, source: &SourceDescriptor) -> RateRecord {
        let mut record = RateRecord {
            name: source.name.clone(),
            buy: None,
            sell: None,
            provenance: Provenance::empty(),
        };

        let primary_failed = self
            .stage(&mut record, source, &source.url, source.mode, ProvenanceTag::Own)
            .await;

        if !record.is_full() {
            if let Some(alt) = &source.alt_url {
                self.stage(&mut record, source, alt, source.mode, ProvenanceTag::OwnAlt)
                    .await;
            }
        }

        if !record.is_full() && source.mode == FetchMode::Rendered {
            self.stage(
                &mut record,
                source,
                &source.url,
                source.mode.opposite(),
                ProvenanceTag::Own,
            )
            .await;
        }

        if primary_failed && !record.is_resolved() {
            record.provenance = Provenance::of(ProvenanceTag::Error);
        }
        finalize(&mut record, &self.config.band);
        record
    }

    /// Run every source, reconcile through the channel and assemble the
    /// snapshot. Never fails; failed sources are recorded as such.
    pub async fn run_cycle(&self) -> Snapshot {
        let start = Instant::now();
        let captured_at = Utc::now();
        let today = Local::now().date_naive();

        let light: Vec<&SourceDescriptor> = self.registry.light().collect();
        let heavy: Vec<&SourceDescriptor> = self.registry.heavy().collect();
        info!(
            light = light.len(),
            heavy = heavy.len(),
            batch_size = self.config.batch_size,
            "cycle started"
        );

        let mut results: HashMap<String, RateRecord> = HashMap::new();
        for record in join_all(light.iter().map(|s| self.scrape_one(s))).await {
            results.insert(record.name.clone(), record);
        }
        for batch in heavy.chunks(self.config.batch_size.max(1)) {
            for record in join_all(batch.iter().map(|s| self.scrape_one(s))).await {
                results.insert(record.name.clone(), record);
            }
        }

        let mut records: Vec<RateRecord> = self
            .registry
            .iter()
            .filter_map(|s| results.remove(&s.name))
            .collect();

        let mut origin = ORIGIN_WEB;
        if any_incomplete(&records) {
            if let Some(url) = &self.config.channel_url {
                match fetch_quotes(&self.http, url, &self.aliases, &self.config.band, today).await {
                    Ok(quotes) => {
                        let improved = apply_channel(&mut records, &quotes, &self.config.band);
                        info!(quoted = quotes.len(), improved, "channel reconciliation");
                        if improved > 0 {
                            origin = ORIGIN_WEB_CHANNEL;
                        }
                    }
                    Err(e) => warn!("channel fetch failed: {e}"),
                }
            }
        }

        let snapshot = Snapshot::assemble(
            &self.registry,
            records.into_iter().map(|r| (r.name.clone(), r)).collect(),
            captured_at,
            date_stamp(today),
            start.elapsed(),
            origin,
        );
        log_summary(&snapshot);
        snapshot
    }

    /// Re-run one source and report every strategy on its primary page.
    pub async fn debug_source(&self, source: &SourceDescriptor) -> SourceReport {
        let result = self.scrape_one(source).await;
        let band = &self.config.band;

        let (strategies, text_snippet, html_snippet) =
            match self.fetch(source, &source.url, source.mode).await {
                Ok(page) => {
                    let (text, parsed) = match source.mode {
                        FetchMode::Static => {
                            let parsed = PageText::from_html(&page.html);
                            (parsed.full_text(), parsed)
                        }
                        FetchMode::Rendered => {
                            (page.text.clone(), PageText::from_rendered(&page.html, &page.text))
                        }
                    };
                    let trace = profile_for(source.variant, source.mode).trace(&parsed, band);
                    (trace, truncate(&text, TEXT_SNIPPET), truncate(&page.html, HTML_SNIPPET))
                }
                Err(e) => (Vec::new(), format!("ERROR: {e}"), String::new()),
            };

        SourceReport {
            bank: source.name.clone(),
            url: source.url.clone(),
            method: source.mode.method_label(),
            result,
            strategies,
            text_snippet,
            html_snippet,
        }
    }

    /// The central bank's official USD entry.
    pub async fn reference_rate(&self) -> KursResult<ReferenceRate> {
        fetch_usd(&self.http, &self.config.cbu_url).await
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn format_value(v: Option<i64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Render the per-source table logged at the end of a cycle.
pub fn summary_table(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {:<3} {:<26} {:>7} {:>7}  source", "", "bank", "buy", "sell");
    for r in &snapshot.records {
        let mark = if r.is_full() {
            "ok"
        } else if r.is_resolved() {
            "~"
        } else {
            "x"
        };
        let _ = writeln!(
            out,
            "  {:<3} {:<26} {:>7} {:>7}  [{}]",
            mark,
            r.name,
            format_value(r.buy),
            format_value(r.sell),
            r.provenance
        );
    }
    out
}

fn log_summary(snapshot: &Snapshot) {
    let c = snapshot.counts;
    info!(
        resolved = c.resolved,
        total = c.total,
        full = c.full,
        partial = c.partial,
        elapsed_ms = snapshot.duration_ms,
        origin = %snapshot.origin,
        "cycle finished"
    );
    let failed = snapshot.failed_names();
    if !failed.is_empty() {
        info!("no rate from: {}", failed.join(", "));
    }
    info!("\n{}", summary_table(snapshot));
}
