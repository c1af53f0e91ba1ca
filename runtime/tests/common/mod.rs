// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures: a scripted renderer and a runtime wired to mock servers.

#![allow(dead_code)]

use async_trait::async_trait;
use kurs_core::channel::date_stamp;
use kurs_core::{RateBand, Registry, SourceDescriptor};
use kurs_runtime::config::RuntimeConfig;
use kurs_runtime::renderer::{NavigationResult, RenderContext, RenderedPage, Renderer};
use kurs_runtime::scheduler::Scheduler;
use kurs_runtime::scrape::Scraper;
use kurs_runtime::store::SnapshotStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub fn band() -> RateBand {
    RateBand::new(12000, 13200).unwrap()
}

/// Holds navigation until released, so a cycle can be observed mid-flight.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Serves canned pages by URL; unknown URLs fail navigation.
#[derive(Default)]
pub struct FakeRenderer {
    pages: HashMap<String, RenderedPage>,
    gate: Option<Arc<Gate>>,
    open: Arc<AtomicUsize>,
    pub navigations: Arc<AtomicUsize>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            RenderedPage {
                html: format!("<html><body><p>{text}</p></body></html>"),
                text: text.to_string(),
            },
        );
        self
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }
}

struct FakeContext {
    page: Option<RenderedPage>,
    pages: HashMap<String, RenderedPage>,
    gate: Option<Arc<Gate>>,
    open: Arc<AtomicUsize>,
    navigations: Arc<AtomicUsize>,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self) -> anyhow::Result<Box<dyn RenderContext>> {
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext {
            page: None,
            pages: self.pages.clone(),
            gate: self.gate.clone(),
            open: Arc::clone(&self.open),
            navigations: Arc::clone(&self.navigations),
        }))
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn block_resources(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> anyhow::Result<NavigationResult> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.page = Some(
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("net::ERR_NAME_NOT_RESOLVED {url}"))?,
        );
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn snapshot(&self) -> anyhow::Result<RenderedPage> {
        self.page
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no page loaded"))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A static page with a buy/sell table; `None` cells are left blank.
pub fn rate_table(buy: Option<&str>, sell: Option<&str>) -> String {
    format!(
        "<html><body><table>\
         <tr><th>Валюта</th><th>Покупка</th><th>Продажа</th></tr>\
         <tr><td>USD</td><td>{}</td><td>{}</td></tr>\
         <tr><td>EUR</td><td>13 100</td><td>13 250</td></tr>\
         </table></body></html>",
        buy.unwrap_or("—"),
        sell.unwrap_or("—")
    )
}

/// Channel preview page with one post stamped with today's date.
pub fn channel_page(body_lines: &[&str]) -> String {
    let today = date_stamp(chrono::Local::now().date_naive());
    format!(
        "<html><body><div class=\"tgme_widget_message\">\
         <div class=\"tgme_widget_message_text\">{today} dollar kursi<br>{}</div>\
         </div></body></html>",
        body_lines.join("<br>")
    )
}

pub fn config(data_file: &Path) -> RuntimeConfig {
    let mut config = RuntimeConfig::new(band());
    config.data_file = data_file.to_path_buf();
    config.fetch_timeout = Duration::from_secs(5);
    config.nav_timeout = Duration::from_secs(5);
    config.min_success = 3;
    config
}

pub async fn scheduler(
    config: RuntimeConfig,
    sources: Vec<SourceDescriptor>,
    renderer: FakeRenderer,
) -> Arc<Scheduler> {
    let store = Arc::new(SnapshotStore::open(config.data_file.clone()).await);
    let registry = Arc::new(Registry::new(sources).unwrap());
    let scraper = Arc::new(Scraper::new(config, registry, Arc::new(renderer)).unwrap());
    Arc::new(Scheduler::new(scraper, store))
}
