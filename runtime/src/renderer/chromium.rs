// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-based renderer using chromiumoxide.
//!
//! One engine process is shared by every page. Before a page is handed out
//! the engine is probed with a real round-trip; a dead or wedged engine is
//! discarded and relaunched under the same lock, so concurrent callers never
//! race to relaunch.

use super::{NavigationResult, RenderContext, RenderedPage, Renderer, DISPOSE_TIMEOUT};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::page::Page;
use futures::StreamExt;
use kurs_core::KursError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// User agent presented by rendered pages.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/131.0.0.0 Safari/537.36";

const VIEWPORT: (u32, u32) = (1366, 768);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Well-known install locations, checked before `PATH`.
const SYSTEM_PATHS: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// Find the Chromium binary path.
///
/// Order: explicit override, `KURS_CHROME_PATH`, well-known system paths,
/// `PATH`. `None` lets chromiumoxide use its own default lookup.
pub fn find_chromium(override_path: Option<&Path>) -> Option<PathBuf> {
    // 1. Explicit override
    if let Some(p) = override_path {
        if p.exists() {
            return Some(p.to_path_buf());
        }
        warn!("configured Chrome path does not exist: {}", p.display());
    }

    // 2. KURS_CHROME_PATH env
    if let Ok(p) = std::env::var("KURS_CHROME_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. Common system locations
    if let Some(p) = SYSTEM_PATHS.iter().map(PathBuf::from).find(|p| p.exists()) {
        return Some(p);
    }

    // 4. System PATH
    ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
        .iter()
        .find_map(|bin| which::which(bin).ok())
}

/// How the engine is launched.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub executable: Option<PathBuf>,
    /// Adds `--single-process` for small servers.
    pub constrained: bool,
    /// CDP request timeout.
    pub request_timeout: Option<Duration>,
}

impl LaunchOptions {
    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--no-zygote")
            .arg("--disable-background-networking")
            .window_size(VIEWPORT.0, VIEWPORT.1);
        if self.constrained {
            builder = builder.arg("--single-process");
        }
        if let Some(timeout) = self.request_timeout {
            builder = builder.request_timeout(timeout);
        }
        if let Some(path) = find_chromium(self.executable.as_deref()) {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))
    }
}

struct LiveBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl LiveBrowser {
    async fn launch(options: &LaunchOptions) -> Result<Self> {
        let config = options.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler: {e}");
                }
            }
        });
        Ok(Self { browser, handler })
    }

    /// Round-trip to the engine under a short timeout.
    async fn is_alive(&self) -> bool {
        if self.handler.is_finished() {
            return false;
        }
        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, self.browser.pages()).await,
            Ok(Ok(_))
        )
    }

    async fn close(mut self) {
        match tokio::time::timeout(DISPOSE_TIMEOUT, self.browser.close()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("browser close failed: {e}"),
            Err(_) => warn!("browser close timed out"),
        }
        self.handler.abort();
    }
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    options: LaunchOptions,
    browser: Mutex<Option<LiveBrowser>>,
    active_count: Arc<AtomicUsize>,
    launches: AtomicUsize,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let live = LiveBrowser::launch(&options).await?;
        info!("Chromium renderer initialized");
        Ok(Self {
            options,
            browser: Mutex::new(Some(live)),
            active_count: Arc::new(AtomicUsize::new(0)),
            launches: AtomicUsize::new(1),
        })
    }

    /// Engine launches so far, including relaunches after a crash.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::Relaxed)
    }

    async fn open_page(&self) -> Result<Page> {
        let mut slot = self.browser.lock().await;

        let alive = match slot.as_ref() {
            Some(live) => live.is_alive().await,
            None => false,
        };
        if !alive {
            if let Some(dead) = slot.take() {
                warn!("browser unresponsive, relaunching");
                dead.close().await;
            }
            *slot = Some(LiveBrowser::launch(&self.options).await?);
            self.launches.fetch_add(1, Ordering::Relaxed);
        }

        let live = slot
            .as_ref()
            .ok_or_else(|| anyhow!("browser slot empty after launch"))?;
        live.browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self.open_page().await?;
        page.execute(SetUserAgentOverrideParams::new(USER_AGENT))
            .await
            .context("failed to set user agent")?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            VIEWPORT.0 as i64,
            VIEWPORT.1 as i64,
            1.0,
            false,
        ))
        .await
        .context("failed to set viewport")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
            interceptor: None,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(live) = self.browser.lock().await.take() {
            live.close().await;
            info!("browser closed");
        }
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
    interceptor: Option<JoinHandle<()>>,
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        if let Some(task) = self.interceptor.take() {
            task.abort();
        }
    }
}

fn is_heavy_resource(kind: &ResourceType) -> bool {
    matches!(
        kind,
        ResourceType::Image | ResourceType::Media | ResourceType::Font | ResourceType::Stylesheet
    )
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn block_resources(&mut self) -> Result<()> {
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .context("failed to subscribe to paused requests")?;
        let page = self.page.clone();
        self.interceptor = Some(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let id = event.request_id.clone();
                let outcome = if is_heavy_resource(&event.resource_type) {
                    page.execute(FailRequestParams::new(id, ErrorReason::BlockedByClient))
                        .await
                        .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(id)).await.map(|_| ())
                };
                if let Err(e) = outcome {
                    debug!("request interception: {e}");
                }
            }
        }));

        let pattern = RequestPattern::builder().url_pattern("*").build();
        self.page
            .execute(EnableParams::builder().pattern(pattern).build())
            .await
            .context("failed to enable request interception")?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;
        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| url.to_string());
                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => Err(KursError::Timeout(timeout).into()),
        }
    }

    async fn snapshot(&self) -> Result<RenderedPage> {
        let html = self.page.content().await.context("failed to get HTML")?;
        let text: String = self
            .page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .context("failed to read page text")?
            .into_value()
            .map_err(|e| anyhow!("failed to convert page text: {e:?}"))?;
        Ok(RenderedPage { html, text })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}
