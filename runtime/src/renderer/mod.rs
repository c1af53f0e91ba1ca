// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on closing a page.
pub const DISPOSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// What extraction needs from a live page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderedPage {
    /// Serialized DOM.
    pub html: String,
    /// The body's rendered text (`innerText`).
    pub text: String,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab), relaunching the engine first if
    /// it is no longer responsive.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
    /// Whether this renderer can render at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Abort image, media, font and stylesheet requests from now on.
    async fn block_resources(&mut self) -> Result<()>;
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult>;
    /// Read the page's markup and rendered text.
    async fn snapshot(&self) -> Result<RenderedPage>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Close `ctx`, giving up after `limit`. Never fails.
pub async fn dispose(ctx: Box<dyn RenderContext>, limit: Duration) {
    match tokio::time::timeout(limit, ctx.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("page close failed: {e:#}"),
        Err(_) => warn!("page close timed out after {limit:?}"),
    }
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Rendered sources then fail fast and resolve through the static fallback
/// and the channel.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("browser not available, static-only mode"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
    fn is_available(&self) -> bool {
        false
    }
}
