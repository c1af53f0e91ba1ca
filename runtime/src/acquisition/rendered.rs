// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fetch a page through the headless browser.

use crate::renderer::{dispose, RenderContext, RenderedPage, Renderer, DISPOSE_TIMEOUT};
use kurs_core::{KursError, KursResult};
use std::time::{Duration, Instant};
use tracing::debug;

/// Navigate to `url`, wait `settle` for client-side rendering and return the
/// page's markup and rendered text. Reading the page is bounded by
/// `nav_timeout` like navigation is. The page is always disposed.
pub async fn fetch_rendered(
    renderer: &dyn Renderer,
    url: &str,
    settle: Duration,
    nav_timeout: Duration,
) -> KursResult<RenderedPage> {
    let start = Instant::now();
    let mut ctx = renderer.new_context().await.map_err(engine_error)?;
    let result = load(ctx.as_mut(), url, settle, nav_timeout).await;
    dispose(ctx, DISPOSE_TIMEOUT).await;
    debug!(url, elapsed_ms = start.elapsed().as_millis() as u64, ok = result.is_ok(), "rendered fetch");
    result
}

async fn load(
    ctx: &mut dyn RenderContext,
    url: &str,
    settle: Duration,
    nav_timeout: Duration,
) -> KursResult<RenderedPage> {
    ctx.block_resources().await.map_err(engine_error)?;
    ctx.navigate(url, nav_timeout).await.map_err(engine_error)?;
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    match tokio::time::timeout(nav_timeout, ctx.snapshot()).await {
        Ok(page) => page.map_err(engine_error),
        Err(_) => Err(KursError::Timeout(nav_timeout)),
    }
}

/// Keep typed errors raised by the renderer, wrap everything else.
fn engine_error(e: anyhow::Error) -> KursError {
    match e.downcast::<KursError>() {
        Ok(typed) => typed,
        Err(other) => KursError::RenderEngine(format!("{other:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{NavigationResult, NoopRenderer};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedRenderer {
        open: Arc<AtomicUsize>,
        hang_navigation: bool,
        hang_snapshot: bool,
    }

    struct ScriptedContext {
        open: Arc<AtomicUsize>,
        hang_navigation: bool,
        hang_snapshot: bool,
    }

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn new_context(&self) -> anyhow::Result<Box<dyn RenderContext>> {
            self.open.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedContext {
                open: Arc::clone(&self.open),
                hang_navigation: self.hang_navigation,
                hang_snapshot: self.hang_snapshot,
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
    impl RenderContext for ScriptedContext {
        async fn block_resources(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn navigate(&mut self, url: &str, timeout: Duration) -> anyhow::Result<NavigationResult> {
            if self.hang_navigation {
                return Err(KursError::Timeout(timeout).into());
            }
            Ok(NavigationResult {
                final_url: url.to_string(),
                load_time_ms: 1,
            })
        }
        async fn snapshot(&self) -> anyhow::Result<RenderedPage> {
            if self.hang_snapshot {
                std::future::pending::<()>().await;
            }
            Ok(RenderedPage {
                html: "<p>USD 12 140 12 260</p>".into(),
                text: "USD 12 140 12 260".into(),
            })
        }
        async fn close(self: Box<Self>) -> anyhow::Result<()> {
            self.open.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_page_is_disposed_after_success() {
        let open = Arc::new(AtomicUsize::new(0));
        let r = ScriptedRenderer {
            open: Arc::clone(&open),
            hang_navigation: false,
            hang_snapshot: false,
        };
        let page = fetch_rendered(&r, "https://bank.test/", Duration::ZERO, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(page.text.contains("12 140"));
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_navigation_timeout_keeps_its_type_and_disposes() {
        let open = Arc::new(AtomicUsize::new(0));
        let r = ScriptedRenderer {
            open: Arc::clone(&open),
            hang_navigation: true,
            hang_snapshot: false,
        };
        let err = fetch_rendered(&r, "https://bank.test/", Duration::ZERO, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, KursError::Timeout(_)), "{err}");
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_snapshot_times_out_and_disposes() {
        let open = Arc::new(AtomicUsize::new(0));
        let r = ScriptedRenderer {
            open: Arc::clone(&open),
            hang_navigation: false,
            hang_snapshot: true,
        };
        let err = fetch_rendered(&r, "https://bank.test/", Duration::ZERO, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, KursError::Timeout(d) if d == Duration::from_secs(5)), "{err}");
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_engine_is_a_render_error() {
        let err = fetch_rendered(&NoopRenderer, "https://bank.test/", Duration::ZERO, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, KursError::RenderEngine(_)));
        assert!(err.is_network());
    }
}
