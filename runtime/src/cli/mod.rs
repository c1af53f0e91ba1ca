// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the kurs binary.

pub mod debug_cmd;
pub mod doctor;
pub mod scrape_cmd;
pub mod serve;
pub mod sources_cmd;

use crate::config::{Profile, RuntimeConfig};
use crate::renderer::chromium::{ChromiumRenderer, LaunchOptions};
use crate::renderer::{NoopRenderer, Renderer};
use crate::scheduler::Scheduler;
use crate::scrape::Scraper;
use crate::store::SnapshotStore;
use anyhow::Result;
use kurs_core::default_registry;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "kurs=info,kurs_runtime=info,kurs_core=info";

/// Install the global subscriber. `RUST_LOG` wins over the defaults.
pub fn init_tracing(verbose: bool, json: bool) {
    let fallback = if verbose {
        "kurs=debug,kurs_runtime=debug,kurs_core=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };
    if let Err(e) = installed {
        eprintln!("  Warning: logging already initialised: {e}");
    }
}

/// Launch Chromium, or fall back to static-only mode when it cannot start.
pub async fn launch_renderer(config: &RuntimeConfig) -> Arc<dyn Renderer> {
    let options = LaunchOptions {
        executable: config.chrome_path.clone(),
        constrained: config.profile == Profile::Constrained,
        request_timeout: Some(config.nav_timeout),
    };
    match ChromiumRenderer::launch(options).await {
        Ok(renderer) => Arc::new(renderer),
        Err(e) => {
            warn!("failed to initialize Chromium: {e:#}");
            warn!("running in static-only mode, rendered sources use fallbacks");
            Arc::new(NoopRenderer)
        }
    }
}

/// Everything a command needs to run cycles.
pub struct Runtime {
    pub scheduler: Arc<Scheduler>,
    pub renderer: Arc<dyn Renderer>,
}

impl Runtime {
    pub async fn start(config: RuntimeConfig, with_browser: bool) -> Result<Self> {
        info!(
            profile = config.profile.as_str(),
            batch_size = config.batch_size,
            rate_min = config.band.min,
            rate_max = config.band.max,
            "starting kurs v{}",
            env!("CARGO_PKG_VERSION")
        );
        let renderer: Arc<dyn Renderer> = if with_browser {
            launch_renderer(&config).await
        } else {
            Arc::new(NoopRenderer)
        };
        let store = Arc::new(SnapshotStore::open(config.data_file.clone()).await);
        let registry = Arc::new(default_registry());
        let scraper = Arc::new(Scraper::new(config, registry, Arc::clone(&renderer))?);
        Ok(Self {
            scheduler: Arc::new(Scheduler::new(scraper, store)),
            renderer,
        })
    }

    pub fn scraper(&self) -> &Arc<Scraper> {
        self.scheduler.scraper()
    }

    /// Close the browser, best-effort.
    pub async fn shutdown(&self) {
        if let Err(e) = self.renderer.shutdown().await {
            warn!("browser shutdown failed: {e:#}");
        }
    }
}
