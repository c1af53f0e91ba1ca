// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Long-running mode: REST API, an initial cycle and the interval loop.

use super::Runtime;
use crate::config::RuntimeConfig;
use crate::rest::{self, AppState};
use crate::scheduler::Scheduler;
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

pub async fn run(config: RuntimeConfig) -> Result<()> {
    let host = config.host;
    let port = config.port;
    let interval = config.interval;
    let runtime = Runtime::start(config, true).await?;

    eprintln!(
        "  kurs v{} serving {} sources on http://{host}:{port} (every {} min)",
        env!("CARGO_PKG_VERSION"),
        runtime.scraper().registry().len(),
        interval.as_secs() / 60
    );

    let state = AppState::new(Arc::clone(&runtime.scheduler));
    let api = tokio::spawn(rest::start(host, port, state));

    let first = Arc::clone(&runtime.scheduler);
    tokio::spawn(initial_cycle(first));
    let ticker = tokio::spawn(Arc::clone(&runtime.scheduler).run_interval(interval));

    let result = tokio::select! {
        served = api => match served {
            Ok(r) => r,
            Err(e) => Err(anyhow::anyhow!("REST task failed: {e}")),
        },
        _ = shutdown_signal() => {
            info!("received shutdown signal");
            Ok(())
        }
    };

    ticker.abort();
    runtime.shutdown().await;
    eprintln!("  kurs stopped.");
    result
}

async fn initial_cycle(scheduler: Arc<Scheduler>) {
    match scheduler.trigger().await {
        Ok(outcome) => info!(?outcome, "initial cycle finished"),
        Err(e) => error!("initial cycle failed: {e}"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
