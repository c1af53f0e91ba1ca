// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! One cycle from the command line.

use super::Runtime;
use crate::config::RuntimeConfig;
use crate::scheduler::CycleOutcome;
use crate::scrape::summary_table;
use anyhow::Result;

pub async fn run(config: RuntimeConfig, json: bool, no_browser: bool) -> Result<()> {
    let runtime = Runtime::start(config, !no_browser).await?;
    let outcome = runtime.scheduler.trigger().await;
    runtime.shutdown().await;
    let outcome = outcome?;

    let snapshot = runtime.scheduler.store().current().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "committed": outcome.is_committed(),
            "snapshot": &*snapshot,
        }))?);
        return Ok(());
    }

    match outcome {
        CycleOutcome::Committed(c) => {
            print!("{}", summary_table(&snapshot));
            println!();
            println!(
                "  Resolved {}/{} (full {}, partial {}), saved to {}",
                c.resolved,
                c.total,
                c.full,
                c.partial,
                runtime.scheduler.store().path().display()
            );
        }
        CycleOutcome::Discarded(c) => {
            println!(
                "  Only {}/{} sources resolved; previous snapshot kept.",
                c.resolved, c.total
            );
        }
        CycleOutcome::AlreadyRunning => println!("  A cycle is already running."),
    }
    Ok(())
}
