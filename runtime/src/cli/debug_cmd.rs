// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Show what every strategy sees on one source's page.

use super::Runtime;
use crate::config::RuntimeConfig;
use anyhow::{bail, Result};

pub async fn run(config: RuntimeConfig, name: &str, json: bool) -> Result<()> {
    let runtime = Runtime::start(config, true).await?;
    let Some(source) = runtime.scraper().registry().find(name).cloned() else {
        runtime.shutdown().await;
        bail!(
            "no source matches {name:?}; known sources: {}",
            runtime.scraper().registry().names().join(", ")
        );
    };

    let report = runtime.scraper().debug_source(&source).await;
    runtime.shutdown().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("  {} ({})", report.bank, report.method);
    println!("  {}", report.url);
    println!();
    println!(
        "  Result: buy={} sell={} [{}]",
        fmt(report.result.buy),
        fmt(report.result.sell),
        report.result.provenance
    );
    println!();
    println!("  Strategies on the primary page:");
    for s in &report.strategies {
        println!("    {:<28} buy={:<7} sell={}", s.strategy, fmt(s.buy), fmt(s.sell));
    }
    println!();
    println!("  Text:");
    for line in report.text_snippet.lines().take(60) {
        println!("    {line}");
    }
    Ok(())
}

fn fmt(v: Option<i64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "-".into())
}
