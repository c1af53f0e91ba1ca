// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! List the configured sources.

use anyhow::Result;
use kurs_core::default_registry;

pub fn run(json: bool) -> Result<()> {
    let registry = default_registry();
    if json {
        println!("{}", serde_json::to_string_pretty(registry.sources())?);
        return Ok(());
    }
    for (i, s) in registry.iter().enumerate() {
        let alt = if s.alt_url.is_some() { " +alt" } else { "" };
        println!(
            "  {:>2}  {:<26} {:<8} {:<9}{alt}  {}",
            i,
            s.name,
            s.mode.method_label(),
            s.variant.as_str(),
            s.url
        );
    }
    println!();
    println!(
        "  {} sources ({} fetched, {} rendered)",
        registry.len(),
        registry.light().count(),
        registry.heavy().count()
    );
    Ok(())
}
