// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.

use crate::config::RuntimeConfig;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::collections::HashMap;
use std::process::Command;

/// Check configuration, Chromium availability, the data file and memory.
pub async fn run(overrides: &HashMap<&'static str, String>) -> Result<()> {
    println!("kurs doctor");
    println!("===========");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let mut ready = true;

    // Configuration
    let config = match RuntimeConfig::load(overrides) {
        Ok(c) => {
            println!(
                "[OK] Configuration: band {}..{}, profile {}, batch {}",
                c.band.min,
                c.band.max,
                c.profile.as_str(),
                c.batch_size
            );
            Some(c)
        }
        Err(e) => {
            println!("[!!] Configuration: {e}");
            ready = false;
            None
        }
    };

    // Chromium
    let override_path = config.as_ref().and_then(|c| c.chrome_path.clone());
    match find_chromium(override_path.as_deref()) {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Rendered sources will use static fallbacks; set KURS_CHROME_PATH."
        ),
    }

    if let Some(c) = &config {
        // Data file directory
        let dir = c
            .data_file
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(|d| d.to_path_buf())
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        if dir.exists() {
            println!("[OK] Data file: {}", c.data_file.display());
        } else {
            println!("[!!] Data file directory does not exist: {}", dir.display());
        }

        match &c.channel_url {
            Some(url) => println!("[OK] Channel reconciliation: {url}"),
            None => println!("[--] Channel reconciliation disabled (KURS_CHANNEL_URL unset)"),
        }
    }

    // Available memory
    match get_available_memory_mb() {
        Some(mb) if mb >= 512 => println!("[OK] Available memory: {mb}MB (>= 512MB recommended)"),
        Some(mb) => println!("[!!] Available memory: {mb}MB (< 512MB, use KURS_PROFILE=constrained)"),
        None => println!("[??] Could not determine available memory"),
    }

    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
        println!("  Set KURS_RATE_MIN and KURS_RATE_MAX (or --rate-min/--rate-max).");
    }
    Ok(())
}

/// Get available memory in MB (platform-specific).
fn get_available_memory_mb() -> Option<u64> {
    #[cfg(target_os = "macos")]
    {
        let output = Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        let bytes: u64 = s.trim().parse().ok()?;
        Some(bytes / 1_048_576)
    }
    #[cfg(target_os = "linux")]
    {
        let output = Command::new("free").args(["-m"]).output().ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        s.lines()
            .find(|line| line.starts_with("Mem:"))
            .and_then(|line| line.split_whitespace().nth(6))
            .and_then(|v| v.parse().ok())
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}
