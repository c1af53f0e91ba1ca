// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use kurs_runtime::cli;
use kurs_runtime::config::RuntimeConfig;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kurs",
    about = "kurs: USD buy/sell rates collected from bank websites",
    version,
    after_help = "Configuration is read from KURS_* environment variables; flags override them.\nRun 'kurs <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Lower bound of a plausible rate (KURS_RATE_MIN)
    #[arg(long, global = true)]
    rate_min: Option<i64>,

    /// Upper bound of a plausible rate (KURS_RATE_MAX)
    #[arg(long, global = true)]
    rate_max: Option<i64>,

    /// Resource profile: desktop or constrained (KURS_PROFILE)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Snapshot file (KURS_DATA_FILE)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Chrome/Chromium executable (KURS_CHROME_PATH)
    #[arg(long, global = true)]
    chrome_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and collect on a schedule
    Serve {
        /// HTTP port (KURS_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Bind address (KURS_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Minutes between cycles (KURS_INTERVAL_MINUTES)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Run one cycle and save it if enough sources resolved
    Scrape {
        /// Do not launch a browser; rendered sources use static fallbacks
        #[arg(long)]
        no_browser: bool,
    },
    /// Show every strategy's result for one source
    Debug {
        /// Source name or part of it (case-insensitive)
        name: String,
    },
    /// List the configured sources
    Sources,
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

impl Cli {
    /// Flags that override `KURS_*` variables.
    fn overrides(&self) -> HashMap<&'static str, String> {
        let mut map = HashMap::new();
        if let Some(v) = self.rate_min {
            map.insert("KURS_RATE_MIN", v.to_string());
        }
        if let Some(v) = self.rate_max {
            map.insert("KURS_RATE_MAX", v.to_string());
        }
        if let Some(v) = &self.profile {
            map.insert("KURS_PROFILE", v.clone());
        }
        if let Some(v) = &self.data_file {
            map.insert("KURS_DATA_FILE", v.display().to_string());
        }
        if let Some(v) = &self.chrome_path {
            map.insert("KURS_CHROME_PATH", v.display().to_string());
        }
        if let Commands::Serve {
            port,
            host,
            interval,
        } = &self.command
        {
            if let Some(v) = port {
                map.insert("KURS_PORT", v.to_string());
            }
            if let Some(v) = host {
                map.insert("KURS_HOST", v.clone());
            }
            if let Some(v) = interval {
                map.insert("KURS_INTERVAL_MINUTES", v.to_string());
            }
        }
        map
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose, cli.log_json);

    let overrides = cli.overrides();
    let config = || RuntimeConfig::load(&overrides);

    let result = match &cli.command {
        Commands::Serve { .. } => match config() {
            Ok(c) => cli::serve::run(c).await,
            Err(e) => Err(e.into()),
        },
        Commands::Scrape { no_browser } => match config() {
            Ok(c) => cli::scrape_cmd::run(c, cli.json, *no_browser).await,
            Err(e) => Err(e.into()),
        },
        Commands::Debug { name } => match config() {
            Ok(c) => cli::debug_cmd::run(c, name, cli.json).await,
            Err(e) => Err(e.into()),
        },
        Commands::Sources => cli::sources_cmd::run(cli.json),
        Commands::Doctor => cli::doctor::run(&overrides).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "kurs", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "error": true, "message": format!("{e:#}") })
            );
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
