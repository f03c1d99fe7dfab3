// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Lexi - legislative assistant for your terminal
//!
//! Entry point for the Lexi CLI application.

use clap::Parser;

use lexi::cli::{ChatArgs, Cli, Commands};
use lexi::config::Settings;
use lexi::error::Result;

#[path = "main/commands.rs"]
mod commands;
#[path = "main/repl.rs"]
mod repl;
#[path = "main/runtime.rs"]
mod runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` turns on the lexi targets; `RUST_LOG` still takes precedence.
    if cli.verbose > 0 {
        let level = if cli.verbose > 1 { "trace" } else { "debug" };
        if let Ok(parsed) = format!("lexi={}", level).parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load_from(&settings_path)?;

    match cli.command {
        None => repl::run_chat(ChatArgs::default(), settings).await,
        Some(Commands::Chat(args)) => repl::run_chat(args, settings).await,
        Some(Commands::Ask(args)) => commands::run_ask(args, settings).await,
        Some(Commands::History(args)) => commands::run_history(args, settings).await,
        Some(Commands::Settings(args)) => commands::run_settings(args, settings, &settings_path),
    }
}
