// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for Lexi.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lexi - legislative assistant for your terminal
#[derive(Parser, Debug)]
#[command(name = "lexi")]
#[command(version, about = "Legislative assistant for your terminal")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start interactive chat session (default when no command given)
    Chat(ChatArgs),

    /// Ask a single question (non-interactive)
    Ask(AskArgs),

    /// Print the messages of a stored chat
    History(HistoryArgs),

    /// Manage configuration
    #[command(alias = "config")]
    Settings(SettingsArgs),
}

/// Arguments for the chat subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Resume a stored chat
    #[arg(long, value_name = "CHAT_ID")]
    pub resume: Option<String>,

    /// Declare the built-in tools to the model
    #[arg(long)]
    pub tools: bool,
}

/// Arguments for the ask subcommand
#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The question to ask (`-` reads it from stdin)
    #[arg(default_value = "")]
    pub prompt: String,

    /// File to send along with the question
    #[arg(short, long, value_name = "PATH")]
    pub attach: Option<PathBuf>,

    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Declare the built-in tools to the model
    #[arg(long)]
    pub tools: bool,
}

/// Arguments for the history subcommand
#[derive(clap::Args, Debug)]
pub struct HistoryArgs {
    /// Backend chat id
    pub chat_id: String,
}

/// Arguments for settings management
#[derive(clap::Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommands,
}

/// Settings subcommands
#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show current settings
    Show,

    /// Print the settings file path
    Path,

    /// Write a settings file with defaults
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Setting key (model, prompt_id, backend_url, use_tools)
        key: String,

        /// Value to set
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_command() {
        let cli = Cli::parse_from(["lexi"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_multiple() {
        let cli = Cli::parse_from(["lexi", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_chat_args() {
        let cli = Cli::parse_from(["lexi", "chat", "--resume", "42", "--tools", "-m", "gemini-2.5-pro"]);
        match cli.command {
            Some(Commands::Chat(args)) => {
                assert_eq!(args.resume.as_deref(), Some("42"));
                assert!(args.tools);
                assert_eq!(args.model.as_deref(), Some("gemini-2.5-pro"));
            }
            other => panic!("expected chat, got {:?}", other),
        }
    }

    #[test]
    fn test_ask_with_attachment() {
        let cli = Cli::parse_from(["lexi", "ask", "summarise this", "--attach", "bill.pdf"]);
        match cli.command {
            Some(Commands::Ask(args)) => {
                assert_eq!(args.prompt, "summarise this");
                assert_eq!(args.attach, Some(PathBuf::from("bill.pdf")));
                assert!(!args.tools);
            }
            other => panic!("expected ask, got {:?}", other),
        }
    }

    #[test]
    fn test_ask_attachment_only() {
        let cli = Cli::parse_from(["lexi", "ask", "-a", "memo.txt"]);
        match cli.command {
            Some(Commands::Ask(args)) => assert!(args.prompt.is_empty()),
            other => panic!("expected ask, got {:?}", other),
        }
    }

    #[test]
    fn test_history_requires_chat_id() {
        assert!(Cli::try_parse_from(["lexi", "history"]).is_err());
        let cli = Cli::parse_from(["lexi", "history", "chat-9"]);
        assert!(matches!(cli.command, Some(Commands::History(a)) if a.chat_id == "chat-9"));
    }

    #[test]
    fn test_settings_subcommands() {
        let cli = Cli::parse_from(["lexi", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Settings(SettingsArgs {
                command: SettingsCommands::Init { force: true }
            }))
        ));

        let cli = Cli::parse_from(["lexi", "settings", "set", "model", "gemini-2.5-pro"]);
        match cli.command {
            Some(Commands::Settings(SettingsArgs {
                command: SettingsCommands::Set { key, value },
            })) => {
                assert_eq!(key, "model");
                assert_eq!(value, "gemini-2.5-pro");
            }
            other => panic!("expected settings set, got {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["lexi", "settings", "show", "--config", "/tmp/lexi.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lexi.json")));
    }
}
