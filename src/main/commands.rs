// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Read};
use std::path::Path;

use lexi::chat::transcript::{self, FAILURE_NOTICE};
use lexi::chat::SendOutcome;
use lexi::cli::{AskArgs, HistoryArgs, SettingsArgs, SettingsCommands};
use lexi::config::Settings;
use lexi::error::{LexiError, Result};

use super::repl::{print_message, send_and_render};
use super::runtime::{apply_overrides, build_backend, build_controller, Overrides};

/// Run a single question, optionally with an attachment
pub(super) async fn run_ask(args: AskArgs, mut settings: Settings) -> Result<()> {
    apply_overrides(
        &mut settings,
        Overrides {
            model: args.model,
            tools: args.tools,
        },
    );
    let controller = build_controller(&settings)?;

    let mut prompt = args.prompt;
    if prompt.trim() == "-" {
        prompt.clear();
        io::stdin().read_to_string(&mut prompt)?;
    }

    if let Some(path) = &args.attach {
        controller.attach_path(path).await?;
    }
    controller.set_input(prompt);

    match send_and_render(&controller).await? {
        SendOutcome::Completed | SendOutcome::Aborted => Ok(()),
        SendOutcome::Skipped => Err(LexiError::InvalidInput(
            "Nothing to send: give a question or --attach a file".to_string(),
        )),
        SendOutcome::Failed => Err(LexiError::Stream(FAILURE_NOTICE.to_string())),
    }
}

/// Print a stored chat
pub(super) async fn run_history(args: HistoryArgs, settings: Settings) -> Result<()> {
    let backend = build_backend(&settings)?.ok_or_else(|| {
        LexiError::Config("backend.base_url must be set to read chat history".to_string())
    })?;

    let stored = backend.list_messages(&args.chat_id).await?;
    let (loaded, _) = transcript::from_stored(&stored);
    if loaded.is_empty() {
        println!("Chat {} has no messages.", args.chat_id);
    }
    for message in loaded.messages() {
        print_message(message);
    }
    Ok(())
}

/// Run settings subcommands
pub(super) fn run_settings(args: SettingsArgs, mut settings: Settings, path: &Path) -> Result<()> {
    match args.command {
        SettingsCommands::Show => {
            let mut shown = settings.clone();
            // Never echo secrets.
            if shown.provider.api_key.is_some() {
                shown.provider.api_key = Some("********".to_string());
            }
            if shown.backend.token.is_some() {
                shown.backend.token = Some("********".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        SettingsCommands::Path => {
            println!("{}", path.display());
        }
        SettingsCommands::Init { force } => {
            Settings::init_at(path, force)?;
            println!("Wrote default settings to {}", path.display());
        }
        SettingsCommands::Set { key, value } => {
            apply_setting(&mut settings, &key, &value)?;
            settings.save_to(path)?;
            println!("Set {} = {}", key, value);
        }
    }
    Ok(())
}

fn apply_setting(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "model" => settings.provider.model = value.to_string(),
        "prompt_id" => settings.chat.prompt_id = Some(value.to_string()).filter(|v| !v.is_empty()),
        "backend_url" => settings.backend.base_url = Some(value.to_string()).filter(|v| !v.is_empty()),
        "use_tools" => {
            settings.chat.use_tools = value.parse().map_err(|_| {
                LexiError::InvalidInput(format!("use_tools expects true or false, got '{}'", value))
            })?
        }
        _ => {
            return Err(LexiError::InvalidInput(format!(
                "Unknown setting '{}'. Valid keys: model, prompt_id, backend_url, use_tools",
                key
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_setting_known_keys() {
        let mut settings = Settings::default();
        apply_setting(&mut settings, "model", "gemini-2.5-pro").unwrap();
        apply_setting(&mut settings, "prompt_id", "12").unwrap();
        apply_setting(&mut settings, "use_tools", "true").unwrap();
        apply_setting(&mut settings, "backend_url", "").unwrap();

        assert_eq!(settings.provider.model, "gemini-2.5-pro");
        assert_eq!(settings.chat.prompt_id.as_deref(), Some("12"));
        assert!(settings.chat.use_tools);
        assert!(settings.backend.base_url.is_none());
    }

    #[test]
    fn test_apply_setting_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(apply_setting(&mut settings, "use_tools", "maybe").is_err());
        assert!(apply_setting(&mut settings, "colour", "blue").is_err());
    }

    #[test]
    fn test_settings_init_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{}").unwrap();

        let args = SettingsArgs {
            command: SettingsCommands::Init { force: false },
        };
        assert!(run_settings(args, Settings::default(), &path).is_err());

        let args = SettingsArgs {
            command: SettingsCommands::Init { force: true },
        };
        run_settings(args, Settings::default(), &path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }
}
