// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Reading and writing `settings.json`
//!
//! The file may hold the Gemini API key and the backend token, so it is
//! written readable by the owner only.

use std::path::{Path, PathBuf};

use crate::error::{LexiError, Result};

use super::migration;
use super::Settings;

const HOME_ENV: &str = "LEXI_HOME";
const FILE_NAME: &str = "settings.json";

impl Settings {
    /// `settings.json` inside [`Settings::lexi_home`]
    pub fn default_path() -> PathBuf {
        Self::lexi_home().join(FILE_NAME)
    }

    /// `$LEXI_HOME`, else `~/.lexi`
    pub fn lexi_home() -> PathBuf {
        match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".lexi"),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load `path`, falling back to defaults when it does not exist.
    ///
    /// Legacy keys are migrated before deserializing; missing sections take
    /// their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(target: "lexi.config", path = %path.display(), "no settings file; using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let raw: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            LexiError::Config(format!("{} is not valid JSON: {}", path.display(), e))
        })?;
        let migrated = migration::migrate_on_load(raw.clone());
        if migrated != raw {
            tracing::info!(target: "lexi.config", path = %path.display(), "migrated legacy settings keys");
        }
        Ok(serde_json::from_value(migrated)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Write to `path`, deep-merging into the current file so keys this
    /// version does not know about survive. An unreadable existing file is
    /// replaced.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let ours = serde_json::to_value(self)?;
        let merged = match std::fs::read_to_string(path) {
            Ok(existing) => match serde_json::from_str::<serde_json::Value>(&existing) {
                Ok(theirs) => migration::deep_merge(theirs, ours),
                Err(e) => {
                    tracing::warn!(target: "lexi.config", path = %path.display(), error = %e, "replacing unreadable settings file");
                    ours
                }
            },
            Err(_) => ours,
        };
        write_private(path, &serde_json::to_string_pretty(&merged)?)
    }

    /// Write a fresh default file for `lexi settings init`
    pub fn init_at(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(LexiError::Config(format!(
                "{} already exists; use --force to overwrite",
                path.display()
            )));
        }
        let content = serde_json::to_string_pretty(&Self::default())?;
        write_private(path, &content)?;
        tracing::info!(target: "lexi.config", path = %path.display(), "wrote default settings");
        Ok(())
    }
}

fn write_private(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    restrict_permissions(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
