// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{LexiError, Result};

use super::Settings;

impl Settings {
    /// Get the provider API key, checking env var first.
    pub fn get_api_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.provider.api_key_env)
            .ok()
            .or_else(|| self.provider.api_key.clone())
    }

    /// Get the backend bearer token, checking env var first.
    pub fn get_backend_token(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.backend.token_env)
            .ok()
            .or_else(|| self.backend.token.clone())
    }

    /// Whether any backend persistence flag is switched on.
    pub fn persistence_enabled(&self) -> bool {
        self.backend.create_chat || self.backend.save_message || self.backend.save_file
    }

    /// Reject combinations that cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.persistence_enabled() && self.backend.base_url.is_none() {
            return Err(LexiError::Config(
                "Backend persistence is enabled but backend.base_url is not set".to_string(),
            ));
        }
        if self.backend.create_chat && self.chat.prompt_id.is_none() {
            return Err(LexiError::Config(
                "backend.create_chat requires chat.prompt_id".to_string(),
            ));
        }
        if self.uploads.max_polls == 0 {
            return Err(LexiError::Config(
                "uploads.max_polls must be at least 1".to_string(),
            ));
        }
        if self.capture.command.is_empty() {
            return Err(LexiError::Config("capture.command is empty".to_string()));
        }
        Ok(())
    }
}
