// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::sync::Arc;

use lexi::backend::{Backend, HttpBackend};
use lexi::capture::{AudioSource, CommandAudioSource};
use lexi::chat::{ChatController, ChatOptions};
use lexi::config::Settings;
use lexi::error::{LexiError, Result};
use lexi::llm::provider::GenerativeProvider;
use lexi::llm::providers::GeminiProvider;
use lexi::tools::ToolRegistry;

/// Command-line overrides applied on top of the loaded settings
#[derive(Debug, Default)]
pub(super) struct Overrides {
    pub model: Option<String>,
    pub tools: bool,
}

pub(super) fn apply_overrides(settings: &mut Settings, overrides: Overrides) {
    if let Some(model) = overrides.model {
        settings.provider.model = model;
    }
    if overrides.tools {
        settings.chat.use_tools = true;
    }
}

pub(super) fn build_provider(settings: &Settings) -> Result<Arc<dyn GenerativeProvider>> {
    let api_key = settings.get_api_key().ok_or_else(|| {
        LexiError::Config(format!(
            "No API key configured. Set {} or provider.api_key in {}",
            settings.provider.api_key_env,
            Settings::default_path().display()
        ))
    })?;

    let provider = match &settings.provider.base_url {
        Some(url) => GeminiProvider::with_base_url(api_key, url),
        None => GeminiProvider::new(api_key),
    };
    Ok(Arc::new(provider))
}

/// The persistence backend, when one is configured
pub(super) fn build_backend(settings: &Settings) -> Result<Option<Arc<dyn Backend>>> {
    let Some(base_url) = &settings.backend.base_url else {
        return Ok(None);
    };
    let token = settings.get_backend_token().ok_or_else(|| {
        LexiError::Config(format!(
            "backend.base_url is set but no token was found. Set {} or backend.token",
            settings.backend.token_env
        ))
    })?;
    Ok(Some(Arc::new(HttpBackend::new(base_url.clone(), token))))
}

pub(super) fn build_controller(settings: &Settings) -> Result<ChatController> {
    settings.validate()?;

    let provider = build_provider(settings)?;
    let mut controller = ChatController::new(provider, ChatOptions::from_settings(settings));

    if let Some(backend) = build_backend(settings)? {
        controller = controller.with_backend(backend);
    }
    if settings.chat.use_tools {
        controller = controller.with_tools(Arc::new(ToolRegistry::with_builtins()));
    }

    let source: Arc<dyn AudioSource> = Arc::new(CommandAudioSource::new(&settings.capture.command)?);
    controller = controller.with_audio_source(source);

    tracing::debug!(
        target: "lexi.chat.controller",
        model = %settings.provider.model,
        tools = settings.chat.use_tools,
        persistence = settings.persistence_enabled(),
        "controller ready"
    );
    Ok(controller)
}
