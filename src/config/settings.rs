// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for Lexi
//!
//! Handles loading and saving settings from ~/.lexi/settings.json

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chat::prompts::DEFAULT_SYSTEM_INSTRUCTION;

mod io;
mod migration;
mod validation;

/// Main settings structure, stored in ~/.lexi/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Generative provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Persistence backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Conversation defaults
    #[serde(default)]
    pub chat: ChatConfig,

    /// Attachment upload limits and polling
    #[serde(default)]
    pub uploads: UploadConfig,

    /// Audio capture settings
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Gemini-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// API key (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model to converse with
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for API (for custom endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: None,
        }
    }
}

/// Persistence backend configuration
///
/// Every persistence flag is off by default, in which case the client talks
/// to the provider only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Base URL of the REST backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bearer token (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name for the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Create a backend chat on the first send
    #[serde(default)]
    pub create_chat: bool,

    /// Persist user and assistant messages
    #[serde(default)]
    pub save_message: bool,

    /// Mirror attachments to the backend
    #[serde(default)]
    pub save_file: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            token_env: default_token_env(),
            create_chat: false,
            save_message: false,
            save_file: false,
        }
    }
}

/// Conversation defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// System instruction sent with every session
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// Backend prompt id used when creating chats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,

    /// Declare tools to the model and execute its tool calls
    #[serde(default)]
    pub use_tools: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_system_instruction(),
            prompt_id: None,
            use_tools: false,
        }
    }
}

/// Attachment upload limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadConfig {
    /// Files of this size or larger are rejected
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Delay between remote status checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of status checks before giving up
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
        }
    }
}

impl UploadConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Audio capture settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Recorder command that writes a WAV stream to stdout
    #[serde(default = "default_capture_command")]
    pub command: Vec<String>,

    /// Elapsed-time refresh interval
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            command: default_capture_command(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl CaptureConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

// Default value functions
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_token_env() -> String {
    "LEXI_BACKEND_TOKEN".to_string()
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_max_bytes() -> u64 {
    20_000_000
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_max_polls() -> u32 {
    30
}

fn default_capture_command() -> Vec<String> {
    ["arecord", "-q", "-f", "S16_LE", "-r", "16000", "-c", "1", "-t", "wav", "-"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tick_ms() -> u64 {
    1_000
}
