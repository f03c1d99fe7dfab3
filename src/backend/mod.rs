// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Persistence backend
//!
//! Chats, messages and mirrored files are stored by a bearer-authenticated
//! REST service. The orchestrator only talks to it through [`Backend`].

pub mod http;
pub mod mock;

pub use http::HttpBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::attachments::LocalFile;
use crate::error::Result;

/// Who authored a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    User,
    Ai,
}

impl Entity {
    /// Map a stored entity string; anything but `user` counts as the assistant
    pub fn parse(value: &str) -> Self {
        if value == "user" {
            Entity::User
        } else {
            Entity::Ai
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::User => "user",
            Entity::Ai => "ai",
        }
    }
}

/// A message as sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub text: String,
    pub entity: Entity,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl NewMessage {
    /// A plain text message
    pub fn text(entity: Entity, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity,
            mime_type: "text".to_string(),
            file_url: None,
        }
    }
}

/// A message as returned by the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Persistence operations used by the chat controller
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create a chat and return its id
    async fn create_chat(&self, name: &str, prompt_id: &str) -> Result<String>;

    /// Store one message under a chat
    async fn save_message(&self, chat_id: &str, message: &NewMessage) -> Result<()>;

    /// Store a file under a chat
    async fn upload_file(&self, chat_id: &str, file: &LocalFile) -> Result<()>;

    /// List a chat's messages in order
    async fn list_messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_parse() {
        assert_eq!(Entity::parse("user"), Entity::User);
        assert_eq!(Entity::parse("ai"), Entity::Ai);
        assert_eq!(Entity::parse("model"), Entity::Ai);
    }

    #[test]
    fn test_new_message_serialization() {
        let json = serde_json::to_value(NewMessage::text(Entity::User, "hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "hello", "entity": "user", "mimeType": "text"})
        );
    }

    #[test]
    fn test_stored_message_tolerates_missing_fields() {
        let msg: StoredMessage = serde_json::from_str(r#"{"text": "hi", "entity": "ai"}"#).unwrap();
        assert_eq!(msg.text, "hi");
        assert!(msg.file_url.is_none());
    }
}
