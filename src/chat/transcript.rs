// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! The user-visible transcript
//!
//! Append-only, except for in-place updates of the assistant placeholder
//! while a reply streams in.

use serde::{Deserialize, Serialize};

use crate::attachments::LocalFile;
use crate::backend::{Entity, StoredMessage};
use crate::llm::message::{Content, Role};

/// Content of the assistant placeholder before the first chunk arrives
pub const PLACEHOLDER: &str = "...";

/// Content shown in place of a reply that failed
pub const FAILURE_NOTICE: &str = "Sorry, something went wrong.";

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A file shown alongside a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub uri: String,
    pub mime_type: String,
    pub display_name: String,
}

impl AttachmentRef {
    /// Reference to a file that has not been uploaded anywhere yet
    pub fn local(file: &LocalFile) -> Self {
        Self {
            uri: format!("local:{}", file.name),
            mime_type: file.mime_type.clone(),
            display_name: file.name.clone(),
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Sender,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentRef>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Sender::User,
            content: content.into(),
            attachment: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Sender::Assistant,
            content: content.into(),
            attachment: None,
        }
    }

    /// The user's file message; its content is empty
    pub fn user_file(file: &LocalFile) -> Self {
        Self {
            role: Sender::User,
            content: String::new(),
            attachment: Some(AttachmentRef::local(file)),
        }
    }

    /// Map a stored backend message; any entity other than `user` is the assistant
    pub fn from_stored(stored: &StoredMessage) -> Self {
        let role = match Entity::parse(&stored.entity) {
            Entity::User => Sender::User,
            Entity::Ai => Sender::Assistant,
        };
        let attachment = stored.file_url.as_ref().filter(|u| !u.is_empty()).map(|url| AttachmentRef {
            uri: url.clone(),
            mime_type: stored
                .mime_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            display_name: url.rsplit('/').next().unwrap_or(url).to_string(),
        });
        Self {
            role,
            content: stored.text.clone(),
            attachment,
        }
    }
}

/// Ordered list of messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Replace the content of the message at `index`
    pub fn set_content(&mut self, index: usize, content: &str) -> bool {
        match self.messages.get_mut(index) {
            Some(message) => {
                if message.content != content {
                    message.content = content.to_string();
                }
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Rebuild a transcript and its seed history from stored messages.
///
/// Messages without text appear in the transcript but are left out of the
/// seed history, since a turn needs at least one non-empty part.
pub fn from_stored(stored: &[StoredMessage]) -> (Transcript, Vec<Content>) {
    let mut transcript = Transcript::new();
    let mut history = Vec::new();
    for message in stored {
        transcript.push(Message::from_stored(message));
        if message.text.is_empty() {
            continue;
        }
        let role = match Entity::parse(&message.entity) {
            Entity::User => Role::User,
            Entity::Ai => Role::Model,
        };
        history.push(Content::text(role, &message.text));
    }
    (transcript, history)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(text: &str, entity: &str, file_url: Option<&str>) -> StoredMessage {
        StoredMessage {
            text: text.to_string(),
            entity: entity.to_string(),
            mime_type: Some(if file_url.is_some() { "application/pdf" } else { "text" }.to_string()),
            file_url: file_url.map(str::to_string),
        }
    }

    #[test]
    fn test_push_returns_index_and_set_content_updates() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("hi"));
        let idx = transcript.push(Message::assistant(PLACEHOLDER));
        assert_eq!(idx, 1);

        assert!(transcript.set_content(idx, "Hello"));
        assert_eq!(transcript.get(1).unwrap().content, "Hello");
        assert!(!transcript.set_content(7, "nope"));
    }

    #[test]
    fn test_user_file_message() {
        let file = LocalFile::new("bill.pdf", "application/pdf", vec![1, 2]);
        let msg = Message::user_file(&file);
        assert_eq!(msg.role, Sender::User);
        assert!(msg.content.is_empty());
        let attachment = msg.attachment.unwrap();
        assert_eq!(attachment.display_name, "bill.pdf");
        assert_eq!(attachment.uri, "local:bill.pdf");
    }

    #[test]
    fn test_from_stored_maps_entities() {
        let (transcript, history) = from_stored(&[
            stored("question", "user", None),
            stored("answer", "ai", None),
            stored("other", "system", None),
        ]);

        let roles: Vec<_> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Sender::User, Sender::Assistant, Sender::Assistant]);

        let history_roles: Vec<_> = history.iter().map(|c| c.role).collect();
        assert_eq!(history_roles, vec![Role::User, Role::Model, Role::Model]);
        assert_eq!(history[1].joined_text(), "answer");
    }

    #[test]
    fn test_from_stored_file_message() {
        let (transcript, history) = from_stored(&[stored(
            "",
            "user",
            Some("https://files.example.com/chat/7/bill.pdf"),
        )]);

        let attachment = transcript.get(0).unwrap().attachment.clone().unwrap();
        assert_eq!(attachment.display_name, "bill.pdf");
        assert_eq!(attachment.mime_type, "application/pdf");
        assert!(history.is_empty());
    }
}
