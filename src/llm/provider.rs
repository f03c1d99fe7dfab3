// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Generative provider trait and related types
//!
//! Defines the narrow capability surface the chat orchestrator needs from a
//! hosted generative-text backend.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::attachments::LocalFile;
use crate::error::Result;
use crate::llm::message::{Content, Part};
use crate::llm::session::SessionHandle;

/// Stream of incremental response chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Main trait for generative providers
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Get the provider name (e.g., "gemini")
    fn name(&self) -> &str;

    /// Create a conversational session for the given configuration
    async fn create_session(&self, config: SessionConfig) -> Result<SessionHandle>;

    /// Send parts as the next user turn and stream the model's reply.
    ///
    /// The session's recorded history is sent ahead of `parts`; recording the
    /// new turn is left to the caller once the stream has been consumed.
    async fn send_stream(&self, session: &SessionHandle, parts: Vec<Part>) -> Result<ChunkStream>;

    /// Upload a file and return its initial remote state
    async fn upload_file(&self, file: &LocalFile) -> Result<RemoteFile>;

    /// Query the processing state of an uploaded file
    async fn file_status(&self, name: &str) -> Result<FileState>;
}

/// Everything that determines a session's identity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionConfig {
    /// Model to converse with
    pub model: String,

    /// System instruction
    pub system_instruction: String,

    /// Tools declared to the model (empty when tool use is off)
    pub tools: Vec<ToolDefinition>,

    /// History the session starts from
    pub history: Vec<Content>,
}

/// Tool declaration in provider format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Parameters schema (JSON Schema object)
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model mid-stream
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    /// Unique per request within a stream
    pub call_id: String,

    /// Tool name
    pub name: String,

    /// Arguments object
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    /// Convert back to the part the model emitted
    pub fn to_part(&self) -> Part {
        Part::FunctionCall {
            id: self.call_id.clone(),
            name: self.name.clone(),
            args: self.arguments.clone(),
        }
    }
}

/// One unit of an incremental response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    /// Text fragments carried by this chunk, concatenated
    pub text: String,

    /// Tool calls carried by this chunk
    pub tool_calls: Vec<ToolCallRequest>,
}

impl StreamChunk {
    /// Create a text-only chunk
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create a chunk carrying one tool call
    pub fn tool_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            text: String::new(),
            tool_calls: vec![ToolCallRequest {
                call_id: call_id.into(),
                name: name.into(),
                arguments,
            }],
        }
    }

    /// Whether this chunk carries any tool call
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Still processing
    Pending,
    /// Usable in messages
    Active,
    /// Terminal failure
    Failed,
}

/// A file known to the provider
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    /// Provider resource name used for status queries
    pub name: String,

    /// URI referenced from message parts
    pub uri: String,

    /// MIME type as recorded by the provider
    pub mime_type: String,

    /// Current processing state
    pub state: FileState,
}

impl RemoteFile {
    /// The message part referencing this file
    pub fn to_part(&self) -> Part {
        Part::FileData {
            mime_type: self.mime_type.clone(),
            file_uri: self.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_chunk_text() {
        let chunk = StreamChunk::text("hello");
        assert_eq!(chunk.text, "hello");
        assert!(!chunk.has_tool_calls());
    }

    #[test]
    fn test_stream_chunk_tool_call() {
        let chunk = StreamChunk::tool_call("call-1", "lookup", serde_json::json!({"q": "x"}));
        assert!(chunk.has_tool_calls());
        assert_eq!(chunk.tool_calls[0].call_id, "call-1");
        assert!(chunk.text.is_empty());
    }

    #[test]
    fn test_tool_call_to_part() {
        let request = ToolCallRequest {
            call_id: "c".to_string(),
            name: "n".to_string(),
            arguments: serde_json::json!({"a": 1}),
        };
        match request.to_part() {
            Part::FunctionCall { id, name, args } => {
                assert_eq!(id, "c");
                assert_eq!(name, "n");
                assert_eq!(args["a"], 1);
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_remote_file_to_part() {
        let file = RemoteFile {
            name: "files/abc".to_string(),
            uri: "https://example.com/files/abc".to_string(),
            mime_type: "application/pdf".to_string(),
            state: FileState::Active,
        };
        assert_eq!(
            file.to_part(),
            Part::FileData {
                mime_type: "application/pdf".to_string(),
                file_uri: "https://example.com/files/abc".to_string(),
            }
        );
    }

    #[test]
    fn test_session_config_equality_is_shallow_over_fields() {
        let a = SessionConfig {
            model: "m".to_string(),
            system_instruction: "s".to_string(),
            ..Default::default()
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.system_instruction = "other".to_string();
        assert_ne!(a, b);
    }
}
