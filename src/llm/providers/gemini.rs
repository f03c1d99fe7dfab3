// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Gemini provider implementation
//!
//! Implements the GenerativeProvider trait against the Generative Language
//! REST API: server-sent event streaming, raw file uploads and file state
//! queries.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::attachments::LocalFile;
use crate::error::{ApiError, LexiError, Result};
use crate::llm::message::{Content, Part, Role};
use crate::llm::provider::{
    ChunkStream, FileState, GenerativeProvider, RemoteFile, SessionConfig, StreamChunk,
    ToolCallRequest, ToolDefinition,
};
use crate::llm::session::SessionHandle;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    /// Create with a custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_request(&self, config: &SessionConfig, contents: &[Content]) -> GeminiRequest {
        let system_instruction = if config.system_instruction.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(&config.system_instruction)],
            })
        };

        GeminiRequest {
            contents: contents.iter().map(convert_content).collect(),
            system_instruction,
            tools: convert_tools(&config.tools),
        }
    }

    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GeminiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(LexiError::Api(ApiError::from_status(status, message)))
    }
}

fn convert_content(content: &Content) -> GeminiContent {
    let role = match content.role {
        Role::User => "user",
        Role::Model => "model",
    };
    GeminiContent {
        role: Some(role.to_string()),
        parts: content.parts.iter().map(convert_part).collect(),
    }
}

fn convert_part(part: &Part) -> GeminiPart {
    match part {
        Part::Text { text } => GeminiPart::text(text),
        Part::FileData {
            mime_type,
            file_uri,
        } => GeminiPart {
            file_data: Some(GeminiFileData {
                mime_type: mime_type.clone(),
                file_uri: file_uri.clone(),
            }),
            ..Default::default()
        },
        Part::FunctionCall { id, name, args } => GeminiPart {
            function_call: Some(GeminiFunctionCall {
                id: Some(id.clone()),
                name: name.clone(),
                args: args.clone(),
            }),
            ..Default::default()
        },
        Part::FunctionResponse { id, name, response } => GeminiPart {
            function_response: Some(GeminiFunctionResponse {
                id: Some(id.clone()),
                name: name.clone(),
                response: response.clone(),
            }),
            ..Default::default()
        },
    }
}

fn convert_tools(tools: &[ToolDefinition]) -> Option<Vec<GeminiTool>> {
    if tools.is_empty() {
        return None;
    }
    Some(vec![GeminiTool {
        function_declarations: tools
            .iter()
            .map(|t| GeminiFunctionDeclaration {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect(),
    }])
}

/// Convert one server-sent event payload into a chunk
fn parse_event(data: &str) -> Result<StreamChunk> {
    let event: GeminiStreamResponse = serde_json::from_str(data)
        .map_err(|e| LexiError::Api(ApiError::StreamError(format!("bad event: {}", e))))?;

    if let Some(error) = event.error {
        return Err(LexiError::Stream(error.message));
    }

    let mut chunk = StreamChunk::default();
    let parts = event
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    for part in parts {
        if let Some(text) = part.text {
            chunk.text.push_str(&text);
        }
        if let Some(call) = part.function_call {
            chunk.tool_calls.push(ToolCallRequest {
                call_id: call
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                name: call.name,
                arguments: call.args,
            });
        }
    }
    Ok(chunk)
}

fn map_file_state(state: Option<&str>) -> FileState {
    match state {
        Some("ACTIVE") => FileState::Active,
        Some("FAILED") => FileState::Failed,
        _ => FileState::Pending,
    }
}

/// Splits a server-sent event body into `data:` payloads.
///
/// Bytes are buffered until a full line arrives, so a UTF-8 sequence split
/// across network frames is decoded whole.
#[derive(Debug, Default)]
struct SseLines {
    pending: Vec<u8>,
}

impl SseLines {
    /// Feed one network frame and return the payloads of completed lines
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(line_end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=line_end).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Payload of a final event that arrived without a trailing newline
    fn finish(self) -> Option<String> {
        data_payload(&self.pending)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let data = line.trim().strip_prefix("data:")?.trim();
    (!data.is_empty()).then(|| data.to_string())
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn create_session(&self, config: SessionConfig) -> Result<SessionHandle> {
        let url = format!("{}/v1beta/models/{}", self.base_url, config.model);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| LexiError::ProviderUnavailable(e.to_string()))?;

        if let Err(e) = Self::check(response).await {
            return Err(LexiError::SessionCreationFailed(e.to_string()));
        }

        tracing::debug!(target: "lexi.llm.gemini", model = %config.model, "model reachable");
        Ok(SessionHandle::new(config))
    }

    async fn send_stream(&self, session: &SessionHandle, parts: Vec<Part>) -> Result<ChunkStream> {
        let mut contents = session.history();
        contents.push(Content::user(parts));
        let body = self.build_request(session.config(), &contents);

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url,
            session.config().model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LexiError::Api(ApiError::Network(e.to_string())))?;
        let response = Self::check(response).await?;

        tracing::debug!(
            target: "lexi.llm.gemini",
            session = %session.id(),
            turns = contents.len(),
            "stream opened"
        );

        let stream = response.bytes_stream();
        let chunk_stream = async_stream::try_stream! {
            let mut lines = SseLines::default();

            for await bytes in stream {
                let bytes = bytes.map_err(|e| LexiError::Api(ApiError::Network(e.to_string())))?;
                for data in lines.push(&bytes) {
                    yield parse_event(&data)?;
                }
            }

            if let Some(data) = lines.finish() {
                yield parse_event(&data)?;
            }
        };

        Ok(Box::pin(chunk_stream))
    }

    async fn upload_file(&self, file: &LocalFile) -> Result<RemoteFile> {
        let url = format!("{}/upload/v1beta/files", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", &file.mime_type)
            .body(file.data.clone())
            .send()
            .await
            .map_err(|e| LexiError::UploadFailed(e.to_string()))?;

        let response = Self::check(response)
            .await
            .map_err(|e| LexiError::UploadFailed(e.to_string()))?;

        let parsed: GeminiUploadResponse = response
            .json()
            .await
            .map_err(|e| LexiError::Api(ApiError::InvalidResponse(e.to_string())))?;

        let remote = RemoteFile {
            state: map_file_state(parsed.file.state.as_deref()),
            mime_type: parsed.file.mime_type.unwrap_or_else(|| file.mime_type.clone()),
            name: parsed.file.name,
            uri: parsed.file.uri,
        };
        tracing::debug!(
            target: "lexi.llm.gemini",
            name = %remote.name,
            state = ?remote.state,
            "file uploaded"
        );
        Ok(remote)
    }

    async fn file_status(&self, name: &str) -> Result<FileState> {
        let url = format!("{}/v1beta/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| LexiError::Api(ApiError::Network(e.to_string())))?;
        let response = Self::check(response).await?;

        let parsed: GeminiFileResource = response
            .json()
            .await
            .map_err(|e| LexiError::Api(ApiError::InvalidResponse(e.to_string())))?;
        Ok(map_file_state(parsed.state.as_deref()))
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<GeminiFileData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiUploadResponse {
    file: GeminiFileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFileResource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new("test-key");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.base_url, GEMINI_API_URL);
    }

    #[test]
    fn test_sse_lines_keep_split_multibyte_characters() {
        let event = "data: {\"text\": \"Câmara aprovou a emenda\"}\n\n".as_bytes();
        let split = event.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut lines = SseLines::default();
        assert!(lines.push(&event[..split]).is_empty());
        let payloads = lines.push(&event[split..]);

        assert_eq!(payloads, vec!["{\"text\": \"Câmara aprovou a emenda\"}".to_string()]);
        assert!(lines.finish().is_none());
    }

    #[test]
    fn test_sse_lines_skip_comments_and_keep_trailing_event() {
        let mut lines = SseLines::default();
        assert!(lines.push(b": keep-alive\r\n\r\ndata:\r\n").is_empty());
        assert_eq!(lines.push(b"data: {\"a\":1}\r\ndata: {\"b\""), vec!["{\"a\":1}".to_string()]);
        assert!(lines.push(b":2}").is_empty());
        assert_eq!(lines.finish().as_deref(), Some("{\"b\":2}"));
    }

    #[test]
    fn test_custom_base_url_trims_slash() {
        let provider = GeminiProvider::with_base_url("k", "http://localhost:9999/");
        assert_eq!(provider.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_parse_event_text_parts() {
        let chunk = parse_event(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.text, "Hello");
        assert!(!chunk.has_tool_calls());
    }

    #[test]
    fn test_parse_event_function_call_without_id_gets_one() {
        let chunk = parse_event(
            r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"current_datetime","args":{}}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.tool_calls.len(), 1);
        assert_eq!(chunk.tool_calls[0].name, "current_datetime");
        assert!(!chunk.tool_calls[0].call_id.is_empty());
    }

    #[test]
    fn test_parse_event_without_candidates_is_empty() {
        let chunk = parse_event(r#"{"usageMetadata":{"totalTokenCount":3}}"#).unwrap();
        assert_eq!(chunk, StreamChunk::default());
    }

    #[test]
    fn test_parse_event_error_payload() {
        let err = parse_event(r#"{"error":{"code":500,"message":"overloaded"}}"#).unwrap_err();
        assert!(matches!(err, LexiError::Stream(m) if m == "overloaded"));
    }

    #[test]
    fn test_map_file_state() {
        assert_eq!(map_file_state(Some("ACTIVE")), FileState::Active);
        assert_eq!(map_file_state(Some("FAILED")), FileState::Failed);
        assert_eq!(map_file_state(Some("PROCESSING")), FileState::Pending);
        assert_eq!(map_file_state(None), FileState::Pending);
    }

    #[test]
    fn test_request_serialization() {
        let provider = GeminiProvider::new("k");
        let config = SessionConfig {
            model: "m".to_string(),
            system_instruction: "be brief".to_string(),
            tools: vec![ToolDefinition {
                name: "t".to_string(),
                description: "d".to_string(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            history: Vec::new(),
        };
        let contents = vec![Content::user(vec![
            Part::text("hi"),
            Part::FileData {
                mime_type: "application/pdf".to_string(),
                file_uri: "uri://f".to_string(),
            },
        ])];
        let json = serde_json::to_value(provider.build_request(&config, &contents)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][1]["fileData"]["fileUri"], "uri://f");
        assert_eq!(json["tools"][0]["functionDeclarations"][0]["name"], "t");
    }

    #[test]
    fn test_request_omits_tools_when_empty() {
        let provider = GeminiProvider::new("k");
        let json =
            serde_json::to_value(provider.build_request(&SessionConfig::default(), &[])).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("systemInstruction").is_none());
    }
}
