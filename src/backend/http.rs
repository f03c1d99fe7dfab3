// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! REST implementation of the persistence backend

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::Deserialize;

use super::{Backend, NewMessage, StoredMessage};
use crate::attachments::LocalFile;
use crate::error::{ApiError, LexiError, Result};

/// Backend client authenticated with an injected bearer token
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CreateChatResponse {
    chat: ChatRef,
}

#[derive(Debug, Deserialize)]
struct ChatRef {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<StoredMessage>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| LexiError::Api(ApiError::Network(e.to_string())))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LexiError::Api(ApiError::from_status(status, body)));
        }
        Ok(response)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_chat(&self, name: &str, prompt_id: &str) -> Result<String> {
        let body = serde_json::json!({ "name": name, "promptId": prompt_id });
        let response = self.send(self.client.post(self.url("chat")).json(&body)).await?;

        let parsed: CreateChatResponse = response
            .json()
            .await
            .map_err(|e| LexiError::Api(ApiError::InvalidResponse(e.to_string())))?;

        // Ids come back as strings or numbers depending on the deployment.
        let id = match parsed.chat.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(LexiError::Api(ApiError::InvalidResponse(format!(
                    "unexpected chat id: {}",
                    other
                ))))
            }
        };
        tracing::info!(target: "lexi.backend", chat_id = %id, "chat created");
        Ok(id)
    }

    async fn save_message(&self, chat_id: &str, message: &NewMessage) -> Result<()> {
        self.send(
            self.client
                .post(self.url(&format!("message/{}", chat_id)))
                .json(message),
        )
        .await?;
        tracing::debug!(
            target: "lexi.backend",
            chat_id,
            entity = message.entity.as_str(),
            "message saved"
        );
        Ok(())
    }

    async fn upload_file(&self, chat_id: &str, file: &LocalFile) -> Result<()> {
        let part = multipart::Part::bytes(file.data.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = multipart::Form::new().part("file", part);

        self.send(
            self.client
                .post(self.url(&format!("message/{}/file", chat_id)))
                .multipart(form),
        )
        .await?;
        tracing::debug!(target: "lexi.backend", chat_id, file = %file.name, "file stored");
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>> {
        let response = self
            .send(self.client.get(self.url(&format!("message/{}", chat_id))))
            .await?;
        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LexiError::Api(ApiError::InvalidResponse(e.to_string())))?;
        Ok(parsed.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let backend = HttpBackend::new("http://localhost:3333/api/", "t");
        assert_eq!(backend.url("chat"), "http://localhost:3333/api/chat");
        assert_eq!(backend.url("/message/7"), "http://localhost:3333/api/message/7");
    }
}
