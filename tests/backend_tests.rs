// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lexi::attachments::LocalFile;
use lexi::backend::{Backend, Entity, HttpBackend, NewMessage};
use lexi::error::{ApiError, LexiError};

async fn backend() -> (MockServer, HttpBackend) {
    let server = MockServer::start().await;
    let backend = HttpBackend::new(server.uri(), "secret-token");
    (server, backend)
}

#[tokio::test]
async fn test_create_chat_sends_name_and_prompt_with_bearer() {
    let (server, backend) = backend().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(serde_json::json!({ "name": "Bill 12 status", "promptId": "7" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "chat": { "id": 315 } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = backend.create_chat("Bill 12 status", "7").await.unwrap();
    assert_eq!(id, "315");
}

#[tokio::test]
async fn test_create_chat_accepts_string_ids() {
    let (server, backend) = backend().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "chat": { "id": "abc" } })),
        )
        .mount(&server)
        .await;

    assert_eq!(backend.create_chat("n", "p").await.unwrap(), "abc");
}

#[tokio::test]
async fn test_save_message_body_shape() {
    let (server, backend) = backend().await;
    Mock::given(method("POST"))
        .and(path("/message/315"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(serde_json::json!({
            "text": "What is bill 12?",
            "entity": "user",
            "mimeType": "text"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    backend
        .save_message("315", &NewMessage::text(Entity::User, "What is bill 12?"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_file_is_multipart_field_file() {
    let (server, backend) = backend().await;
    Mock::given(method("POST"))
        .and(path("/message/315/file"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"audio.wav\""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let file = LocalFile::new("audio.wav", "audio/wav", b"RIFF".to_vec());
    backend.upload_file("315", &file).await.unwrap();
}

#[tokio::test]
async fn test_list_messages_parses_camel_case() {
    let (server, backend) = backend().await;
    Mock::given(method("GET"))
        .and(path("/message/315"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [
                { "text": "hi", "entity": "user", "mimeType": "text" },
                { "text": "", "entity": "user", "mimeType": "application/pdf",
                  "fileUrl": "https://files.example.com/315/bill.pdf" },
                { "text": "Hello.", "entity": "ai", "mimeType": "text", "fileUrl": null }
            ]
        })))
        .mount(&server)
        .await;

    let messages = backend.list_messages("315").await.unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].file_url.as_deref(), Some("https://files.example.com/315/bill.pdf"));
    assert_eq!(messages[2].entity, "ai");
    assert!(messages[2].file_url.is_none());
}

#[tokio::test]
async fn test_error_statuses_map_to_api_errors() {
    let (server, backend) = backend().await;
    Mock::given(method("GET"))
        .and(path("/message/1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/message/2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    assert!(matches!(
        backend.list_messages("1").await,
        Err(LexiError::Api(ApiError::AuthenticationFailed))
    ));
    match backend.list_messages("2").await {
        Err(LexiError::Api(ApiError::ServerError { status, message })) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected server error, got {:?}", other),
    }
}
