// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use lexi::chat::{ChatController, ChatOptions, SendOutcome};
use lexi::error::{LexiError, Result};
use lexi::llm::message::Part;
use lexi::llm::mock_provider::MockProvider;
use lexi::llm::provider::{StreamChunk, ToolCallRequest, ToolDefinition};
use lexi::tools::{SchemaBuilder, Tool, ToolDispatcher, ToolRegistry};

/// Looks up a bill by number from a fixed table
struct BillLookupTool;

#[async_trait]
impl Tool for BillLookupTool {
    fn name(&self) -> &str {
        "lookup_bill"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "lookup_bill".to_string(),
            description: "Find a bill by number".to_string(),
            parameters: SchemaBuilder::new()
                .integer("number", "Bill number", true)
                .build(),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        match args.get("number").and_then(Value::as_i64) {
            Some(12) => Ok(json!({ "title": "Water Rights Act", "status": "in committee" })),
            Some(n) => Err(LexiError::InvalidInput(format!("no bill {}", n))),
            None => Err(LexiError::InvalidInput("number is required".to_string())),
        }
    }
}

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::with_builtins();
    registry.register(Arc::new(BillLookupTool));
    Arc::new(registry)
}

fn request(id: &str, name: &str, args: Value) -> ToolCallRequest {
    ToolCallRequest {
        call_id: id.to_string(),
        name: name.to_string(),
        arguments: args,
    }
}

#[test]
fn test_registry_declares_in_registration_order() {
    let names: Vec<String> = registry().declare().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["current_datetime", "lookup_bill"]);
}

#[tokio::test]
async fn test_results_keep_request_order_and_isolate_failures() {
    let dispatcher = ToolDispatcher::new(registry());
    let results = dispatcher
        .run_calls(&[
            request("a", "lookup_bill", json!({ "number": 12 })),
            request("b", "repeal_bill", json!({})),
            request("c", "lookup_bill", json!({ "number": 99 })),
            request("d", "current_datetime", json!({})),
        ])
        .await;

    let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert!(!results[0].is_error);
    assert_eq!(results[0].output["title"], "Water Rights Act");
    assert!(results[1].is_error);
    assert!(results[2].is_error);
    assert!(!results[3].is_error);
}

#[tokio::test]
async fn test_custom_tool_through_controller() {
    let provider = Arc::new(
        MockProvider::new()
            .with_chunks(vec![StreamChunk::tool_call(
                "call-7",
                "lookup_bill",
                json!({ "number": 12 }),
            )])
            .with_text_stream(&["Bill 12 is the Water Rights Act, now in committee."]),
    );
    let controller = ChatController::new(
        provider.clone(),
        ChatOptions {
            use_tools: true,
            ..Default::default()
        },
    )
    .with_tools(registry());
    controller.set_input("What is bill 12?");

    assert_eq!(controller.send_message().await, SendOutcome::Completed);
    assert_eq!(
        controller.messages()[1].content,
        "Bill 12 is the Water Rights Act, now in committee."
    );

    let sends = provider.sends();
    match &sends[1].parts[0] {
        Part::FunctionResponse { id, response, .. } => {
            assert_eq!(id, "call-7");
            assert_eq!(response["status"], "in committee");
        }
        other => panic!("expected function response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chained_tool_rounds() {
    let provider = Arc::new(
        MockProvider::new()
            .with_chunks(vec![StreamChunk::tool_call("r1", "current_datetime", json!({}))])
            .with_chunks(vec![StreamChunk::tool_call("r2", "lookup_bill", json!({ "number": 12 }))])
            .with_text_stream(&["Today bill 12 is in committee."]),
    );
    let controller = ChatController::new(
        provider.clone(),
        ChatOptions {
            use_tools: true,
            ..Default::default()
        },
    )
    .with_tools(registry());
    controller.set_input("Where is bill 12 today?");

    controller.send_message().await;

    assert_eq!(provider.sends().len(), 3);
    assert_eq!(controller.messages()[1].content, "Today bill 12 is in committee.");
}
