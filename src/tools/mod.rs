// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool system for Lexi
//!
//! Tools are declared to the model through the session configuration and
//! executed when the model requests them mid-stream. Results flow back as a
//! follow-up turn; see [`dispatch`].

pub mod builtin;
pub mod definition;
pub mod dispatch;

pub use definition::*;
pub use dispatch::*;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::llm::message::Part;
use crate::llm::provider::ToolDefinition;

/// Result of one tool call, correlated to its request by call id
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    /// The call id this result answers
    pub call_id: String,
    /// Tool name as requested
    pub name: String,
    /// Output value, or the error message for failed calls
    pub output: Value,
    /// Whether the call failed
    pub is_error: bool,
}

impl ToolCallResult {
    /// Create a successful result
    pub fn success(call_id: impl Into<String>, name: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            output,
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(call_id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            output: Value::String(error.into()),
            is_error: true,
        }
    }

    /// The response part returned to the model
    pub fn to_part(&self) -> Part {
        let response = if self.is_error {
            serde_json::json!({ "error": self.output })
        } else if self.output.is_object() {
            self.output.clone()
        } else {
            serde_json::json!({ "output": self.output })
        };
        Part::FunctionResponse {
            id: self.call_id.clone(),
            name: self.name.clone(),
            response,
        }
    }
}

/// Trait for implementing tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool definition for the model
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the model-supplied arguments
    async fn execute(&self, args: Value) -> Result<Value>;
}

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, so declarations stay stable between sends
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in tools
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(builtin::CurrentDateTimeTool));
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Provider-formatted declarations in registration order
    pub fn declare(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.definition())
            .collect()
    }

    /// List all tool names
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "Echo the arguments".to_string(),
                parameters: SchemaBuilder::new().string("text", "Text", true).build(),
            }
        }

        async fn execute(&self, args: Value) -> Result<Value> {
            Ok(args)
        }
    }

    #[test]
    fn test_registry_declares_in_registration_order() {
        let mut registry = ToolRegistry::with_builtins();
        registry.register(Arc::new(EchoTool));

        let names: Vec<_> = registry.declare().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["current_datetime", "echo"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_same_name_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("echo").is_none());
        assert!(registry.declare().is_empty());
    }

    #[test]
    fn test_result_to_part_wraps_scalars_and_errors() {
        let ok = ToolCallResult::success("1", "t", serde_json::json!(42));
        let err = ToolCallResult::error("2", "t", "boom");
        let obj = ToolCallResult::success("3", "t", serde_json::json!({"a": 1}));

        match ok.to_part() {
            Part::FunctionResponse { response, .. } => assert_eq!(response["output"], 42),
            other => panic!("unexpected part: {:?}", other),
        }
        match err.to_part() {
            Part::FunctionResponse { id, response, .. } => {
                assert_eq!(id, "2");
                assert_eq!(response["error"], "boom");
            }
            other => panic!("unexpected part: {:?}", other),
        }
        match obj.to_part() {
            Part::FunctionResponse { response, .. } => assert_eq!(response["a"], 1),
            other => panic!("unexpected part: {:?}", other),
        }
    }
}
