// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool dispatch
//!
//! Executes tool-call requests collected from a stream, submits the results
//! as one follow-up turn and streams the model's answer. The cycle repeats
//! while the model keeps asking for tools, up to [`MAX_TOOL_ROUNDS`].

use futures::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LexiError, Result};
use crate::llm::message::{Content, Part, Role};
use crate::llm::provider::{GenerativeProvider, ToolCallRequest};
use crate::llm::session::SessionHandle;

use super::{ToolCallResult, ToolRegistry};

/// Maximum number of request/response cycles per send
pub const MAX_TOOL_ROUNDS: usize = 4;

/// Tool calls collected from one stream, in arrival order
#[derive(Debug, Default, Clone)]
pub struct PendingToolCalls {
    calls: Vec<ToolCallRequest>,
    seen: HashSet<String>,
}

impl PendingToolCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a call; a repeated call id is dropped with a warning
    pub fn push(&mut self, call: ToolCallRequest) -> bool {
        if !self.seen.insert(call.call_id.clone()) {
            tracing::warn!(
                target: "lexi.tools",
                call_id = %call.call_id,
                tool = %call.name,
                "duplicate tool call id dropped"
            );
            return false;
        }
        self.calls.push(call);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn take(&mut self) -> Vec<ToolCallRequest> {
        self.seen.clear();
        std::mem::take(&mut self.calls)
    }
}

/// Runs tool calls against a registry and feeds results back to the model
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one call; unknown tools and handler errors become error results
    pub async fn run_call(&self, request: &ToolCallRequest) -> ToolCallResult {
        let Some(tool) = self.registry.get(&request.name) else {
            let err = LexiError::UnknownTool(request.name.clone());
            tracing::warn!(target: "lexi.tools", call_id = %request.call_id, error = %err, "tool call rejected");
            return ToolCallResult::error(&request.call_id, &request.name, err.to_string());
        };

        match tool.execute(request.arguments.clone()).await {
            Ok(output) => {
                tracing::debug!(target: "lexi.tools", call_id = %request.call_id, tool = %request.name, "tool call succeeded");
                ToolCallResult::success(&request.call_id, &request.name, output)
            }
            Err(e) => {
                tracing::warn!(target: "lexi.tools", call_id = %request.call_id, tool = %request.name, error = %e, "tool call failed");
                ToolCallResult::error(&request.call_id, &request.name, e.to_string())
            }
        }
    }

    /// Execute all calls in request order
    pub async fn run_calls(&self, requests: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.run_call(request).await);
        }
        results
    }

    /// Answer `requests` and return the model's final text.
    ///
    /// The session must already hold the user turn that triggered the calls.
    /// `leading_text` is any text the model streamed before asking for tools.
    /// Consumption stops early when `cancelled` is set. On failure or
    /// cancellation every turn recorded here is rolled back, so the history
    /// never ends in an unanswered call.
    pub async fn execute(
        &self,
        requests: Vec<ToolCallRequest>,
        leading_text: &str,
        provider: &dyn GenerativeProvider,
        session: &SessionHandle,
        cancelled: &AtomicBool,
    ) -> Result<String> {
        let mark = session.history_len();
        let result = self
            .run_rounds(requests, leading_text, provider, session, cancelled)
            .await;
        if result.is_err() || cancelled.load(Ordering::SeqCst) {
            session.truncate_history(mark);
        }
        result
    }

    async fn run_rounds(
        &self,
        requests: Vec<ToolCallRequest>,
        leading_text: &str,
        provider: &dyn GenerativeProvider,
        session: &SessionHandle,
        cancelled: &AtomicBool,
    ) -> Result<String> {
        let mut requests = requests;
        let mut leading = leading_text.to_string();
        let mut round = 0;

        loop {
            round += 1;
            tracing::info!(
                target: "lexi.tools",
                round,
                calls = requests.len(),
                "dispatching tool calls"
            );

            let mut call_parts = Vec::with_capacity(requests.len() + 1);
            if !leading.is_empty() {
                call_parts.push(Part::text(&leading));
            }
            call_parts.extend(requests.iter().map(ToolCallRequest::to_part));
            session.record([Content::model(call_parts)]);

            let results = self.run_calls(&requests).await;
            let response_parts: Vec<Part> = results.iter().map(ToolCallResult::to_part).collect();

            let mut stream = provider.send_stream(session, response_parts.clone()).await?;
            let mut text = String::new();
            let mut pending = PendingToolCalls::new();

            while let Some(chunk) = stream.next().await {
                if cancelled.load(Ordering::SeqCst) {
                    return Ok(text);
                }
                let chunk = chunk?;
                for call in chunk.tool_calls {
                    pending.push(call);
                }
                text.push_str(&chunk.text);
            }
            if cancelled.load(Ordering::SeqCst) {
                return Ok(text);
            }

            session.record([Content::user(response_parts)]);

            if pending.is_empty() {
                if !text.is_empty() {
                    session.record([Content::text(Role::Model, &text)]);
                }
                return Ok(text);
            }

            if round >= MAX_TOOL_ROUNDS {
                tracing::warn!(
                    target: "lexi.tools",
                    rounds = round,
                    dropped = pending.len(),
                    "tool round limit reached; ignoring further calls"
                );
                if !text.is_empty() {
                    session.record([Content::text(Role::Model, &text)]);
                }
                return Ok(text);
            }

            requests = pending.take();
            leading = text;
        }
    }
}
