// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Per-send streaming state
//!
//! Separates chunk classification from transcript I/O so the orchestration
//! rules can be tested on their own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::llm::provider::{StreamChunk, ToolCallRequest};
use crate::tools::PendingToolCalls;

/// What a processed chunk asks the caller to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkAction {
    /// Text was appended; flush the buffer to the placeholder
    Flush,
    /// Tool calls were collected; nothing to show yet
    Collected(usize),
    /// Nothing changed
    Ignore,
}

/// State of one in-flight send
#[derive(Debug)]
pub struct StreamState {
    placeholder: usize,
    buffer: String,
    lead: String,
    cancelled: Arc<AtomicBool>,
    pending: PendingToolCalls,
}

impl StreamState {
    pub fn new(placeholder: usize, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            placeholder,
            buffer: String::new(),
            lead: String::new(),
            cancelled,
            pending: PendingToolCalls::new(),
        }
    }

    /// Transcript index of the assistant placeholder
    pub fn placeholder(&self) -> usize {
        self.placeholder
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancelled
    }

    /// Text accumulated so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Classify a chunk and fold it into the state.
    ///
    /// A chunk carrying tool calls is collected without a flush; its text,
    /// if any, is kept apart from the buffer as the lead-in to the calls.
    pub fn apply(&mut self, chunk: StreamChunk) -> ChunkAction {
        if chunk.has_tool_calls() {
            let mut added = 0;
            for call in chunk.tool_calls {
                if self.pending.push(call) {
                    added += 1;
                }
            }
            self.lead.push_str(&chunk.text);
            return ChunkAction::Collected(added);
        }

        if chunk.text.is_empty() {
            return ChunkAction::Ignore;
        }
        self.buffer.push_str(&chunk.text);
        ChunkAction::Flush
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain collected tool calls in arrival order
    pub fn take_tool_calls(&mut self) -> Vec<ToolCallRequest> {
        self.pending.take()
    }

    /// Streamed text plus the lead-in carried by tool-call chunks
    pub fn take_lead(&mut self) -> String {
        let lead = std::mem::take(&mut self.lead);
        format!("{}{}", self.buffer, lead)
    }

    /// Replace the whole buffer, e.g. with the reply to tool results
    pub fn replace_buffer(&mut self, text: String) {
        self.buffer = text;
    }

    /// Take the final text, leaving the buffer empty
    pub fn take_buffer(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}
