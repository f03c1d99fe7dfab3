// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Lexi - streaming chat client for a legislative-data assistant.
//!
//! This crate exposes the runtime used by the `lexi` CLI (`src/main.rs`).
//!
//! Architecture highlights:
//! - `chat`: the send state machine, transcript and per-send stream state
//! - `llm`: provider abstraction, session reuse and the Gemini implementation
//! - `attachments`: size validation, upload and activation polling
//! - `capture`: voice recording through an external recorder
//! - `tools`: tool registry and function-call dispatch
//! - `backend`: optional chat persistence over REST

pub mod attachments;
pub mod backend;
pub mod capture;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use error::{LexiError, Result};
