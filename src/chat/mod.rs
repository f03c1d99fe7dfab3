// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat orchestration
//!
//! The [`ChatController`] runs sends against a generative provider and keeps
//! the user-visible [`Transcript`] in step with the streamed reply.

pub mod controller;
pub mod prompts;
pub mod stream;
pub mod transcript;

pub use controller::{AbortHandle, ChatController, ChatOptions, ChatView, SendOutcome, SendPhase};
pub use transcript::{AttachmentRef, Message, Sender, Transcript};
