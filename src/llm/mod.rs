// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM module for Lexi
//!
//! Provides the provider abstraction, session lifecycle and the Gemini
//! implementation.

pub mod message;
pub mod mock_provider;
pub mod provider;
pub mod providers;
pub mod session;

pub use message::*;
pub use provider::*;
pub use session::{SessionHandle, SessionManager};
