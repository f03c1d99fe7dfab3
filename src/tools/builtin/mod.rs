// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Built-in tools for Lexi

mod datetime;

pub use datetime::CurrentDateTimeTool;
