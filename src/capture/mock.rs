// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Scripted audio source for testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{AudioInput, AudioSource};
use crate::error::{LexiError, Result};

/// Audio source replaying fixed chunks
#[derive(Clone, Default)]
pub struct MockAudioSource {
    chunks: Vec<Vec<u8>>,
    hold_open: bool,
    fail_read: bool,
    fail_open: Arc<AtomicBool>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MockAudioSource {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            ..Default::default()
        }
    }

    /// Keep the input open after the chunks run out, like a live device
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Fail the read following the last chunk
    pub fn fail_after_chunks(mut self) -> Self {
        self.fail_read = true;
        self
    }

    /// Make opening the device fail
    pub fn fail_open(self) -> Self {
        self.fail_open.store(true, Ordering::SeqCst);
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSource for MockAudioSource {
    async fn open(&self) -> Result<Box<dyn AudioInput>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(LexiError::Capture("mock device unavailable".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAudioInput {
            chunks: self.chunks.clone().into(),
            hold_open: self.hold_open,
            fail_read: self.fail_read,
            closes: self.closes.clone(),
        }))
    }
}

struct MockAudioInput {
    chunks: VecDeque<Vec<u8>>,
    hold_open: bool,
    fail_read: bool,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl AudioInput for MockAudioInput {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }
        if self.fail_read {
            return Err(LexiError::Capture("mock device read failure".to_string()));
        }
        if self.hold_open {
            futures::future::pending::<()>().await;
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
