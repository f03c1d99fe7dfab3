// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock generative provider for testing
//!
//! Provides a scriptable implementation of the GenerativeProvider trait that
//! can be used in tests without making real API calls.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::attachments::LocalFile;
use crate::error::{LexiError, Result};
use crate::llm::message::{Content, Part};
use crate::llm::provider::{
    ChunkStream, FileState, GenerativeProvider, RemoteFile, SessionConfig, StreamChunk,
};
use crate::llm::session::SessionHandle;

/// One scripted item of a mock stream
#[derive(Debug, Clone)]
pub enum MockItem {
    /// Deliver a chunk
    Chunk(StreamChunk),
    /// Fail the stream at this point
    Error(String),
}

/// A scripted reply to one `send_stream` call
#[derive(Debug)]
pub enum MockStream {
    /// Deliver these items in order
    Items(Vec<MockItem>),
    /// Deliver whatever the test pushes into the channel
    Channel(mpsc::UnboundedReceiver<Result<StreamChunk>>),
    /// Fail before any chunk is delivered
    Reject(String),
}

/// A recorded `send_stream` call
#[derive(Debug, Clone)]
pub struct RecordedSend {
    /// Handle id the call was made on
    pub session_id: uuid::Uuid,
    /// History the session held at call time
    pub history: Vec<Content>,
    /// Parts sent as the new turn
    pub parts: Vec<Part>,
}

/// A scriptable mock provider
#[derive(Clone, Default)]
pub struct MockProvider {
    streams: Arc<Mutex<VecDeque<MockStream>>>,
    sends: Arc<Mutex<Vec<RecordedSend>>>,
    sessions_created: Arc<AtomicUsize>,
    fail_sessions: Arc<AtomicBool>,
    session_configs: Arc<Mutex<Vec<SessionConfig>>>,
    upload_state: Arc<Mutex<Option<FileState>>>,
    status_script: Arc<Mutex<VecDeque<FileState>>>,
    uploads: Arc<AtomicUsize>,
    status_checks: Arc<AtomicUsize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mock provider lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply made of text deltas
    pub fn with_text_stream(self, deltas: &[&str]) -> Self {
        let items = deltas
            .iter()
            .map(|d| MockItem::Chunk(StreamChunk::text(*d)))
            .collect();
        self.push_stream(MockStream::Items(items));
        self
    }

    /// Queue a reply made of arbitrary chunks
    pub fn with_chunks(self, chunks: Vec<StreamChunk>) -> Self {
        self.push_stream(MockStream::Items(
            chunks.into_iter().map(MockItem::Chunk).collect(),
        ));
        self
    }

    /// Queue a reply made of scripted items
    pub fn with_items(self, items: Vec<MockItem>) -> Self {
        self.push_stream(MockStream::Items(items));
        self
    }

    /// Queue a reply fed by the returned sender
    pub fn with_channel_stream(&self) -> mpsc::UnboundedSender<Result<StreamChunk>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push_stream(MockStream::Channel(rx));
        tx
    }

    /// Queue a `send_stream` call that fails immediately
    pub fn with_rejected_stream(self, message: impl Into<String>) -> Self {
        self.push_stream(MockStream::Reject(message.into()));
        self
    }

    /// State reported by the initial upload (default: active)
    pub fn with_upload_state(self, state: FileState) -> Self {
        *lock(&self.upload_state) = Some(state);
        self
    }

    /// States reported by successive status checks; the last one repeats
    pub fn with_status_script(self, states: Vec<FileState>) -> Self {
        *lock(&self.status_script) = states.into();
        self
    }

    /// Make session creation fail with `ProviderUnavailable`
    pub fn fail_sessions(&self, fail: bool) {
        self.fail_sessions.store(fail, Ordering::SeqCst);
    }

    fn push_stream(&self, stream: MockStream) {
        lock(&self.streams).push_back(stream);
    }

    /// Number of sessions created
    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    /// Configurations sessions were created from
    pub fn session_configs(&self) -> Vec<SessionConfig> {
        lock(&self.session_configs).clone()
    }

    /// All recorded sends
    pub fn sends(&self) -> Vec<RecordedSend> {
        lock(&self.sends).clone()
    }

    /// Number of uploads performed
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Number of status checks performed
    pub fn status_checks(&self) -> usize {
        self.status_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_session(&self, config: SessionConfig) -> Result<SessionHandle> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(LexiError::ProviderUnavailable(
                "mock provider offline".to_string(),
            ));
        }
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        lock(&self.session_configs).push(config.clone());
        Ok(SessionHandle::new(config))
    }

    async fn send_stream(&self, session: &SessionHandle, parts: Vec<Part>) -> Result<ChunkStream> {
        lock(&self.sends).push(RecordedSend {
            session_id: session.id(),
            history: session.history(),
            parts,
        });

        let scripted = lock(&self.streams).pop_front();
        match scripted {
            Some(MockStream::Items(items)) => {
                let results: Vec<Result<StreamChunk>> = items
                    .into_iter()
                    .map(|item| match item {
                        MockItem::Chunk(chunk) => Ok(chunk),
                        MockItem::Error(message) => Err(LexiError::Stream(message)),
                    })
                    .collect();
                Ok(stream::iter(results).boxed())
            }
            Some(MockStream::Channel(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            Some(MockStream::Reject(message)) => Err(LexiError::Stream(message)),
            None => Ok(stream::iter(vec![Ok(StreamChunk::text("Mock response"))]).boxed()),
        }
    }

    async fn upload_file(&self, file: &LocalFile) -> Result<RemoteFile> {
        let index = self.uploads.fetch_add(1, Ordering::SeqCst);
        let state = lock(&self.upload_state).unwrap_or(FileState::Active);
        Ok(RemoteFile {
            name: format!("files/mock-{}", index),
            uri: format!("mock://files/mock-{}", index),
            mime_type: file.mime_type.clone(),
            state,
        })
    }

    async fn file_status(&self, _name: &str) -> Result<FileState> {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        let mut script = lock(&self.status_script);
        let state = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().copied()
        };
        Ok(state.unwrap_or(FileState::Active))
    }
}
