// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! In-memory backend for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use super::{Backend, NewMessage, StoredMessage};
use crate::attachments::LocalFile;
use crate::error::{LexiError, Result};

/// A recorded chat creation
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedChat {
    pub id: String,
    pub name: String,
    pub prompt_id: String,
}

/// Backend that keeps everything in memory and records every call
#[derive(Clone, Default)]
pub struct MockBackend {
    chats: Arc<Mutex<Vec<CreatedChat>>>,
    saved: Arc<Mutex<Vec<(String, NewMessage)>>>,
    files: Arc<Mutex<Vec<(String, String)>>>,
    stored: Arc<Mutex<HashMap<String, Vec<StoredMessage>>>>,
    next_id: Arc<AtomicUsize>,
    fail_create: Arc<AtomicBool>,
    fail_save: Arc<AtomicBool>,
    fail_upload: Arc<AtomicBool>,
    fail_list: Arc<AtomicBool>,
    create_gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the messages returned for `chat_id`
    pub fn with_messages(self, chat_id: &str, messages: Vec<StoredMessage>) -> Self {
        lock(&self.stored).insert(chat_id.to_string(), messages);
        self
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make the next `create_chat` wait until the returned gate is notified
    pub fn hold_next_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.create_gate) = Some(gate.clone());
        gate
    }

    /// Chats created so far
    pub fn chats(&self) -> Vec<CreatedChat> {
        lock(&self.chats).clone()
    }

    /// Messages saved so far, with their chat ids
    pub fn saved_messages(&self) -> Vec<(String, NewMessage)> {
        lock(&self.saved).clone()
    }

    /// Files stored so far as `(chat_id, file name)`
    pub fn files(&self) -> Vec<(String, String)> {
        lock(&self.files).clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn create_chat(&self, name: &str, prompt_id: &str) -> Result<String> {
        let gate = lock(&self.create_gate).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(LexiError::Backend("mock create_chat failure".to_string()));
        }
        let id = format!("chat-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.chats).push(CreatedChat {
            id: id.clone(),
            name: name.to_string(),
            prompt_id: prompt_id.to_string(),
        });
        Ok(id)
    }

    async fn save_message(&self, chat_id: &str, message: &NewMessage) -> Result<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(LexiError::Backend("mock save_message failure".to_string()));
        }
        lock(&self.saved).push((chat_id.to_string(), message.clone()));
        Ok(())
    }

    async fn upload_file(&self, chat_id: &str, file: &LocalFile) -> Result<()> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(LexiError::Backend("mock upload_file failure".to_string()));
        }
        lock(&self.files).push((chat_id.to_string(), file.name.clone()));
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(LexiError::Backend("mock list_messages failure".to_string()));
        }
        Ok(lock(&self.stored).get(chat_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Entity;

    #[tokio::test]
    async fn test_create_chat_assigns_sequential_ids() {
        let backend = MockBackend::new();
        assert_eq!(backend.create_chat("a", "p").await.unwrap(), "chat-1");
        assert_eq!(backend.create_chat("b", "p").await.unwrap(), "chat-2");
        assert_eq!(backend.chats()[1].name, "b");
    }

    #[tokio::test]
    async fn test_held_create_waits_for_release() {
        let backend = MockBackend::new();
        let gate = backend.hold_next_create();

        let pending = tokio::spawn({
            let backend = backend.clone();
            async move { backend.create_chat("held", "p").await }
        });
        tokio::task::yield_now().await;
        assert!(backend.chats().is_empty());

        gate.notify_one();
        assert_eq!(pending.await.unwrap().unwrap(), "chat-1");
        assert_eq!(backend.create_chat("next", "p").await.unwrap(), "chat-2");
    }

    #[tokio::test]
    async fn test_failure_toggles() {
        let backend = MockBackend::new();
        backend.fail_save(true);
        let result = backend
            .save_message("c", &NewMessage::text(Entity::User, "x"))
            .await;
        assert!(matches!(result, Err(LexiError::Backend(_))));
        assert!(backend.saved_messages().is_empty());
    }
}
