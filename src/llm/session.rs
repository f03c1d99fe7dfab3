// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Session handles and their lifecycle
//!
//! A [`SessionHandle`] is the client's reference to one provider-side
//! conversation. The [`SessionManager`] hands out the current handle and
//! replaces it whenever the configuration it was built from changes.

use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::error::Result;
use crate::llm::message::Content;
use crate::llm::provider::{GenerativeProvider, SessionConfig};

/// Cheaply cloneable reference to a provider-side conversation
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: Uuid,
    config: SessionConfig,
    history: Mutex<Vec<Content>>,
}

impl SessionHandle {
    /// Create a handle seeded with the configuration's history
    pub fn new(config: SessionConfig) -> Self {
        let history = config.history.clone();
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                config,
                history: Mutex::new(history),
            }),
        }
    }

    /// Unique handle id
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Configuration this handle was created from
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Snapshot of the recorded history
    pub fn history(&self) -> Vec<Content> {
        self.lock_history().clone()
    }

    /// Append completed turns to the history
    pub fn record(&self, turns: impl IntoIterator<Item = Content>) {
        self.lock_history().extend(turns);
    }

    /// Number of recorded turns
    pub fn history_len(&self) -> usize {
        self.lock_history().len()
    }

    /// Drop every turn recorded after the first `len`
    pub fn truncate_history(&self, len: usize) {
        self.lock_history().truncate(len);
    }

    /// Whether two handles refer to the same session
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock_history(&self) -> MutexGuard<'_, Vec<Content>> {
        match self.inner.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(target: "lexi.llm.session", "session history lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Owns the lifecycle of the current session
pub struct SessionManager {
    provider: Arc<dyn GenerativeProvider>,
    current: Mutex<Option<SessionHandle>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn GenerativeProvider>) -> Self {
        Self {
            provider,
            current: Mutex::new(None),
        }
    }

    /// Return the session for `config`, creating a fresh one when the
    /// configuration differs from the cached handle's.
    pub async fn ensure_session(&self, config: SessionConfig) -> Result<SessionHandle> {
        if let Some(handle) = self.current() {
            if handle.config() == &config {
                return Ok(handle);
            }
            tracing::debug!(
                target: "lexi.llm.session",
                previous = %handle.id(),
                "session configuration changed; recreating"
            );
        }

        let handle = self.provider.create_session(config).await?;
        tracing::info!(
            target: "lexi.llm.session",
            session = %handle.id(),
            provider = self.provider.name(),
            history = handle.config().history.len(),
            tools = handle.config().tools.len(),
            "session created"
        );
        *self.lock_current() = Some(handle.clone());
        Ok(handle)
    }

    /// Currently cached handle
    pub fn current(&self) -> Option<SessionHandle> {
        self.lock_current().clone()
    }

    /// Drop the cached handle so the next send creates a new session
    pub fn invalidate(&self) {
        if let Some(handle) = self.lock_current().take() {
            tracing::debug!(target: "lexi.llm.session", session = %handle.id(), "session invalidated");
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<SessionHandle>> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
