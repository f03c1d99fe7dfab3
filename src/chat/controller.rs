// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat controller
//!
//! Owns the transcript and drives one send at a time through the provider,
//! the attachment pipeline, tool dispatch and the persistence backend.
//! State changes are published as [`ChatView`] snapshots over a watch
//! channel; slow readers only ever see the latest one.

use futures::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

use crate::attachments::{AttachmentPipeline, LocalFile};
use crate::backend::{Backend, Entity, NewMessage};
use crate::capture::{AudioSource, CaptureController, CaptureStatus};
use crate::chat::stream::{ChunkAction, StreamState};
use crate::chat::transcript::{self, Message, Transcript, FAILURE_NOTICE, PLACEHOLDER};
use crate::config::{Settings, UploadConfig};
use crate::error::{LexiError, Result};
use crate::llm::message::{Content, Part, Role};
use crate::llm::provider::{GenerativeProvider, RemoteFile, SessionConfig};
use crate::llm::session::SessionManager;
use crate::tools::{ToolDispatcher, ToolRegistry};

/// Behaviour switches for a controller
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub system_instruction: String,
    /// Required for chat creation
    pub prompt_id: Option<String>,
    pub create_chat: bool,
    pub save_message: bool,
    pub save_file: bool,
    pub use_tools: bool,
    pub uploads: UploadConfig,
    pub capture_tick: Duration,
}

impl ChatOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.provider.model.clone(),
            system_instruction: settings.chat.system_instruction.clone(),
            prompt_id: settings.chat.prompt_id.clone(),
            create_chat: settings.backend.create_chat,
            save_message: settings.backend.save_message,
            save_file: settings.backend.save_file,
            use_tools: settings.chat.use_tools,
            uploads: settings.uploads,
            capture_tick: settings.capture.tick(),
        }
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Where the current send is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendPhase {
    #[default]
    Idle,
    Assembling,
    Uploading,
    CreatingSession,
    Streaming,
    ToolDispatch,
    Finalizing,
    Aborted,
}

/// Snapshot published to subscribers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatView {
    pub messages: Vec<Message>,
    pub loading: bool,
    pub chat_id: Option<String>,
    pub phase: SendPhase,
}

/// How a call to [`ChatController::send_message`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing to send, or another send was in flight
    Skipped,
    Completed,
    Aborted,
    /// The placeholder now shows the failure notice
    Failed,
}

type CancelSlot = Arc<Mutex<Option<Arc<AtomicBool>>>>;

/// Cloneable handle that cancels the in-flight send
#[derive(Clone)]
pub struct AbortHandle {
    current: CancelSlot,
}

impl AbortHandle {
    /// Request cancellation; returns false when nothing is in flight
    pub fn abort(&self) -> bool {
        match lock(&self.current).as_ref() {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                tracing::info!(target: "lexi.chat.controller", "abort requested");
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct ControllerState {
    transcript: Transcript,
    input: String,
    attachment: Option<LocalFile>,
    seed_history: Vec<Content>,
    chat_id: Option<String>,
    sending: bool,
    loading_chat: bool,
    phase: SendPhase,
}

impl ControllerState {
    fn view(&self) -> ChatView {
        ChatView {
            messages: self.transcript.messages().to_vec(),
            loading: self.sending || self.loading_chat,
            chat_id: self.chat_id.clone(),
            phase: self.phase,
        }
    }
}

/// Everything a send takes from the controller when it starts
struct Assembled {
    text: String,
    attachment: Option<LocalFile>,
    placeholder: usize,
    chat_id: Option<String>,
    seed_history: Vec<Content>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!(target: "lexi.chat.controller", "controller lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Name for a new chat: the first five words, else the file, else a default
pub fn chat_name(text: &str, attachment: Option<&LocalFile>) -> String {
    let words: Vec<&str> = text.split_whitespace().take(5).collect();
    if !words.is_empty() {
        return words.join(" ");
    }
    match attachment {
        Some(file) => format!("Chat with file {}", file.name),
        None => "New chat".to_string(),
    }
}

/// The streaming chat orchestrator
pub struct ChatController {
    provider: Arc<dyn GenerativeProvider>,
    backend: Option<Arc<dyn Backend>>,
    sessions: SessionManager,
    pipeline: AttachmentPipeline,
    dispatcher: Option<ToolDispatcher>,
    capture: Option<CaptureController>,
    options: ChatOptions,
    state: Mutex<ControllerState>,
    view_tx: watch::Sender<ChatView>,
    in_flight: AtomicBool,
    cancel: CancelSlot,
}

impl ChatController {
    pub fn new(provider: Arc<dyn GenerativeProvider>, options: ChatOptions) -> Self {
        let (view_tx, _) = watch::channel(ChatView::default());
        Self {
            sessions: SessionManager::new(provider.clone()),
            pipeline: AttachmentPipeline::new(options.uploads),
            provider,
            backend: None,
            dispatcher: None,
            capture: None,
            options,
            state: Mutex::new(ControllerState::default()),
            view_tx,
            in_flight: AtomicBool::new(false),
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Persist chats, messages and files through `backend`
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Make `registry` available to the model when tool use is enabled
    pub fn with_tools(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.dispatcher = Some(ToolDispatcher::new(registry));
        self
    }

    /// Enable voice recording from `source`
    pub fn with_audio_source(mut self, source: Arc<dyn AudioSource>) -> Self {
        self.capture = Some(CaptureController::new(source, self.options.capture_tick));
        self
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    // ----- observation -----

    pub fn subscribe(&self) -> watch::Receiver<ChatView> {
        self.view_tx.subscribe()
    }

    /// Recording status; stays idle when no audio source is configured
    pub fn subscribe_recording(&self) -> watch::Receiver<CaptureStatus> {
        match &self.capture {
            Some(capture) => capture.subscribe(),
            None => watch::channel(CaptureStatus::default()).1,
        }
    }

    /// Current snapshot
    pub fn view(&self) -> ChatView {
        lock(&self.state).view()
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.state).transcript.messages().to_vec()
    }

    pub fn chat_id(&self) -> Option<String> {
        lock(&self.state).chat_id.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn update<R>(&self, f: impl FnOnce(&mut ControllerState) -> R) -> R {
        let mut state = lock(&self.state);
        let result = f(&mut state);
        self.view_tx.send_replace(state.view());
        result
    }

    fn set_phase(&self, phase: SendPhase) {
        self.update(|st| st.phase = phase);
    }

    // ----- input and attachment -----

    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        lock(&self.state).input = text;
    }

    pub fn input(&self) -> String {
        lock(&self.state).input.clone()
    }

    /// Validate and stage `file`; an oversized file keeps any previous one
    pub fn attach_file(&self, file: LocalFile) -> Result<()> {
        self.pipeline.validate(&file)?;
        tracing::debug!(target: "lexi.chat.controller", file = %file.name, size = file.size_bytes(), "attachment staged");
        lock(&self.state).attachment = Some(file);
        Ok(())
    }

    pub async fn attach_path(&self, path: &Path) -> Result<()> {
        let file = self.pipeline.load(path).await?;
        self.attach_file(file)
    }

    pub fn clear_attachment(&self) {
        lock(&self.state).attachment = None;
    }

    /// Name of the staged attachment
    pub fn attachment_name(&self) -> Option<String> {
        lock(&self.state).attachment.as_ref().map(|f| f.name.clone())
    }

    // ----- recording -----

    fn capture(&self) -> Result<&CaptureController> {
        self.capture
            .as_ref()
            .ok_or_else(|| LexiError::Config("audio capture is not configured".to_string()))
    }

    pub async fn start_recording(&self) -> Result<()> {
        self.capture()?.start().await
    }

    /// Stop recording and stage the clip; false when nothing was recording
    pub async fn stop_recording(&self) -> Result<bool> {
        match self.capture()?.stop().await? {
            Some(file) => {
                self.attach_file(file)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ----- chat lifecycle -----

    /// Start over with an empty chat
    pub fn new_chat(&self) {
        self.abort();
        self.update(|st| {
            st.transcript.clear();
            st.seed_history.clear();
            st.chat_id = None;
            st.attachment = None;
            st.input.clear();
        });
        self.sessions.invalidate();
        tracing::info!(target: "lexi.chat.controller", "new chat");
    }

    /// Replace the transcript with a stored chat
    pub async fn load_chat(&self, chat_id: &str) -> Result<()> {
        let backend = self
            .backend
            .clone()
            .ok_or_else(|| LexiError::Config("no backend configured".to_string()))?;
        if self.is_sending() {
            return Err(LexiError::InvalidInput(
                "cannot load a chat while a message is streaming".to_string(),
            ));
        }

        self.update(|st| {
            st.loading_chat = true;
            st.transcript.clear();
            st.seed_history.clear();
            st.chat_id = Some(chat_id.to_string());
        });
        self.sessions.invalidate();

        let result = backend.list_messages(chat_id).await;
        let outcome = match result {
            Ok(stored) => {
                let (loaded, history) = transcript::from_stored(&stored);
                tracing::info!(target: "lexi.chat.controller", chat_id, messages = loaded.len(), "chat loaded");
                self.update(|st| {
                    st.transcript = loaded;
                    st.seed_history = history;
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!(target: "lexi.chat.controller", chat_id, error = %e, "failed to load chat");
                Err(e)
            }
        };

        self.update(|st| st.loading_chat = false);
        outcome
    }

    // ----- sending -----

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            current: self.cancel.clone(),
        }
    }

    /// Cancel the in-flight send; returns false when nothing is in flight
    pub fn abort(&self) -> bool {
        self.abort_handle().abort()
    }

    fn session_config(&self, seed_history: Vec<Content>) -> SessionConfig {
        let tools = match (&self.dispatcher, self.options.use_tools) {
            (Some(dispatcher), true) => dispatcher.registry().declare(),
            _ => Vec::new(),
        };
        SessionConfig {
            model: self.options.model.clone(),
            system_instruction: self.options.system_instruction.clone(),
            tools,
            history: seed_history,
        }
    }

    /// Send the staged input and attachment and stream the reply
    pub async fn send_message(&self) -> SendOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!(target: "lexi.chat.controller", "send ignored: another send is in flight");
            return SendOutcome::Skipped;
        }

        let assembled = self.update(|st| {
            if st.loading_chat || (st.input.trim().is_empty() && st.attachment.is_none()) {
                return None;
            }
            let text = std::mem::take(&mut st.input);
            let attachment = st.attachment.take();
            if let Some(file) = &attachment {
                st.transcript.push(Message::user_file(file));
            }
            if !text.trim().is_empty() {
                st.transcript.push(Message::user(text.clone()));
            }
            let placeholder = st.transcript.push(Message::assistant(PLACEHOLDER));
            st.sending = true;
            st.phase = SendPhase::Assembling;
            Some(Assembled {
                text,
                attachment,
                placeholder,
                chat_id: st.chat_id.clone(),
                seed_history: st.seed_history.clone(),
            })
        });

        let Some(assembled) = assembled else {
            self.in_flight.store(false, Ordering::SeqCst);
            return SendOutcome::Skipped;
        };

        let flag = Arc::new(AtomicBool::new(false));
        *lock(&self.cancel) = Some(flag.clone());
        let mut stream = StreamState::new(assembled.placeholder, flag);

        tracing::info!(
            target: "lexi.chat.controller",
            chat_id = ?assembled.chat_id,
            has_text = !assembled.text.trim().is_empty(),
            attachment = ?assembled.attachment.as_ref().map(|f| &f.name),
            "send started"
        );

        let result = self.run_send(&assembled, &mut stream).await;
        let cancelled = stream.is_cancelled();

        let outcome = match result {
            Ok(()) if cancelled => SendOutcome::Aborted,
            Ok(()) => SendOutcome::Completed,
            Err(e) => {
                tracing::error!(target: "lexi.chat.controller", error = %e, "send failed");
                if cancelled {
                    SendOutcome::Aborted
                } else {
                    self.update(|st| st.transcript.set_content(assembled.placeholder, FAILURE_NOTICE));
                    SendOutcome::Failed
                }
            }
        };

        *lock(&self.cancel) = None;
        self.update(|st| {
            st.sending = false;
            st.phase = SendPhase::Idle;
        });
        self.in_flight.store(false, Ordering::SeqCst);
        tracing::info!(target: "lexi.chat.controller", ?outcome, "send finished");
        outcome
    }

    async fn run_send(&self, assembled: &Assembled, stream: &mut StreamState) -> Result<()> {
        let chat_id = match &assembled.chat_id {
            Some(id) => Some(id.clone()),
            None => self.create_chat(assembled, stream).await?,
        };
        if stream.is_cancelled() {
            self.set_phase(SendPhase::Aborted);
            return Ok(());
        }

        let mut parts = Vec::new();
        if let Some(file) = &assembled.attachment {
            self.set_phase(SendPhase::Uploading);
            let remote = self.upload_attachment(file, chat_id.as_deref()).await?;
            parts.push(remote.to_part());
        }

        if stream.is_cancelled() {
            self.set_phase(SendPhase::Aborted);
            return Ok(());
        }

        if !assembled.text.trim().is_empty() {
            parts.push(Part::text(&assembled.text));
            if self.options.save_message {
                if let Some(id) = &chat_id {
                    self.persist(id, NewMessage::text(Entity::User, &assembled.text)).await;
                }
            }
        }

        self.set_phase(SendPhase::CreatingSession);
        let session = self
            .sessions
            .ensure_session(self.session_config(assembled.seed_history.clone()))
            .await?;

        self.set_phase(SendPhase::Streaming);
        let mut chunks = self.provider.send_stream(&session, parts.clone()).await?;
        while let Some(chunk) = chunks.next().await {
            if stream.is_cancelled() {
                break;
            }
            if stream.apply(chunk?) == ChunkAction::Flush {
                self.flush(stream);
            }
        }
        drop(chunks);

        let user_turn = Content::user(parts);
        let mut recorded = false;

        if stream.has_tool_calls() && !stream.is_cancelled() {
            let calls = stream.take_tool_calls();
            match (&self.dispatcher, self.options.use_tools) {
                (Some(dispatcher), true) => {
                    self.set_phase(SendPhase::ToolDispatch);
                    let mark = session.history_len();
                    session.record([user_turn.clone()]);
                    recorded = true;
                    let lead = stream.take_lead();
                    let result = dispatcher
                        .execute(calls, &lead, self.provider.as_ref(), &session, stream.cancel_flag())
                        .await;
                    if result.is_err() || stream.is_cancelled() {
                        session.truncate_history(mark);
                    }
                    stream.replace_buffer(result?);
                    self.flush(stream);
                }
                _ => {
                    tracing::warn!(
                        target: "lexi.chat.controller",
                        calls = calls.len(),
                        "model requested tools while tool use is disabled; ignoring"
                    );
                }
            }
        }

        self.set_phase(SendPhase::Finalizing);
        self.flush(stream);

        if stream.is_cancelled() {
            self.set_phase(SendPhase::Aborted);
            tracing::info!(target: "lexi.chat.controller", "send aborted; reply discarded");
            return Ok(());
        }

        let reply = stream.take_buffer();
        if !recorded {
            session.record([user_turn]);
            if !reply.is_empty() {
                session.record([Content::text(Role::Model, &reply)]);
            }
        }

        if self.options.save_message {
            if let Some(id) = &chat_id {
                self.persist(id, NewMessage::text(Entity::Ai, reply)).await;
            }
        }
        Ok(())
    }

    /// Write the buffer into the placeholder unless the send was cancelled
    fn flush(&self, stream: &StreamState) {
        if stream.is_cancelled() {
            return;
        }
        self.update(|st| st.transcript.set_content(stream.placeholder(), stream.buffer()));
    }

    async fn create_chat(&self, assembled: &Assembled, stream: &StreamState) -> Result<Option<String>> {
        if !self.options.create_chat {
            return Ok(None);
        }
        let Some(backend) = &self.backend else {
            return Err(LexiError::ChatCreationFailed("no backend configured".to_string()));
        };
        let Some(prompt_id) = &self.options.prompt_id else {
            return Err(LexiError::ChatCreationFailed("no prompt id configured".to_string()));
        };

        let name = chat_name(&assembled.text, assembled.attachment.as_ref());
        let id = backend
            .create_chat(&name, prompt_id)
            .await
            .map_err(|e| LexiError::ChatCreationFailed(e.to_string()))?;

        // new_chat() may have reset the state while the request was out
        if stream.is_cancelled() {
            tracing::info!(target: "lexi.chat.controller", chat_id = %id, "chat created after abort; discarding id");
            return Ok(None);
        }
        self.update(|st| st.chat_id = Some(id.clone()));
        Ok(Some(id))
    }

    async fn upload_attachment(&self, file: &LocalFile, chat_id: Option<&str>) -> Result<RemoteFile> {
        let upload = self.pipeline.upload(self.provider.as_ref(), file);
        match (&self.backend, chat_id) {
            (Some(backend), Some(id)) if self.options.save_file => {
                let (remote, ()) = tokio::join!(upload, self.pipeline.mirror(backend.as_ref(), id, file));
                remote
            }
            _ => upload.await,
        }
    }

    async fn persist(&self, chat_id: &str, message: NewMessage) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(e) = backend.save_message(chat_id, &message).await {
            tracing::warn!(
                target: "lexi.chat.controller",
                chat_id,
                entity = message.entity.as_str(),
                error = %e,
                "failed to save message"
            );
        }
    }
}
