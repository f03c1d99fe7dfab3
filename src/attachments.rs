// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Attachment pipeline
//!
//! Validates user files, uploads them to the provider and waits for the
//! remote copy to become usable. Mirroring into the persistence backend is
//! best-effort and never decides the outcome of an upload.

use std::path::Path;

use crate::backend::Backend;
use crate::config::UploadConfig;
use crate::error::{LexiError, Result};
use crate::llm::provider::{FileState, GenerativeProvider, RemoteFile};

/// A user-supplied file held in memory
#[derive(Clone, PartialEq)]
pub struct LocalFile {
    /// Display name
    pub name: String,
    /// MIME type
    pub mime_type: String,
    /// File contents
    pub data: Vec<u8>,
}

impl std::fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.data.len())
            .finish()
    }
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "attachment".to_string());
        Ok(Self::new(name, mime_type_for(path), data))
    }

    /// Size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Guess a MIME type from a file extension
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Validates, uploads and mirrors attachments
#[derive(Debug, Clone)]
pub struct AttachmentPipeline {
    limits: UploadConfig,
}

impl AttachmentPipeline {
    pub fn new(limits: UploadConfig) -> Self {
        Self { limits }
    }

    /// Reject files at or over the size limit
    pub fn validate(&self, file: &LocalFile) -> Result<()> {
        self.check_size(file.size_bytes())
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size >= self.limits.max_bytes {
            return Err(LexiError::SizeExceeded {
                size,
                limit: self.limits.max_bytes,
            });
        }
        Ok(())
    }

    /// Load a file from disk, rejecting it from its metadata before reading
    pub async fn load(&self, path: &Path) -> Result<LocalFile> {
        let metadata = tokio::fs::metadata(path).await?;
        self.check_size(metadata.len())?;
        let file = LocalFile::from_path(path).await?;
        self.validate(&file)?;
        Ok(file)
    }

    /// Upload `file` and poll until the provider reports it active
    pub async fn upload(
        &self,
        provider: &dyn GenerativeProvider,
        file: &LocalFile,
    ) -> Result<RemoteFile> {
        self.validate(file)?;

        let mut remote = provider.upload_file(file).await?;
        tracing::debug!(
            target: "lexi.attachments",
            name = %remote.name,
            state = ?remote.state,
            size = file.size_bytes(),
            "file uploaded"
        );

        let mut polls = 0;
        loop {
            match remote.state {
                FileState::Active => {
                    tracing::info!(
                        target: "lexi.attachments",
                        name = %remote.name,
                        polls,
                        "file active"
                    );
                    return Ok(remote);
                }
                FileState::Failed => {
                    return Err(LexiError::UploadFailed(format!(
                        "provider reported {} as failed",
                        remote.name
                    )));
                }
                FileState::Pending => {}
            }

            if polls >= self.limits.max_polls {
                return Err(LexiError::UploadTimeout { attempts: polls });
            }

            tokio::time::sleep(self.limits.poll_interval()).await;
            remote.state = provider.file_status(&remote.name).await?;
            polls += 1;
            tracing::debug!(
                target: "lexi.attachments",
                name = %remote.name,
                poll = polls,
                state = ?remote.state,
                "polled file state"
            );
        }
    }

    /// Best-effort copy of `file` into the backend under `chat_id`
    pub async fn mirror(&self, backend: &dyn Backend, chat_id: &str, file: &LocalFile) {
        if let Err(e) = backend.upload_file(chat_id, file).await {
            tracing::warn!(
                target: "lexi.attachments",
                chat_id,
                file = %file.name,
                error = %e,
                "backend file mirror failed"
            );
        }
    }
}
