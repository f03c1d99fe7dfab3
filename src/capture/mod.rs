// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Voice capture
//!
//! [`CaptureController`] drives one recording at a time from an
//! [`AudioSource`]. A reader task buffers encoded chunks while a ticker
//! publishes the elapsed time; stopping releases the device and turns the
//! buffered bytes into a WAV attachment.

pub mod command;
pub mod mock;
pub mod wav;

pub use command::CommandAudioSource;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::attachments::LocalFile;
use crate::error::{LexiError, Result};

/// File name given to finished recordings
pub const RECORDING_NAME: &str = "audio.wav";

/// An audio input device that can be opened for one recording
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn open(&self) -> Result<Box<dyn AudioInput>>;
}

/// An open audio input producing an encoded WAV stream
#[async_trait]
pub trait AudioInput: Send {
    /// Next encoded chunk, or `None` once the input is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Release the device
    async fn close(&mut self) -> Result<()>;
}

/// Observable recording state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStatus {
    pub is_recording: bool,
    pub elapsed: Duration,
}

impl CaptureStatus {
    /// Elapsed time as `mm:ss`
    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed)
    }
}

/// Format a duration as `mm:ss`; minutes keep counting past 59
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

struct ActiveRecording {
    stop_tx: oneshot::Sender<()>,
    reader: JoinHandle<Result<Vec<u8>>>,
    ticker: JoinHandle<()>,
    started: Instant,
}

/// Start/stop state machine over an [`AudioSource`]
pub struct CaptureController {
    source: Arc<dyn AudioSource>,
    tick: Duration,
    status_tx: watch::Sender<CaptureStatus>,
    active: Mutex<Option<ActiveRecording>>,
}

impl CaptureController {
    pub fn new(source: Arc<dyn AudioSource>, tick: Duration) -> Self {
        let (status_tx, _) = watch::channel(CaptureStatus::default());
        Self {
            source,
            tick,
            status_tx,
            active: Mutex::new(None),
        }
    }

    /// Subscribe to recording status updates
    pub fn subscribe(&self) -> watch::Receiver<CaptureStatus> {
        self.status_tx.subscribe()
    }

    /// Latest published status
    pub fn status(&self) -> CaptureStatus {
        *self.status_tx.borrow()
    }

    /// Open the device and begin buffering audio
    pub async fn start(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(LexiError::InvalidInput("already recording".to_string()));
        }

        let input = self.source.open().await?;
        let (stop_tx, stop_rx) = oneshot::channel();
        let reader = tokio::spawn(read_until_stopped(input, stop_rx));

        let started = Instant::now();
        self.status_tx.send_replace(CaptureStatus {
            is_recording: true,
            elapsed: Duration::ZERO,
        });

        let status_tx = self.status_tx.clone();
        let tick = self.tick;
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(started + tick, tick);
            loop {
                interval.tick().await;
                status_tx.send_replace(CaptureStatus {
                    is_recording: true,
                    elapsed: started.elapsed(),
                });
            }
        });

        tracing::info!(target: "lexi.capture", "recording started");
        *active = Some(ActiveRecording {
            stop_tx,
            reader,
            ticker,
            started,
        });
        Ok(())
    }

    /// Stop recording and return the finished clip, or `None` when idle
    pub async fn stop(&self) -> Result<Option<LocalFile>> {
        let Some(recording) = self.active.lock().await.take() else {
            return Ok(None);
        };

        recording.ticker.abort();
        // The reader may have finished on its own already.
        let _ = recording.stop_tx.send(());
        let joined = recording.reader.await;
        self.status_tx.send_replace(CaptureStatus::default());

        let mut bytes = joined
            .map_err(|e| LexiError::Capture(format!("capture task failed: {}", e)))??;
        if bytes.is_empty() {
            return Err(LexiError::Capture("no audio captured".to_string()));
        }

        let info = wav::finalize(&mut bytes)?;
        tracing::info!(
            target: "lexi.capture",
            wall_clock = ?recording.started.elapsed(),
            duration = ?info.duration,
            bytes = bytes.len(),
            "recording finished"
        );
        Ok(Some(LocalFile::new(RECORDING_NAME, "audio/wav", bytes)))
    }

    /// Whether a recording is in progress
    pub async fn is_recording(&self) -> bool {
        self.active.lock().await.is_some()
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if let Some(recording) = self.active.get_mut().take() {
            recording.ticker.abort();
            // Dropping the sender stops the reader, which closes the device.
            drop(recording.stop_tx);
        }
    }
}

async fn read_until_stopped(
    mut input: Box<dyn AudioInput>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let outcome = loop {
        tokio::select! {
            _ = &mut stop_rx => break Ok(()),
            chunk = input.next_chunk() => match chunk {
                Ok(Some(bytes)) => {
                    tracing::debug!(target: "lexi.capture", len = bytes.len(), "audio chunk");
                    buffer.extend_from_slice(&bytes);
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            },
        }
    };

    if let Err(e) = input.close().await {
        tracing::warn!(target: "lexi.capture", error = %e, "failed to release audio device");
    }
    outcome.map(|_| buffer)
}
