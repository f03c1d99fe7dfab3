// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Audio capture through an external recorder process
//!
//! The configured command must write a WAV stream to stdout, e.g.
//! `["arecord", "-q", "-f", "S16_LE", "-r", "16000", "-c", "1", "-t", "wav", "-"]`.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

use super::{AudioInput, AudioSource};
use crate::error::{LexiError, Result};

const READ_CHUNK: usize = 8192;

/// Audio source spawning a recorder per recording
#[derive(Debug, Clone)]
pub struct CommandAudioSource {
    program: String,
    args: Vec<String>,
}

impl CommandAudioSource {
    /// Build from an argv-style command, program first
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .filter(|(program, _)| !program.trim().is_empty())
            .ok_or_else(|| LexiError::Config("capture command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl AudioSource for CommandAudioSource {
    async fn open(&self) -> Result<Box<dyn AudioInput>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LexiError::Capture(format!("failed to start {}: {}", self.program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LexiError::Capture("recorder stdout unavailable".to_string()))?;

        tracing::debug!(target: "lexi.capture", program = %self.program, pid = ?child.id(), "recorder started");
        Ok(Box::new(CommandAudioInput { child, stdout }))
    }
}

struct CommandAudioInput {
    child: Child,
    stdout: ChildStdout,
}

#[async_trait]
impl AudioInput for CommandAudioInput {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = self.stdout.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn close(&mut self) -> Result<()> {
        // The recorder may already have exited on its own.
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(target: "lexi.capture", error = %e, "recorder already stopped");
        }
        let status = self.child.wait().await?;
        tracing::debug!(target: "lexi.capture", ?status, "recorder released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_new_splits_program_and_arguments() {
        let source = CommandAudioSource::new(&argv(&["arecord", "-q", "-f", "S16_LE", "-"])).unwrap();
        assert_eq!(source.program(), "arecord");
        assert_eq!(source.args, vec!["-q", "-f", "S16_LE", "-"]);
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            CommandAudioSource::new(&[]),
            Err(LexiError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_open_missing_program_fails() {
        let source = CommandAudioSource::new(&argv(&["lexi-no-such-recorder-binary"])).unwrap();
        assert!(matches!(source.open().await, Err(LexiError::Capture(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reads_process_output_until_eof() {
        let source = CommandAudioSource::new(&argv(&["printf", "abc"])).unwrap();
        let mut input = source.open().await.unwrap();

        let mut collected = Vec::new();
        while let Some(chunk) = input.next_chunk().await.unwrap() {
            collected.extend(chunk);
        }
        input.close().await.unwrap();

        assert_eq!(collected, b"abc");
    }
}
