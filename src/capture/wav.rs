// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! RIFF/WAVE header correction
//!
//! Recorders that stream WAV to a pipe cannot seek back, so the RIFF and
//! `data` chunk sizes are left as placeholders. [`finalize`] rewrites them
//! from the bytes actually captured.

use std::time::Duration;

use crate::error::{LexiError, Result};

/// Facts recovered from a finalized clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub byte_rate: u32,
    pub data_len: u32,
    pub duration: Duration,
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn malformed(reason: &str) -> LexiError {
    LexiError::Capture(format!("malformed WAV stream: {}", reason))
}

/// Rewrite the size fields of a streamed WAV clip in place.
///
/// The `data` chunk is taken to run to the end of the buffer; a trailing
/// partial frame is dropped.
pub fn finalize(bytes: &mut Vec<u8>) -> Result<WavInfo> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(malformed("missing RIFF/WAVE header"));
    }

    let mut pos = 12;
    let mut format: Option<(u16, u32, u32, u16)> = None;

    let data_start = loop {
        if pos + 8 > bytes.len() {
            return Err(malformed("no data chunk"));
        }
        let id = &bytes[pos..pos + 4];
        let size = read_u32(bytes, pos + 4) as usize;

        if id == b"data" {
            break pos + 8;
        }

        let body = pos + 8;
        if id == b"fmt " {
            if size < 16 || body + 16 > bytes.len() {
                return Err(malformed("short fmt chunk"));
            }
            format = Some((
                read_u16(bytes, body + 2),
                read_u32(bytes, body + 4),
                read_u32(bytes, body + 8),
                read_u16(bytes, body + 12),
            ));
        }

        // Chunks are word aligned.
        pos = size
            .checked_add(size & 1)
            .and_then(|padded| body.checked_add(padded))
            .ok_or_else(|| malformed("chunk size overflow"))?;
    };

    let (channels, sample_rate, byte_rate, block_align) =
        format.ok_or_else(|| malformed("data chunk before fmt chunk"))?;
    if byte_rate == 0 {
        return Err(malformed("zero byte rate"));
    }

    let mut data_len = bytes.len() - data_start;
    if block_align > 0 {
        data_len -= data_len % block_align as usize;
    }
    bytes.truncate(data_start + data_len);

    let data_len = u32::try_from(data_len).map_err(|_| malformed("clip exceeds 4 GiB"))?;
    let riff_len = u32::try_from(bytes.len() - 8).map_err(|_| malformed("clip exceeds 4 GiB"))?;
    write_u32(bytes, 4, riff_len);
    write_u32(bytes, data_start - 4, data_len);

    Ok(WavInfo {
        sample_rate,
        channels,
        byte_rate,
        data_len,
        duration: Duration::from_secs_f64(data_len as f64 / byte_rate as f64),
    })
}

/// Build a canonical 44-byte PCM header with placeholder sizes
pub fn streaming_header(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Vec<u8> {
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * block_align as u32;

    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&u32::MAX.to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&channels.to_le_bytes());
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&bits_per_sample.to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&u32::MAX.to_le_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_finalize_rewrites_placeholders() {
        let mut clip = streaming_header(16_000, 1, 16);
        clip.extend(vec![0u8; 32_000]);

        let info = finalize(&mut clip).unwrap();

        assert_eq!(info.data_len, 32_000);
        assert_eq!(info.duration, Duration::from_secs(1));
        assert_eq!(read_u32(&clip, 4), 32_036);
        assert_eq!(read_u32(&clip, 40), 32_000);
    }

    #[test]
    fn test_finalize_drops_partial_frame() {
        let mut clip = streaming_header(8_000, 2, 16);
        clip.extend(vec![1u8; 4 * 10 + 3]);

        let info = finalize(&mut clip).unwrap();
        assert_eq!(info.data_len, 40);
        assert_eq!(clip.len(), 44 + 40);
    }

    #[test]
    fn test_finalize_skips_unknown_chunks() {
        let header = streaming_header(16_000, 1, 16);
        let mut clip = header[..36].to_vec();
        clip.extend_from_slice(b"LIST");
        clip.extend_from_slice(&3u32.to_le_bytes());
        clip.extend_from_slice(&[9, 9, 9, 0]);
        clip.extend_from_slice(&header[36..]);
        clip.extend(vec![0u8; 100]);

        let info = finalize(&mut clip).unwrap();
        assert_eq!(info.data_len, 100);
        assert_eq!(read_u32(&clip, 52), 100);
    }

    #[test]
    fn test_finalize_rejects_non_wav() {
        let mut bytes = b"OggS\0\0\0\0\0\0\0\0".to_vec();
        assert!(matches!(finalize(&mut bytes), Err(LexiError::Capture(_))));
    }

    #[test]
    fn test_finalize_rejects_missing_data() {
        let mut clip = streaming_header(16_000, 1, 16);
        clip.truncate(36);
        assert!(finalize(&mut clip).is_err());
    }

    proptest! {
        #[test]
        fn prop_finalize_sizes_match_contents(
            frames in 0usize..5000,
            extra in 0usize..2,
            rate in prop::sample::select(vec![8_000u32, 16_000, 44_100, 48_000]),
        ) {
            let mut clip = streaming_header(rate, 1, 16);
            clip.extend(vec![0u8; frames * 2 + extra]);

            let info = finalize(&mut clip).unwrap();

            prop_assert_eq!(info.data_len as usize, frames * 2);
            prop_assert_eq!(read_u32(&clip, 4) as usize, clip.len() - 8);
            prop_assert_eq!(read_u32(&clip, 40), info.data_len);
            let expected = (frames * 2) as f64 / (rate * 2) as f64;
            prop_assert!((info.duration.as_secs_f64() - expected).abs() < 1e-6);
        }
    }
}
