// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Lexi
//!
//! This module defines all error types used throughout the client.

use thiserror::Error;

/// Main error type for Lexi operations
#[derive(Error, Debug)]
pub enum LexiError {
    /// File rejected client-side before any network call
    #[error("File too large: {size} bytes (limit is {limit} bytes)")]
    SizeExceeded { size: u64, limit: u64 },

    /// Provider reported a terminal failure for an uploaded file
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Uploaded file never became usable within the poll budget
    #[error("Upload timed out after {attempts} status checks")]
    UploadTimeout { attempts: u32 },

    /// Provider could not be reached
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider rejected the session configuration
    #[error("Session creation failed: {0}")]
    SessionCreationFailed(String),

    /// Backend could not create a chat
    #[error("Chat creation failed: {0}")]
    ChatCreationFailed(String),

    /// Model asked for a tool that was never declared
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Catch-all for failures while consuming a response stream
    #[error("Stream error: {0}")]
    Stream(String),

    /// Provider API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Backend persistence errors
    #[error("Backend error: {0}")]
    Backend(String),

    /// Audio capture errors
    #[error("Capture error: {0}")]
    Capture(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

impl ApiError {
    /// Map a non-success HTTP status to an API error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => ApiError::AuthenticationFailed,
            408 | 504 => ApiError::Timeout,
            _ => ApiError::ServerError {
                status,
                message: message.into(),
            },
        }
    }
}

/// Result type alias for Lexi operations
pub type Result<T> = std::result::Result<T, LexiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_exceeded_mentions_both_sizes() {
        let err = LexiError::SizeExceeded {
            size: 25_000_000,
            limit: 20_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("25000000"));
        assert!(msg.contains("20000000"));
    }

    #[test]
    fn test_upload_timeout_reports_attempts() {
        let err = LexiError::UploadTimeout { attempts: 30 };
        assert!(err.to_string().contains("30 status checks"));
    }

    #[test]
    fn test_unknown_tool() {
        let err = LexiError::UnknownTool("search_bills".to_string());
        assert_eq!(err.to_string(), "Unknown tool: search_bills");
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LexiError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_from_api_error() {
        let err: LexiError = ApiError::Timeout.into();
        assert!(err.to_string().contains("API error"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_api_error_from_status() {
        assert!(matches!(
            ApiError::from_status(401, "nope"),
            ApiError::AuthenticationFailed
        ));
        assert!(matches!(ApiError::from_status(504, ""), ApiError::Timeout));
        match ApiError::from_status(500, "boom") {
            ApiError::ServerError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
