//! Error types for QA-RS operations.
//!
//! This module provides the error hierarchy using `thiserror` for every
//! pipeline stage: vocabulary loading, sequence assembly, remote inference,
//! file I/O and CLI commands.
//!
//! A passage that does not contain an answer is not an error; it is reported
//! through [`crate::answer::AnswerText::found`].

use thiserror::Error;

/// Result type alias for QA operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for QA operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Vocabulary could not be loaded (startup-fatal).
    #[error("vocabulary error: {0}")]
    Vocabulary(#[from] VocabularyError),

    /// Input sequence could not be assembled.
    #[error("sequence error: {0}")]
    Sequence(#[from] SequenceError),

    /// Remote inference failed.
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

impl Error {
    /// Returns `true` if a caller-side retry policy may retry this error.
    ///
    /// Only transport failures qualify. Malformed payloads and server-side
    /// inference errors are deterministic and are not retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Inference(err) if err.is_retryable())
    }
}

/// Vocabulary loading errors.
#[derive(Error, Debug)]
pub enum VocabularyError {
    /// Vocabulary file does not exist.
    #[error("vocabulary file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Vocabulary file exists but could not be read.
    #[error("failed to read vocabulary: {path}: {reason}")]
    ReadFailed {
        /// Path to the vocabulary file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Vocabulary contains no entries.
    #[error("vocabulary is empty")]
    Empty,

    /// A line is not a valid subword entry.
    #[error("malformed vocabulary entry at line {line}: {reason}")]
    MalformedEntry {
        /// 1-based line number.
        line: usize,
        /// Why the entry was rejected.
        reason: String,
    },

    /// The same subword appears twice.
    #[error("duplicate vocabulary entry {token:?} at line {line} (first seen at line {first_line})")]
    DuplicateEntry {
        /// The repeated subword.
        token: String,
        /// 1-based line of the first occurrence.
        first_line: usize,
        /// 1-based line of the repeat.
        line: usize,
    },

    /// A marker token required by the sequence layout is absent.
    #[error("vocabulary is missing required token {token}")]
    MissingSpecialToken {
        /// The missing marker, e.g. `[SEP]`.
        token: String,
    },
}

/// Sequence assembly errors.
#[derive(Error, Debug)]
pub enum SequenceError {
    /// The question alone does not fit in the model input.
    #[error("question too long: {length} tokens exceeds maximum {max}")]
    TooLong {
        /// Question length in tokens.
        length: usize,
        /// Maximum question length for the configured sequence length.
        max: usize,
    },

    /// Invalid builder configuration.
    #[error("invalid sequence configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },
}

/// Remote inference errors.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Connection refused, DNS failure or other transport error.
    #[error("server unavailable at {endpoint}: {reason}")]
    ServerUnavailable {
        /// Endpoint that was contacted.
        endpoint: String,
        /// Transport failure description.
        reason: String,
    },

    /// The call did not complete within the configured timeout.
    #[error("server at {endpoint} timed out after {timeout_ms}ms")]
    Timeout {
        /// Endpoint that was contacted.
        endpoint: String,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The server answered with a payload that cannot be decoded.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong with the payload.
        reason: String,
    },

    /// The server reported an inference failure.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Diagnostic message reported by the server.
        message: String,
    },
}

impl InferenceError {
    /// Returns `true` for transport failures, timeouts included.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::ServerUnavailable { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if the failure is transient.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::ServerUnavailable { .. } | Self::Timeout { .. } => true,
            Self::Server { status, .. } => matches!(status, 502..=504),
            Self::MalformedResponse { .. } => false,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// File content is not valid UTF-8.
    #[error("invalid UTF-8 in {path} at byte offset {offset}")]
    InvalidUtf8 {
        /// Path to the file.
        path: String,
        /// Byte offset of the first invalid sequence.
        offset: usize,
    },
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing required argument.
    #[error("missing required argument: {0}")]
    MissingArgument(String),
}
