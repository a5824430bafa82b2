//! Remote inference.
//!
//! The model itself runs on a separate server. This module defines the
//! [`InferenceBackend`] seam the pipeline calls once per window, the
//! [`LogitPair`] it returns, and [`KServeClient`], the blocking HTTP client
//! speaking the KServe v2 protocol used by OpenVINO Model Server and
//! Triton.
//!
//! Backends perform exactly one call per invocation. Retries and backoff
//! belong to the caller; see [`crate::Error::is_retryable`].

pub mod client;
pub mod protocol;

pub use client::KServeClient;

use crate::error::{InferenceError, Result};
use crate::sequence::EncodedSequence;
use serde::{Deserialize, Serialize};

/// Per-position start and end scores for one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogitPair {
    /// Score of each position being the answer start.
    pub start_scores: Vec<f32>,
    /// Score of each position being the answer end.
    pub end_scores: Vec<f32>,
}

impl LogitPair {
    /// Creates a logit pair.
    #[must_use]
    pub const fn new(start_scores: Vec<f32>, end_scores: Vec<f32>) -> Self {
        Self {
            start_scores,
            end_scores,
        }
    }

    /// Number of start scores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.start_scores.len()
    }

    /// Returns `true` when there are no scores.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start_scores.is_empty()
    }

    /// Checks that both arrays hold exactly `expected_len` values.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::MalformedResponse`] naming the short array.
    pub fn validate(&self, expected_len: usize) -> std::result::Result<(), InferenceError> {
        for (name, scores) in [("start", &self.start_scores), ("end", &self.end_scores)] {
            if scores.len() != expected_len {
                return Err(InferenceError::malformed(format!(
                    "{name} scores have {} values, expected {expected_len}",
                    scores.len()
                )));
            }
        }
        Ok(())
    }
}

/// Computes start/end scores for an encoded sequence.
///
/// Implementations must be shareable across threads so that windows can be
/// dispatched concurrently. Each call is independent and side-effect free.
pub trait InferenceBackend: Send + Sync {
    /// Runs the model on one sequence.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Inference`] on transport, protocol or server
    /// failures. A returned pair always matches the sequence length.
    fn infer(&self, sequence: &EncodedSequence) -> Result<LogitPair>;

    /// Short backend description for logs.
    fn describe(&self) -> String {
        "inference backend".to_string()
    }
}
