//! Span decoding.
//!
//! Picks the best `(start, end)` position pair from a window's scores, lets
//! the model abstain through its `[CLS]` score, and reduces per-window
//! decisions to one result.
//!
//! # Decision rule
//!
//! Within one window only context positions are candidates. A pair is valid
//! when `start <= end` and `end - start <= max_answer_length`; its score is
//! `start_scores[start] + end_scores[end]`. The highest score wins, ties go
//! to the shorter span and then to the earlier start. The window abstains
//! when `no_answer_score >= best_score + threshold`, so an exact tie at the
//! threshold is a no-answer.

use crate::error::InferenceError;
use crate::inference::LogitPair;
use crate::sequence::{CLS_INDEX, EncodedSequence};
use serde::Serialize;
use std::cmp::Ordering;
use std::ops::Range;

/// A scored answer span in sequence positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpanCandidate {
    /// Position of the first answer token.
    pub start_index: usize,
    /// Position of the last answer token (inclusive).
    pub end_index: usize,
    /// `start_scores[start_index] + end_scores[end_index]`.
    pub score: f32,
}

impl SpanCandidate {
    /// `end_index - start_index`.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.end_index - self.start_index
    }

    /// Ranks by score, then shorter length, then earlier start; the greater
    /// candidate is preferred.
    fn rank(&self, other: &Self, start: usize, other_start: usize) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.length().cmp(&self.length()))
            .then_with(|| other_start.cmp(&start))
    }
}

/// Outcome of decoding one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// The best span beat the no-answer score.
    Span(SpanCandidate),
    /// The model abstains.
    NoAnswer {
        /// `start_scores[CLS] + end_scores[CLS]`.
        score: f32,
    },
}

/// A [`Decision`] tagged with the window it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowDecision {
    /// Index of the window among the windows of one request.
    pub window_index: usize,
    /// Context token index of the span start, for cross-window ordering.
    pub context_start: usize,
    /// No-answer score of the window.
    pub no_answer_score: f32,
    /// The window's decision.
    pub decision: Decision,
}

impl WindowDecision {
    /// The chosen span, if the window did not abstain.
    #[must_use]
    pub const fn span(&self) -> Option<&SpanCandidate> {
        match &self.decision {
            Decision::Span(candidate) => Some(candidate),
            Decision::NoAnswer { .. } => None,
        }
    }
}

/// Selects answer spans from model scores.
///
/// # Examples
///
/// ```
/// use qa_rs::decode::SpanDecoder;
///
/// let decoder = SpanDecoder::new(30, 0.0);
/// let start = [0.0, 1.0, 5.0, 0.5];
/// let end = [0.0, 0.5, 1.0, 4.0];
/// let best = decoder.best_span(&start, &end, 1..4).unwrap();
/// assert_eq!((best.start_index, best.end_index), (2, 3));
/// assert!((best.score - 9.0).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanDecoder {
    max_answer_length: usize,
    no_answer_threshold: f32,
}

impl SpanDecoder {
    /// Creates a decoder accepting spans with `end - start <= max_answer_length`
    /// and abstaining when the no-answer score reaches the best span score
    /// plus `no_answer_threshold`.
    #[must_use]
    pub const fn new(max_answer_length: usize, no_answer_threshold: f32) -> Self {
        Self {
            max_answer_length,
            no_answer_threshold,
        }
    }

    /// Best valid span among `positions`, or `None` if no position is
    /// available or every score is NaN.
    ///
    /// # Panics
    ///
    /// Panics if `positions` exceeds either score slice.
    #[must_use]
    pub fn best_span(
        &self,
        start_scores: &[f32],
        end_scores: &[f32],
        positions: Range<usize>,
    ) -> Option<SpanCandidate> {
        let mut best: Option<SpanCandidate> = None;

        for start in positions.clone() {
            let last = start
                .saturating_add(self.max_answer_length)
                .min(positions.end - 1);
            for end in start..=last {
                let score = start_scores[start] + end_scores[end];
                if score.is_nan() {
                    continue;
                }
                let candidate = SpanCandidate {
                    start_index: start,
                    end_index: end,
                    score,
                };
                if best.is_none_or(|current| {
                    candidate.rank(&current, start, current.start_index) == Ordering::Greater
                }) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Decodes one window.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::MalformedResponse`] if the scores do not
    /// match the sequence length; nothing is decoded in that case.
    pub fn decode(
        &self,
        logits: &LogitPair,
        sequence: &EncodedSequence,
    ) -> Result<WindowDecision, InferenceError> {
        logits.validate(sequence.len())?;
        if logits.is_empty() {
            return Err(InferenceError::malformed("empty score arrays"));
        }

        let no_answer_score = logits.start_scores[CLS_INDEX] + logits.end_scores[CLS_INDEX];
        let best = self.best_span(
            &logits.start_scores,
            &logits.end_scores,
            sequence.context_positions.clone(),
        );

        let (decision, context_start) = match best {
            // a NaN no-answer score never forces abstention
            Some(candidate)
                if no_answer_score.is_nan()
                    || no_answer_score < candidate.score + self.no_answer_threshold =>
            {
                let context_start = candidate.start_index - sequence.context_positions.start
                    + sequence.context_offset;
                (Decision::Span(candidate), context_start)
            }
            _ => (
                Decision::NoAnswer {
                    score: no_answer_score,
                },
                sequence.context_offset,
            ),
        };

        tracing::debug!(
            window = sequence.window_index,
            no_answer_score,
            decision = ?decision,
            "decoded window"
        );

        Ok(WindowDecision {
            window_index: sequence.window_index,
            context_start,
            no_answer_score,
            decision,
        })
    }
}

/// Reduces per-window decisions to the final one.
///
/// The best span among windows that did not abstain wins (score, then
/// shorter length, then earlier context start). When every window abstains
/// the no-answer decision with the highest score is returned. The result
/// does not depend on the order of `decisions`.
#[must_use]
pub fn merge<I>(decisions: I) -> Option<WindowDecision>
where
    I: IntoIterator<Item = WindowDecision>,
{
    let mut best_span: Option<WindowDecision> = None;
    let mut best_abstain: Option<WindowDecision> = None;

    for current in decisions {
        match current.decision {
            Decision::Span(candidate) => {
                let better = best_span.is_none_or(|held| {
                    held.span().is_none_or(|other| {
                        candidate
                            .rank(other, current.context_start, held.context_start)
                            .then_with(|| held.window_index.cmp(&current.window_index))
                            == Ordering::Greater
                    })
                });
                if better {
                    best_span = Some(current);
                }
            }
            Decision::NoAnswer { score } => {
                let better = best_abstain.is_none_or(|held| match held.decision {
                    Decision::NoAnswer { score: other } => {
                        score > other
                            || (other.is_nan() && !score.is_nan())
                            || (score == other && current.window_index < held.window_index)
                    }
                    Decision::Span(_) => false,
                });
                if better {
                    best_abstain = Some(current);
                }
            }
        }
    }

    best_span.or(best_abstain)
}
