//! Answer mapping.
//!
//! Turns the winning decision into text by slicing the original context at
//! the byte offsets recorded by the tokenizer. The answer keeps the spacing
//! and casing of the passage; subword strings are never re-joined.

use crate::decode::Decision;
use serde::Serialize;
use std::ops::Range;

/// Final pipeline output.
///
/// `found == false` is a normal result meaning the model found no answer in
/// the passage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerText {
    /// Answer substring of the context; empty when not found.
    pub text: String,
    /// Winning span score, or the no-answer score when not found.
    pub confidence: f32,
    /// Whether an answer span was selected.
    pub found: bool,
    /// Byte range of the answer in the context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Range<usize>>,
}

impl AnswerText {
    /// A no-answer result carrying the model's no-answer score.
    #[must_use]
    pub const fn no_answer(score: f32) -> Self {
        Self {
            text: String::new(),
            confidence: score,
            found: false,
            span: None,
        }
    }

    /// Confidence squashed into `(0, 1)` by the logistic function.
    ///
    /// Monotonic in [`confidence`](Self::confidence), so orderings are kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use qa_rs::answer::AnswerText;
    ///
    /// let answer = AnswerText::no_answer(0.0);
    /// assert!((answer.probability() - 0.5).abs() < 1e-6);
    /// ```
    #[must_use]
    pub fn probability(&self) -> f32 {
        1.0 / (1.0 + (-self.confidence).exp())
    }
}

/// Maps a decision to answer text.
///
/// `token_to_char` is the sequence's position-to-offset table and `context`
/// the original passage. A span whose positions carry no offsets cannot be
/// mapped and is reported as no answer.
#[must_use]
pub fn map_answer(
    decision: &Decision,
    no_answer_score: f32,
    token_to_char: &[Option<Range<usize>>],
    context: &str,
) -> AnswerText {
    let candidate = match decision {
        Decision::Span(candidate) => candidate,
        Decision::NoAnswer { score } => return AnswerText::no_answer(*score),
    };

    let offsets = token_to_char
        .get(candidate.start_index)
        .cloned()
        .flatten()
        .zip(token_to_char.get(candidate.end_index).cloned().flatten());

    let Some((first, last)) = offsets else {
        tracing::warn!(
            start = candidate.start_index,
            end = candidate.end_index,
            "answer span has no context offsets"
        );
        return AnswerText::no_answer(no_answer_score);
    };

    let span = first.start..last.end;
    match context.get(span.clone()) {
        Some(text) => AnswerText {
            text: text.to_string(),
            confidence: candidate.score,
            found: true,
            span: Some(span),
        },
        None => {
            tracing::warn!(?span, "answer span is not a valid context slice");
            AnswerText::no_answer(no_answer_score)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::decode::SpanCandidate;

    const CONTEXT: &str = "Paris is the  Capital.";

    fn offsets() -> Vec<Option<Range<usize>>> {
        vec![
            None,
            None,
            Some(0..5),
            Some(6..8),
            Some(9..12),
            Some(14..21),
            Some(21..22),
            None,
        ]
    }

    fn span(start: usize, end: usize) -> Decision {
        Decision::Span(SpanCandidate {
            start_index: start,
            end_index: end,
            score: 4.5,
        })
    }

    #[test]
    fn test_single_token_answer() {
        let answer = map_answer(&span(2, 2), 0.0, &offsets(), CONTEXT);
        assert_eq!(answer.text, "Paris");
        assert!(answer.found);
        assert_eq!(answer.span, Some(0..5));
        assert!((answer.confidence - 4.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_slice_keeps_original_spacing() {
        let answer = map_answer(&span(4, 5), 0.0, &offsets(), CONTEXT);
        assert_eq!(answer.text, "the  Capital");
    }

    #[test]
    fn test_no_answer() {
        let answer = map_answer(&Decision::NoAnswer { score: 7.0 }, 7.0, &offsets(), CONTEXT);
        assert!(!answer.found);
        assert!(answer.text.is_empty());
        assert!((answer.confidence - 7.0).abs() < f32::EPSILON);
        assert_eq!(answer.span, None);
    }

    #[test]
    fn test_unmappable_span_is_no_answer() {
        let answer = map_answer(&span(0, 2), 1.5, &offsets(), CONTEXT);
        assert!(!answer.found);
        assert!((answer.confidence - 1.5).abs() < f32::EPSILON);

        let answer = map_answer(&span(2, 40), 1.5, &offsets(), CONTEXT);
        assert!(!answer.found);
    }

    #[test]
    fn test_probability_is_monotonic() {
        let low = AnswerText::no_answer(-2.0).probability();
        let mid = AnswerText::no_answer(0.0).probability();
        let high = AnswerText::no_answer(3.0).probability();
        assert!(low < mid && mid < high);
        assert!(high < 1.0 && low > 0.0);
    }

    #[test]
    fn test_serializes_without_span_when_absent() {
        let json = serde_json::to_value(AnswerText::no_answer(1.0)).unwrap();
        assert_eq!(json["found"], false);
        assert!(json.get("span").is_none());
    }
}
