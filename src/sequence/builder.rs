//! Model input assembly.

use super::window::{effective_stride, plan_windows};
use crate::error::SequenceError;
use crate::tokenizer::Token;
use crate::vocab::SpecialTokens;
use serde::Serialize;
use std::ops::Range;

/// Position of `[CLS]` in every sequence.
pub const CLS_INDEX: usize = 0;

/// Marker tokens added around question and context: `[CLS]`, `[SEP]`, `[SEP]`.
pub const SPECIAL_TOKEN_COUNT: usize = 3;

/// One fixed-length model input covering a window of the context.
///
/// Layout: `[CLS] question [SEP] context-window [SEP] [PAD]...`. Segment 0
/// covers `[CLS]`, the question and the first `[SEP]`; segment 1 covers the
/// context window and the trailing `[SEP]`; padding has segment 0 and
/// attention mask 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedSequence {
    /// Vocabulary ids per position.
    pub input_ids: Vec<i64>,
    /// Segment (token type) ids per position.
    pub segment_ids: Vec<i64>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<i64>,
    /// Byte range in the context for context positions, `None` elsewhere.
    pub token_to_char: Vec<Option<Range<usize>>>,
    /// Index of this window among the windows of one request.
    pub window_index: usize,
    /// Index of the first window token within the full context token list.
    pub context_offset: usize,
    /// Sequence positions holding context tokens (trailing `[SEP]` excluded).
    pub context_positions: Range<usize>,
}

impl EncodedSequence {
    /// Sequence length, equal to the configured maximum.
    #[must_use]
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Returns `true` for a zero-length sequence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding positions.
    #[must_use]
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

/// Builds windowed model inputs from question and context tokens.
///
/// # Examples
///
/// ```
/// use qa_rs::sequence::SequenceBuilder;
/// use qa_rs::tokenizer::Tokenizer;
/// use qa_rs::vocab::Vocabulary;
/// use std::sync::Arc;
///
/// let vocab = Arc::new(Vocabulary::parse("[PAD]\n[UNK]\n[CLS]\n[SEP]\nwho\nme\n").unwrap());
/// let tokenizer = Tokenizer::new(vocab.clone());
/// let builder = SequenceBuilder::new(vocab.special(), 8, 2);
///
/// let sequences = builder
///     .build(&tokenizer.tokenize("who"), &tokenizer.tokenize("me"))
///     .unwrap();
/// assert_eq!(sequences.len(), 1);
/// assert_eq!(sequences[0].input_ids, vec![2, 4, 3, 5, 3, 0, 0, 0]);
/// assert_eq!(sequences[0].segment_ids, vec![0, 0, 0, 1, 1, 0, 0, 0]);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    special: SpecialTokens,
    max_length: usize,
    doc_stride: usize,
    max_answer_length: usize,
}

impl SequenceBuilder {
    /// Creates a builder for sequences of `max_length` positions whose
    /// windows advance by `doc_stride` context tokens.
    #[must_use]
    pub const fn new(special: SpecialTokens, max_length: usize, doc_stride: usize) -> Self {
        Self {
            special,
            max_length,
            doc_stride,
            max_answer_length: 0,
        }
    }

    /// Sets the longest answer (`end - start`, in tokens) that windows must
    /// be able to contain whole. The stride is reduced when needed.
    #[must_use]
    pub const fn max_answer_length(mut self, max_answer_length: usize) -> Self {
        self.max_answer_length = max_answer_length;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::InvalidConfig`] if the sequence cannot hold
    /// the markers plus one context token, or the stride is zero.
    pub fn validate(&self) -> Result<(), SequenceError> {
        if self.max_length <= SPECIAL_TOKEN_COUNT {
            return Err(SequenceError::InvalidConfig {
                reason: format!(
                    "max_length {} must exceed {SPECIAL_TOKEN_COUNT}",
                    self.max_length
                ),
            });
        }
        if self.doc_stride == 0 {
            return Err(SequenceError::InvalidConfig {
                reason: "doc_stride must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Context tokens per window for a question of `question_len` tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::TooLong`] if the question exceeds
    /// `max_length - 3` tokens.
    pub fn window_size(&self, question_len: usize) -> Result<usize, SequenceError> {
        let capacity = self.max_length.saturating_sub(SPECIAL_TOKEN_COUNT);
        if question_len > capacity {
            return Err(SequenceError::TooLong {
                length: question_len,
                max: capacity,
            });
        }
        Ok(capacity - question_len)
    }

    /// Builds one sequence per context window.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::TooLong`] when the question alone does not
    /// leave room for context, and [`SequenceError::InvalidConfig`] for an
    /// invalid builder configuration. The question is never truncated.
    pub fn build(
        &self,
        question: &[Token],
        context: &[Token],
    ) -> Result<Vec<EncodedSequence>, SequenceError> {
        self.validate()?;

        let window_size = self.window_size(question.len())?;
        if window_size == 0 && !context.is_empty() {
            return Err(SequenceError::TooLong {
                length: question.len(),
                max: self.max_length - SPECIAL_TOKEN_COUNT - 1,
            });
        }

        let stride = effective_stride(self.doc_stride, window_size, self.max_answer_length);
        if stride < self.doc_stride && context.len() > window_size {
            tracing::warn!(
                doc_stride = self.doc_stride,
                stride,
                window_size,
                max_answer_length = self.max_answer_length,
                "doc stride reduced so answers fit in one window"
            );
        }

        let windows = plan_windows(context.len(), window_size, stride);
        tracing::debug!(
            question_tokens = question.len(),
            context_tokens = context.len(),
            window_size,
            stride,
            windows = windows.len(),
            "planned context windows"
        );

        Ok(windows
            .into_iter()
            .enumerate()
            .map(|(index, range)| self.encode_window(question, context, index, range))
            .collect())
    }

    fn encode_window(
        &self,
        question: &[Token],
        context: &[Token],
        window_index: usize,
        range: Range<usize>,
    ) -> EncodedSequence {
        let len = self.max_length;
        let mut input_ids = Vec::with_capacity(len);
        let mut segment_ids = Vec::with_capacity(len);
        let mut token_to_char = Vec::with_capacity(len);

        let mut push = |id: u32, segment: i64, offsets: Option<Range<usize>>| {
            input_ids.push(i64::from(id));
            segment_ids.push(segment);
            token_to_char.push(offsets);
        };

        push(self.special.cls, 0, None);
        for token in question {
            push(token.id, 0, None);
        }
        push(self.special.sep, 0, None);

        let context_start = question.len() + 2;
        for token in &context[range.clone()] {
            push(token.id, 1, Some(token.offsets.clone()));
        }
        let context_end = context_start + range.len();
        push(self.special.sep, 1, None);

        let real_len = input_ids.len();
        let mut attention_mask = vec![1; real_len];
        attention_mask.resize(len, 0);
        input_ids.resize(len, i64::from(self.special.pad));
        segment_ids.resize(len, 0);
        token_to_char.resize(len, None);

        EncodedSequence {
            input_ids,
            segment_ids,
            attention_mask,
            token_to_char,
            window_index,
            context_offset: range.start,
            context_positions: context_start..context_end,
        }
    }
}
