//! Subword tokenization with source offsets.
//!
//! The tokenizer turns raw text into vocabulary subwords while recording,
//! for every token, the byte range it came from in the original text. The
//! answer mapper relies on those ranges to slice the passage directly
//! instead of re-joining subword strings.
//!
//! - **basic**: whitespace/punctuation word splitting and lookup normalization
//! - **wordpiece**: greedy longest-match subword splitting

pub mod basic;
pub mod wordpiece;

use crate::vocab::{TokenId, Vocabulary};
use basic::Words;
use serde::Serialize;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

/// A subword token with its position in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Vocabulary string, including the `##` prefix for continuations.
    pub text: String,
    /// Vocabulary id.
    pub id: TokenId,
    /// Byte range in the original text, on character boundaries.
    pub offsets: Range<usize>,
    /// Whether this piece continues the previous piece of the same word.
    pub is_continuation: bool,
}

impl Token {
    /// Creates a token.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        id: TokenId,
        offsets: Range<usize>,
        is_continuation: bool,
    ) -> Self {
        Self {
            text: text.into(),
            id,
            offsets,
            is_continuation,
        }
    }
}

/// WordPiece tokenizer bound to a shared vocabulary.
///
/// # Examples
///
/// ```
/// use qa_rs::tokenizer::Tokenizer;
/// use qa_rs::vocab::Vocabulary;
/// use std::sync::Arc;
///
/// let vocab = Vocabulary::parse("[PAD]\n[UNK]\n[CLS]\n[SEP]\nparis\n.\n").unwrap();
/// let tokenizer = Tokenizer::new(Arc::new(vocab));
/// let tokens = tokenizer.tokenize("Paris.");
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[0].offsets, 0..5);
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocab: Arc<Vocabulary>,
    lowercase: bool,
}

impl Tokenizer {
    /// Creates a lowercasing (uncased) tokenizer.
    #[must_use]
    pub const fn new(vocab: Arc<Vocabulary>) -> Self {
        Self {
            vocab,
            lowercase: true,
        }
    }

    /// Sets whether lookup is case- and accent-insensitive.
    #[must_use]
    pub const fn lowercase(mut self, enabled: bool) -> Self {
        self.lowercase = enabled;
        self
    }

    /// The vocabulary this tokenizer reads from.
    #[must_use]
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Returns a lazy token iterator over `text`.
    ///
    /// The iterator is `Clone`; cloning it, or calling this again, restarts
    /// tokenization without any state carried between calls.
    #[must_use]
    pub fn tokens<'a>(&'a self, text: &'a str) -> Tokens<'a> {
        Tokens {
            vocab: &self.vocab,
            words: Words::new(text, self.lowercase),
            pending: VecDeque::new(),
        }
    }

    /// Tokenizes `text` into a vector.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokens(text).collect()
    }
}

/// Lazy iterator returned by [`Tokenizer::tokens`].
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    vocab: &'a Vocabulary,
    words: Words<'a>,
    pending: VecDeque<Token>,
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            let word = self.words.next()?;
            wordpiece::split_word(self.vocab, &word, &mut self.pending);
        }
    }
}
