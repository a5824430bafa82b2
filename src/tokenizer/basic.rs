//! Word splitting ahead of subword matching.
//!
//! Text is split on whitespace, and every punctuation character, CJK
//! ideograph and control character becomes a word of its own. Each [`Word`] keeps its byte range
//! in the original text together with a normalized form used only for
//! vocabulary lookup, so case folding and accent stripping never disturb
//! the offsets reported back to callers.

use std::ops::Range;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// A word of the original text plus its lookup form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Byte range of the word in the original text.
    pub offsets: Range<usize>,
    /// Normalized text used for vocabulary lookup.
    pub normalized: String,
    /// Pairs of (normalized byte offset, original byte offset), one per
    /// original character boundary, first and last included.
    boundaries: Vec<(usize, usize)>,
}

impl Word {
    fn new(text: &str, offsets: Range<usize>, lowercase: bool) -> Self {
        let mut normalized = String::with_capacity(offsets.len());
        let mut boundaries = Vec::with_capacity(offsets.len() + 1);

        for (i, c) in text[offsets.clone()].char_indices() {
            boundaries.push((normalized.len(), offsets.start + i));
            push_normalized(&mut normalized, c, lowercase);
        }
        boundaries.push((normalized.len(), offsets.end));

        Self {
            offsets,
            normalized,
            boundaries,
        }
    }

    /// Number of original characters in the word.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Character boundaries as (normalized offset, original offset).
    #[must_use]
    pub fn boundaries(&self) -> &[(usize, usize)] {
        &self.boundaries
    }
}

fn push_normalized(out: &mut String, c: char, lowercase: bool) {
    if lowercase {
        out.extend(
            c.to_lowercase()
                .nfd()
                .filter(|&d| !is_combining_mark(d)),
        );
    } else {
        out.push(c);
    }
}

/// Lazy iterator over the words of a text.
#[derive(Debug, Clone)]
pub struct Words<'a> {
    text: &'a str,
    pos: usize,
    lowercase: bool,
}

impl<'a> Words<'a> {
    /// Creates a word iterator over `text`.
    #[must_use]
    pub const fn new(text: &'a str, lowercase: bool) -> Self {
        Self {
            text,
            pos: 0,
            lowercase,
        }
    }
}

impl Iterator for Words<'_> {
    type Item = Word;

    fn next(&mut self) -> Option<Word> {
        let rest = &self.text[self.pos..];
        let (skip, first) = rest.char_indices().find(|&(_, c)| !is_separator(c))?;
        let start = self.pos + skip;

        let end = if is_single_char_word(first) {
            start + first.len_utf8()
        } else {
            self.text[start..]
                .char_indices()
                .find(|&(_, c)| is_separator(c) || is_single_char_word(c))
                .map_or(self.text.len(), |(i, _)| start + i)
        };

        self.pos = end;
        Some(Word::new(self.text, start..end, self.lowercase))
    }
}

/// Characters that only separate words and never appear in a token.
#[must_use]
pub fn is_separator(c: char) -> bool {
    c.is_whitespace()
}

/// Characters that always form a word of their own.
///
/// Control characters and U+FFFD match nothing in a vocabulary, so they end
/// up as `[UNK]` tokens that still cover their bytes.
#[must_use]
pub fn is_single_char_word(c: char) -> bool {
    is_punctuation(c) || is_cjk(c) || (c.is_control() && !c.is_whitespace()) || c == '\u{fffd}'
}

/// Characters that always form a single-character word.
#[must_use]
pub const fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '\u{00a1}'
                | '\u{00a7}'
                | '\u{00ab}'
                | '\u{00b6}'
                | '\u{00b7}'
                | '\u{00bb}'
                | '\u{00bf}'
                | '\u{2010}'..='\u{2027}'
                | '\u{2030}'..='\u{205e}'
                | '\u{3001}'..='\u{3003}'
                | '\u{3008}'..='\u{3011}'
                | '\u{3014}'..='\u{301f}'
                | '\u{ff01}'..='\u{ff0f}'
                | '\u{ff1a}'..='\u{ff20}'
                | '\u{ff3b}'..='\u{ff40}'
                | '\u{ff5b}'..='\u{ff65}'
        )
}

/// CJK unified ideographs, which are split per character.
#[must_use]
pub const fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{4e00}'..='\u{9fff}'
            | '\u{3400}'..='\u{4dbf}'
            | '\u{20000}'..='\u{2a6df}'
            | '\u{2a700}'..='\u{2b73f}'
            | '\u{2b740}'..='\u{2b81f}'
            | '\u{2b820}'..='\u{2ceaf}'
            | '\u{f900}'..='\u{faff}'
            | '\u{2f800}'..='\u{2fa1f}'
    )
}
