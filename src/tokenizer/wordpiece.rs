//! Greedy longest-match subword splitting.

use super::Token;
use super::basic::Word;
use crate::vocab::{CONTINUATION_PREFIX, UNK_TOKEN, Vocabulary};
use std::collections::VecDeque;

/// Words longer than this many characters map to a single `[UNK]`.
pub const MAX_WORD_CHARS: usize = 100;

/// Splits one word into subword tokens, appending them to `out`.
///
/// Starting at the beginning of the word, the longest prefix present in the
/// vocabulary is emitted, then matching repeats on the remainder with the
/// `##` continuation prefix. Candidate pieces always end on an original
/// character boundary. When no prefix of the remainder matches, a single
/// `[UNK]` covering the whole remainder is emitted.
pub fn split_word(vocab: &Vocabulary, word: &Word, out: &mut VecDeque<Token>) {
    let unk = vocab.special().unk;
    let bounds = word.boundaries();
    let last = bounds.len() - 1;

    if word.char_count() > MAX_WORD_CHARS {
        out.push_back(Token::new(UNK_TOKEN, unk, word.offsets.clone(), false));
        return;
    }

    let mut candidate = String::with_capacity(word.normalized.len() + CONTINUATION_PREFIX.len());
    let mut start = 0;

    while start < last {
        let is_continuation = start > 0;
        let (norm_start, orig_start) = bounds[start];

        let matched = (start + 1..=last).rev().find_map(|end| {
            let (norm_end, orig_end) = bounds[end];
            if norm_end == norm_start {
                return None;
            }
            candidate.clear();
            if is_continuation {
                candidate.push_str(CONTINUATION_PREFIX);
            }
            candidate.push_str(&word.normalized[norm_start..norm_end]);
            vocab.id(&candidate).map(|id| (end, orig_end, id))
        });

        if let Some((end, orig_end, id)) = matched {
            out.push_back(Token::new(
                candidate.as_str(),
                id,
                orig_start..orig_end,
                is_continuation,
            ));
            start = end;
        } else {
            out.push_back(Token::new(
                UNK_TOKEN,
                unk,
                orig_start..word.offsets.end,
                is_continuation,
            ));
            break;
        }
    }
}
