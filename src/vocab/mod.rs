//! Subword vocabulary table.
//!
//! A vocabulary file is a newline-delimited list of subword strings where
//! the zero-based line number is the token id. The table is loaded once at
//! startup and shared read-only (usually behind an `Arc`) by every
//! tokenizer and sequence builder in the process.

use crate::error::{Error, IoError, Result, VocabularyError};
use crate::io::read_text;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

/// Token id as stored in the vocabulary.
pub type TokenId = u32;

/// Sequence start marker; its position also carries the no-answer signal.
pub const CLS_TOKEN: &str = "[CLS]";
/// Separator between question and context, and after the context.
pub const SEP_TOKEN: &str = "[SEP]";
/// Padding marker.
pub const PAD_TOKEN: &str = "[PAD]";
/// Replacement for fragments absent from the vocabulary.
pub const UNK_TOKEN: &str = "[UNK]";
/// Prefix marking a subword that continues the previous piece of a word.
pub const CONTINUATION_PREFIX: &str = "##";

/// Ids of the marker tokens the sequence layout depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    /// `[CLS]` id.
    pub cls: TokenId,
    /// `[SEP]` id.
    pub sep: TokenId,
    /// `[PAD]` id.
    pub pad: TokenId,
    /// `[UNK]` id.
    pub unk: TokenId,
}

/// Immutable mapping from subword string to token id.
///
/// # Examples
///
/// ```
/// use qa_rs::vocab::Vocabulary;
///
/// let vocab = Vocabulary::parse("[PAD]\n[UNK]\n[CLS]\n[SEP]\nparis\n##ian\n").unwrap();
/// assert_eq!(vocab.id("paris"), Some(4));
/// assert_eq!(vocab.token(5), Some("##ian"));
/// assert_eq!(vocab.special().sep, 3);
/// ```
#[derive(Debug, Clone)]
pub struct Vocabulary {
    ids: HashMap<String, TokenId>,
    tokens: Vec<String>,
    special: SpecialTokens,
}

impl Vocabulary {
    /// Loads a vocabulary file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Vocabulary`] if the file is missing, unreadable or
    /// malformed. Callers must not serve requests after this fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = read_text(path_ref).map_err(|err| match err {
            Error::Io(IoError::FileNotFound { path }) => {
                Error::Vocabulary(VocabularyError::FileNotFound { path })
            }
            other => Error::Vocabulary(VocabularyError::ReadFailed {
                path: path_ref.to_string_lossy().to_string(),
                reason: other.to_string(),
            }),
        })?;

        let vocab = Self::parse(&content)?;
        tracing::info!(
            path = %path_ref.display(),
            size = vocab.len(),
            "vocabulary loaded"
        );
        Ok(vocab)
    }

    /// Parses vocabulary file content.
    ///
    /// # Errors
    ///
    /// Returns an error for empty content, blank lines, entries containing
    /// whitespace, duplicates, or missing marker tokens.
    pub fn parse(content: &str) -> std::result::Result<Self, VocabularyError> {
        Self::from_entries(content.lines().enumerate().map(|(i, line)| (i + 1, line)))
    }

    /// Builds a vocabulary from tokens in id order.
    ///
    /// Intended for small synthetic vocabularies in tests and benchmarks.
    ///
    /// # Errors
    ///
    /// Same validation as [`Vocabulary::parse`].
    pub fn from_tokens<I, S>(tokens: I) -> std::result::Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owned: Vec<S> = tokens.into_iter().collect();
        Self::from_entries(
            owned
                .iter()
                .enumerate()
                .map(|(i, token)| (i + 1, token.as_ref())),
        )
    }

    fn from_entries<'a>(
        entries: impl Iterator<Item = (usize, &'a str)>,
    ) -> std::result::Result<Self, VocabularyError> {
        let mut ids: HashMap<String, TokenId> = HashMap::new();
        let mut tokens = Vec::new();

        for (line, entry) in entries {
            if entry.is_empty() {
                return Err(VocabularyError::MalformedEntry {
                    line,
                    reason: "empty line".to_string(),
                });
            }
            if entry.chars().any(char::is_whitespace) {
                return Err(VocabularyError::MalformedEntry {
                    line,
                    reason: format!("entry {entry:?} contains whitespace"),
                });
            }

            let id = TokenId::try_from(tokens.len()).map_err(|_| {
                VocabularyError::MalformedEntry {
                    line,
                    reason: "too many entries".to_string(),
                }
            })?;

            match ids.entry(entry.to_string()) {
                Entry::Occupied(existing) => {
                    return Err(VocabularyError::DuplicateEntry {
                        token: entry.to_string(),
                        first_line: *existing.get() as usize + 1,
                        line,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            tokens.push(entry.to_string());
        }

        if tokens.is_empty() {
            return Err(VocabularyError::Empty);
        }

        let required = |token: &str| {
            ids.get(token)
                .copied()
                .ok_or_else(|| VocabularyError::MissingSpecialToken {
                    token: token.to_string(),
                })
        };
        let special = SpecialTokens {
            cls: required(CLS_TOKEN)?,
            sep: required(SEP_TOKEN)?,
            pad: required(PAD_TOKEN)?,
            unk: required(UNK_TOKEN)?,
        };

        Ok(Self {
            ids,
            tokens,
            special,
        })
    }

    /// Looks up the id of a subword.
    #[must_use]
    pub fn id(&self, token: &str) -> Option<TokenId> {
        self.ids.get(token).copied()
    }

    /// Looks up the subword for an id.
    #[must_use]
    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always `false`; an empty vocabulary fails to load.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Marker token ids.
    #[must_use]
    pub const fn special(&self) -> SpecialTokens {
        self.special
    }
}
