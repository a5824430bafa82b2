//! The question answering entry point.
//!
//! [`QaPipeline::answer`] runs every stage in order: tokenize both texts,
//! build one sequence per context window, score each window remotely,
//! decode each window, merge, and map the winner back to context text.

use crate::answer::{AnswerText, map_answer};
use crate::config::PipelineConfig;
use crate::decode::{SpanDecoder, WindowDecision, merge};
use crate::error::Result;
use crate::inference::{InferenceBackend, KServeClient};
use crate::sequence::{EncodedSequence, SequenceBuilder};
use crate::tokenizer::Tokenizer;
use crate::vocab::Vocabulary;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Answers questions about a passage.
///
/// Holds no per-request state; one pipeline can serve concurrent callers.
///
/// # Examples
///
/// ```no_run
/// use qa_rs::config::PipelineConfig;
/// use qa_rs::pipeline::QaPipeline;
/// use qa_rs::vocab::Vocabulary;
/// use std::sync::Arc;
///
/// let vocab = Arc::new(Vocabulary::load("vocab.txt").unwrap());
/// let pipeline = QaPipeline::from_config(&PipelineConfig::default(), vocab).unwrap();
/// let answer = pipeline
///     .answer("Paris is the capital of France.", "What is the capital of France?")
///     .unwrap();
/// if answer.found {
///     println!("{} ({:.2})", answer.text, answer.probability());
/// }
/// ```
pub struct QaPipeline {
    tokenizer: Tokenizer,
    builder: SequenceBuilder,
    decoder: SpanDecoder,
    backend: Box<dyn InferenceBackend>,
    parallel: bool,
}

impl std::fmt::Debug for QaPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaPipeline")
            .field("builder", &self.builder)
            .field("decoder", &self.decoder)
            .field("backend", &self.backend.describe())
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl QaPipeline {
    /// Creates a pipeline scoring windows with `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `config` is invalid.
    pub fn new(
        config: &PipelineConfig,
        vocab: Arc<Vocabulary>,
        backend: Box<dyn InferenceBackend>,
    ) -> Result<Self> {
        config.validate()?;

        let special = vocab.special();
        let tokenizer = Tokenizer::new(vocab).lowercase(config.lowercase);
        let builder = SequenceBuilder::new(special, config.max_seq_length, config.doc_stride)
            .max_answer_length(config.max_answer_length);
        builder.validate()?;

        Ok(Self {
            tokenizer,
            builder,
            decoder: SpanDecoder::new(config.max_answer_length, config.no_answer_threshold),
            backend,
            parallel: config.parallel_windows,
        })
    }

    /// Creates a pipeline calling the model server named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `config` is invalid.
    pub fn from_config(config: &PipelineConfig, vocab: Arc<Vocabulary>) -> Result<Self> {
        let client = KServeClient::new(config.endpoint.clone());
        Self::new(config, vocab, Box::new(client))
    }

    /// Tokenizes and windows the inputs without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Sequence`] if the question is too long.
    pub fn encode(&self, context: &str, question: &str) -> Result<Vec<EncodedSequence>> {
        let question_tokens = self.tokenizer.tokenize(question);
        let context_tokens = self.tokenizer.tokenize(context);
        Ok(self.builder.build(&question_tokens, &context_tokens)?)
    }

    /// Answers `question` from `context`.
    ///
    /// A passage without an answer yields `found == false`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Sequence`] if the question is too long and
    /// [`crate::Error::Inference`] if any window's remote call fails. No
    /// partial answer is produced when a window fails.
    pub fn answer(&self, context: &str, question: &str) -> Result<AnswerText> {
        let started = Instant::now();
        let sequences = self.encode(context, question)?;

        let decisions: Vec<WindowDecision> = if self.parallel && sequences.len() > 1 {
            sequences
                .par_iter()
                .map(|sequence| self.score_window(sequence))
                .collect::<Result<_>>()?
        } else {
            sequences
                .iter()
                .map(|sequence| self.score_window(sequence))
                .collect::<Result<_>>()?
        };

        let answer = merge(decisions).map_or_else(
            || AnswerText::no_answer(f32::NEG_INFINITY),
            |winner| {
                sequences.get(winner.window_index).map_or_else(
                    || AnswerText::no_answer(winner.no_answer_score),
                    |sequence| {
                        map_answer(
                            &winner.decision,
                            winner.no_answer_score,
                            &sequence.token_to_char,
                            context,
                        )
                    },
                )
            },
        );

        tracing::info!(
            windows = sequences.len(),
            found = answer.found,
            confidence = answer.confidence,
            elapsed_ms = started.elapsed().as_millis(),
            "answered question"
        );
        Ok(answer)
    }

    fn score_window(&self, sequence: &EncodedSequence) -> Result<WindowDecision> {
        let logits = self.backend.infer(sequence)?;
        Ok(self.decoder.decode(&logits, sequence)?)
    }
}
