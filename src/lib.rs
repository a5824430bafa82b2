//! # QA-RS
//!
//! Extractive question answering against a remote BERT model.
//!
//! QA-RS does everything around the neural network: it turns a passage and
//! a question into the exact tensors a BERT question answering model expects,
//! sends them to a model server, and turns the returned start/end scores
//! back into a substring of the passage.
//!
//! ## Features
//!
//! - **WordPiece Tokenization**: greedy longest-match subwords with byte offsets into the source
//! - **Windowing**: long passages split into overlapping windows, best span merged across them
//! - **Remote Inference**: KServe v2 REST protocol (OpenVINO Model Server, Triton)
//! - **Abstention**: threshold-biased `[CLS]` comparison reports "no answer" as a normal result
//!
//! ## Example
//!
//! ```no_run
//! use qa_rs::{PipelineConfig, QaPipeline, Vocabulary};
//! use std::sync::Arc;
//!
//! let vocab = Arc::new(Vocabulary::load("vocab.txt")?);
//! let pipeline = QaPipeline::from_config(&PipelineConfig::default(), vocab)?;
//! let answer = pipeline.answer(
//!     "Paris is the capital of France.",
//!     "What is the capital of France?",
//! )?;
//! println!("{}", answer.text);
//! # Ok::<(), qa_rs::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod answer;
pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod inference;
pub mod io;
pub mod pipeline;
pub mod sequence;
pub mod tokenizer;
pub mod vocab;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export pipeline types
pub use answer::AnswerText;
pub use config::{EndpointConfig, PipelineConfig, TensorNames};
pub use pipeline::QaPipeline;

// Re-export stage types
pub use decode::{Decision, SpanCandidate, SpanDecoder};
pub use inference::{InferenceBackend, KServeClient, LogitPair};
pub use sequence::{EncodedSequence, SequenceBuilder};
pub use tokenizer::{Token, Tokenizer};
pub use vocab::{SpecialTokens, Vocabulary};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
