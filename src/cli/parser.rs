//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::config::PipelineConfig;
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// QA-RS: extractive question answering against a remote BERT model.
///
/// Tokenizes a passage and a question, sends the model inputs to a KServe v2
/// model server, and prints the answer span found in the passage.
#[derive(Parser, Debug)]
#[command(name = "qa-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON configuration file; flags override its values.
    #[arg(short, long, env = "QA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subword vocabulary file, one entry per line.
    #[arg(long, env = "QA_VOCAB", default_value = "vocab.txt", global = true)]
    pub vocab: PathBuf,

    /// Model server overrides.
    #[command(flatten)]
    pub server: ServerArgs,

    /// Pipeline overrides.
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Model server location.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Model server host.
    #[arg(long, env = "QA_HOST", global = true)]
    pub host: Option<String>,

    /// Model server port.
    #[arg(long, env = "QA_PORT", global = true)]
    pub port: Option<u16>,

    /// Served model name.
    #[arg(long = "model", env = "QA_MODEL", global = true)]
    pub model_name: Option<String>,

    /// Served model version (latest if omitted).
    #[arg(long, env = "QA_MODEL_VERSION", global = true)]
    pub model_version: Option<String>,

    /// Timeout for each remote call in milliseconds.
    #[arg(long, env = "QA_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,
}

/// Sequence and decoding settings.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Model input length in tokens.
    #[arg(long, env = "QA_MAX_SEQ_LENGTH", global = true)]
    pub max_seq_length: Option<usize>,

    /// Context tokens between window starts.
    #[arg(long, env = "QA_DOC_STRIDE", global = true)]
    pub doc_stride: Option<usize>,

    /// Longest answer as end minus start, in tokens.
    #[arg(long, env = "QA_MAX_ANSWER_LENGTH", global = true)]
    pub max_answer_length: Option<usize>,

    /// Bias added to the best span score before the no-answer comparison.
    #[arg(long, env = "QA_NO_ANSWER_THRESHOLD", allow_negative_numbers = true, global = true)]
    pub no_answer_threshold: Option<f32>,

    /// Match the vocabulary case-sensitively (cased models).
    #[arg(long, global = true)]
    pub cased: bool,

    /// Score windows concurrently.
    #[arg(long, global = true)]
    pub parallel: bool,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question from a passage.
    Ask {
        /// The question.
        #[arg(short, long)]
        question: String,

        /// Passage text.
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Show the subword tokens of a text.
    ///
    /// Runs locally; no model server is needed.
    Tokenize {
        /// Text to tokenize.
        text: String,
    },

    /// Show the model inputs built for a question and passage.
    ///
    /// Runs locally; no model server is needed.
    Encode {
        /// The question.
        #[arg(short, long)]
        question: String,

        /// Passage text.
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Check that the model server can serve the model.
    Ready,
}

/// Passage source: inline text or a file.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ContextArgs {
    /// Passage text.
    #[arg(long)]
    pub context: Option<String>,

    /// File holding the passage.
    #[arg(long)]
    pub context_file: Option<PathBuf>,
}

impl Cli {
    /// Builds the pipeline configuration: defaults, then the config file,
    /// then flags and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or the result is
    /// invalid.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        let server = &self.server;
        if let Some(host) = &server.host {
            config.endpoint.host.clone_from(host);
        }
        if let Some(port) = server.port {
            config.endpoint.port = port;
        }
        if let Some(name) = &server.model_name {
            config.endpoint.model_name.clone_from(name);
        }
        if server.model_version.is_some() {
            config.endpoint.model_version.clone_from(&server.model_version);
        }
        if let Some(timeout_ms) = server.timeout_ms {
            config.endpoint.timeout_ms = timeout_ms;
        }

        let pipeline = &self.pipeline;
        if let Some(value) = pipeline.max_seq_length {
            config.max_seq_length = value;
        }
        if let Some(value) = pipeline.doc_stride {
            config.doc_stride = value;
        }
        if let Some(value) = pipeline.max_answer_length {
            config.max_answer_length = value;
        }
        if let Some(value) = pipeline.no_answer_threshold {
            config.no_answer_threshold = value;
        }
        if pipeline.cased {
            config.lowercase = false;
        }
        if pipeline.parallel {
            config.parallel_windows = true;
        }

        config.validate()?;
        Ok(config)
    }
}
