//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cli::output::{
    OutputFormat, format_answer, format_ready, format_sequences, format_tokens,
};
use crate::cli::parser::{Cli, Commands, ContextArgs};
use crate::config::PipelineConfig;
use crate::error::{CommandError, Result};
use crate::inference::KServeClient;
use crate::io::read_text;
use crate::pipeline::QaPipeline;
use crate::tokenizer::Tokenizer;
use crate::vocab::Vocabulary;
use std::path::Path;
use std::sync::Arc;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = cli.pipeline_config()?;

    match &cli.command {
        Commands::Ask { question, context } => {
            cmd_ask(&cli.vocab, &config, question, context, format)
        }
        Commands::Tokenize { text } => cmd_tokenize(&cli.vocab, &config, text, format),
        Commands::Encode { question, context } => {
            cmd_encode(&cli.vocab, &config, question, context, format)
        }
        Commands::Ready => cmd_ready(&config, format),
    }
}

fn load_vocab(path: &Path) -> Result<Arc<Vocabulary>> {
    Ok(Arc::new(Vocabulary::load(path)?))
}

fn resolve_context(args: &ContextArgs) -> Result<String> {
    match (&args.context, &args.context_file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => read_text(path),
        (None, None) => Err(CommandError::MissingArgument(
            "--context or --context-file".to_string(),
        )
        .into()),
    }
}

fn cmd_ask(
    vocab_path: &Path,
    config: &PipelineConfig,
    question: &str,
    context: &ContextArgs,
    format: OutputFormat,
) -> Result<String> {
    if question.trim().is_empty() {
        return Err(CommandError::InvalidArgument("question is empty".to_string()).into());
    }
    let context = resolve_context(context)?;
    let pipeline = QaPipeline::from_config(config, load_vocab(vocab_path)?)?;
    let answer = pipeline.answer(&context, question)?;
    Ok(format_answer(&answer, format))
}

fn cmd_tokenize(
    vocab_path: &Path,
    config: &PipelineConfig,
    text: &str,
    format: OutputFormat,
) -> Result<String> {
    let tokenizer = Tokenizer::new(load_vocab(vocab_path)?).lowercase(config.lowercase);
    Ok(format_tokens(&tokenizer.tokenize(text), format))
}

fn cmd_encode(
    vocab_path: &Path,
    config: &PipelineConfig,
    question: &str,
    context: &ContextArgs,
    format: OutputFormat,
) -> Result<String> {
    let context = resolve_context(context)?;
    let pipeline = QaPipeline::from_config(config, load_vocab(vocab_path)?)?;
    let sequences = pipeline.encode(&context, question)?;
    Ok(format_sequences(&sequences, format))
}

fn cmd_ready(config: &PipelineConfig, format: OutputFormat) -> Result<String> {
    let client = KServeClient::new(config.endpoint.clone());
    let ready = client.model_ready()?;
    Ok(format_ready(
        &config.endpoint.address(),
        &config.endpoint.model_name,
        ready,
        format,
    ))
}
