//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::answer::AnswerText;
use crate::error::Error;
use crate::sequence::EncodedSequence;
use crate::tokenizer::Token;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats an answer.
#[must_use]
pub fn format_answer(answer: &AnswerText, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if answer.found {
                format!(
                    "{}\n  score: {:.3} (p={:.3})\n",
                    answer.text,
                    answer.confidence,
                    answer.probability()
                )
            } else {
                format!(
                    "No answer found.\n  no-answer score: {:.3}\n",
                    answer.confidence
                )
            }
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct AnswerJson<'a> {
                #[serde(flatten)]
                answer: &'a AnswerText,
                probability: f32,
            }
            format_json(&AnswerJson {
                answer,
                probability: answer.probability(),
            })
        }
    }
}

/// Formats a token list.
#[must_use]
pub fn format_tokens(tokens: &[Token], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if tokens.is_empty() {
                return "No tokens.\n".to_string();
            }
            let mut output = String::new();
            let _ = writeln!(output, "{:<6} {:<8} {:<12} Token", "Index", "ID", "Bytes");
            output.push_str(&"-".repeat(44));
            output.push('\n');
            for (index, token) in tokens.iter().enumerate() {
                let bytes = format!("{}..{}", token.offsets.start, token.offsets.end);
                let _ = writeln!(
                    output,
                    "{index:<6} {:<8} {bytes:<12} {}",
                    token.id, token.text
                );
            }
            output
        }
        OutputFormat::Json => format_json(&tokens),
    }
}

/// Formats the model inputs built for each window.
#[must_use]
pub fn format_sequences(sequences: &[EncodedSequence], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "Windows: {}", sequences.len());
            for sequence in sequences {
                let _ = writeln!(
                    output,
                    "\nWindow {} (context tokens from {}, {} real of {} positions)",
                    sequence.window_index,
                    sequence.context_offset,
                    sequence.real_len(),
                    sequence.len()
                );
                let real = sequence.real_len();
                let _ = writeln!(
                    output,
                    "  input_ids:      {}",
                    join(&sequence.input_ids[..real])
                );
                let _ = writeln!(
                    output,
                    "  segment_ids:    {}",
                    join(&sequence.segment_ids[..real])
                );
                let _ = writeln!(
                    output,
                    "  context:        positions {}..{}",
                    sequence.context_positions.start, sequence.context_positions.end
                );
            }
            output
        }
        OutputFormat::Json => format_json(&sequences),
    }
}

/// Formats a readiness probe result.
#[must_use]
pub fn format_ready(address: &str, model: &str, ready: bool, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let state = if ready { "ready" } else { "not ready" };
            format!("Model {model} at {address}: {state}\n")
        }
        OutputFormat::Json => format_json(&serde_json::json!({
            "address": address,
            "model": model,
            "ready": ready,
        })),
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => format_json(&serde_json::json!({
            "error": error.to_string(),
            "retryable": error.is_retryable(),
        })),
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn join(values: &[i64]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
