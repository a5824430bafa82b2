//! Pipeline configuration.
//!
//! All values are fixed at process start. They come from an optional JSON
//! file, overlaid by CLI flags and `QA_*` environment variables.

use crate::error::{Error, Result};
use crate::io::read_text;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default model server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default model server port (the usual KServe v2 REST port).
pub const DEFAULT_PORT: u16 = 8000;

/// Default served model name.
pub const DEFAULT_MODEL_NAME: &str = "bert";

/// Default remote call timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default model input length.
pub const DEFAULT_MAX_SEQ_LENGTH: usize = 384;

/// Default window advance in context tokens.
pub const DEFAULT_DOC_STRIDE: usize = 128;

/// Default longest answer, as `end - start` in tokens.
pub const DEFAULT_MAX_ANSWER_LENGTH: usize = 30;

/// Names of the model's input and output tensors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TensorNames {
    /// Token id input.
    pub input_ids: String,
    /// Segment id input.
    pub segment_ids: String,
    /// Attention mask input.
    pub attention_mask: String,
    /// Start score output.
    pub start_logits: String,
    /// End score output.
    pub end_logits: String,
}

impl Default for TensorNames {
    fn default() -> Self {
        Self {
            input_ids: "input_ids".to_string(),
            segment_ids: "token_type_ids".to_string(),
            attention_mask: "attention_mask".to_string(),
            start_logits: "start_logits".to_string(),
            end_logits: "end_logits".to_string(),
        }
    }
}

/// Remote model server location and model selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Host name or address; may carry an `http://` or `https://` scheme.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Served model name.
    pub model_name: String,
    /// Served model version; latest when absent.
    pub model_version: Option<String>,
    /// Connect and read timeout for one call.
    pub timeout_ms: u64,
    /// Tensor names.
    pub tensors: TensorNames,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_version: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            tensors: TensorNames::default(),
        }
    }
}

impl EndpointConfig {
    /// `host:port` as shown in error messages.
    #[must_use]
    pub fn address(&self) -> String {
        let host = self
            .host
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/');
        format!("{host}:{}", self.port)
    }

    /// Base URL of the server.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// URL path prefix selecting the model and version.
    #[must_use]
    pub fn model_path(&self) -> String {
        self.model_version.as_ref().map_or_else(
            || format!("/v2/models/{}", self.model_name),
            |version| format!("/v2/models/{}/versions/{version}", self.model_name),
        )
    }

    /// Inference URL.
    #[must_use]
    pub fn infer_url(&self) -> String {
        format!("{}{}/infer", self.base_url(), self.model_path())
    }

    /// Model readiness URL.
    #[must_use]
    pub fn ready_url(&self) -> String {
        format!("{}{}/ready", self.base_url(), self.model_path())
    }
}

/// Full pipeline configuration.
///
/// # Examples
///
/// ```
/// use qa_rs::config::PipelineConfig;
///
/// let config: PipelineConfig =
///     serde_json::from_str(r#"{"max_seq_length": 256, "endpoint": {"port": 8001}}"#).unwrap();
/// assert_eq!(config.max_seq_length, 256);
/// assert_eq!(config.endpoint.port, 8001);
/// assert_eq!(config.doc_stride, 128);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model server endpoint.
    pub endpoint: EndpointConfig,
    /// Model input length, markers and padding included.
    pub max_seq_length: usize,
    /// Context tokens between consecutive window starts.
    pub doc_stride: usize,
    /// Longest answer span, as `end - start` in tokens.
    pub max_answer_length: usize,
    /// Bias added to the best span score before comparing with the no-answer score.
    pub no_answer_threshold: f32,
    /// Case- and accent-insensitive vocabulary lookup (uncased models).
    pub lowercase: bool,
    /// Send windows to the server concurrently.
    pub parallel_windows: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
            doc_stride: DEFAULT_DOC_STRIDE,
            max_answer_length: DEFAULT_MAX_ANSWER_LENGTH,
            no_answer_threshold: 0.0,
            lowercase: true,
            parallel_windows: false,
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON configuration file; absent fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = read_text(path_ref)?;
        serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("{}: {e}", path_ref.display()),
        })
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(Error::Config { message });

        if self.max_seq_length < 4 {
            return fail(format!(
                "max_seq_length must be at least 4, got {}",
                self.max_seq_length
            ));
        }
        if self.doc_stride == 0 {
            return fail("doc_stride must be > 0".to_string());
        }
        if self.max_answer_length == 0 {
            return fail("max_answer_length must be > 0".to_string());
        }
        if !self.no_answer_threshold.is_finite() {
            return fail(format!(
                "no_answer_threshold must be finite, got {}",
                self.no_answer_threshold
            ));
        }
        if self.endpoint.timeout_ms == 0 {
            return fail("timeout_ms must be > 0".to_string());
        }
        if self.endpoint.model_name.is_empty() {
            return fail("model_name must not be empty".to_string());
        }
        Ok(())
    }
}
