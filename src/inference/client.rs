//! Blocking KServe v2 HTTP client.

use super::protocol::{
    BINARY_CONTENT_TYPE, HEADER_LENGTH, decode_response, encode_request, error_message,
};
use super::{InferenceBackend, LogitPair};
use crate::config::EndpointConfig;
use crate::error::{InferenceError, Result};
use crate::sequence::EncodedSequence;
use std::io::Read;
use std::time::{Duration, Instant};

/// Largest response body read from the server.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Client for a model served over the KServe v2 REST protocol.
///
/// One HTTP call per [`infer`](InferenceBackend::infer); connect and read
/// timeouts both come from [`EndpointConfig::timeout_ms`]. The underlying
/// agent pools connections and is safe to share across threads.
///
/// # Examples
///
/// ```no_run
/// use qa_rs::config::EndpointConfig;
/// use qa_rs::inference::KServeClient;
///
/// let client = KServeClient::new(EndpointConfig::default());
/// if client.model_ready().unwrap() {
///     println!("model is ready at {}", client.endpoint().address());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct KServeClient {
    endpoint: EndpointConfig,
    agent: ureq::Agent,
}

impl KServeClient {
    /// Creates a client for `endpoint`.
    #[must_use]
    pub fn new(endpoint: EndpointConfig) -> Self {
        let timeout = Duration::from_millis(endpoint.timeout_ms);
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self { endpoint, agent }
    }

    /// Endpoint this client talks to.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Asks the server whether the model can serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ServerUnavailable`] or
    /// [`InferenceError::Timeout`] if the server cannot be reached. A reachable
    /// server reporting the model as not ready yields `Ok(false)`.
    pub fn model_ready(&self) -> Result<bool> {
        let url = self.endpoint.ready_url();
        match self.agent.get(&url).call() {
            Ok(response) => Ok(response.status() == 200),
            Err(ureq::Error::Status(status, _)) => {
                tracing::debug!(url = %url, status, "model not ready");
                Ok(false)
            }
            Err(ureq::Error::Transport(transport)) => Err(self.transport_error(&transport).into()),
        }
    }

    fn call(&self, sequence: &EncodedSequence) -> std::result::Result<LogitPair, InferenceError> {
        let request_id = format!("w{}", sequence.window_index);
        let request = encode_request(sequence, &self.endpoint.tensors, Some(&request_id))?;
        let url = self.endpoint.infer_url();
        let started = Instant::now();

        let response = match self
            .agent
            .post(&url)
            .set("Content-Type", BINARY_CONTENT_TYPE)
            .set(HEADER_LENGTH, &request.header_length.to_string())
            .send_bytes(&request.body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = self.read_body(response).unwrap_or_else(|err| {
                    tracing::debug!(url = %url, status, error = %err, "error body unreadable");
                    Vec::new()
                });
                let message = error_message(&body);
                tracing::debug!(url = %url, status, message = %message, "inference rejected");
                return Err(InferenceError::Server { status, message });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(self.transport_error(&transport));
            }
        };

        let header_length = match response.header(HEADER_LENGTH) {
            Some(value) => Some(value.trim().parse::<usize>().map_err(|_| {
                InferenceError::malformed(format!("invalid {HEADER_LENGTH} header: {value}"))
            })?),
            None => None,
        };
        let body = self.read_body(response)?;

        let logits = decode_response(
            &body,
            header_length,
            &self.endpoint.tensors,
            sequence.len(),
        )?;

        tracing::debug!(
            window = sequence.window_index,
            bytes_sent = request.body.len(),
            bytes_received = body.len(),
            latency_ms = started.elapsed().as_millis(),
            "inference call completed"
        );
        Ok(logits)
    }

    fn read_body(&self, response: ureq::Response) -> std::result::Result<Vec<u8>, InferenceError> {
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| self.io_error(&e))?;
        Ok(body)
    }

    fn transport_error(&self, transport: &ureq::Transport) -> InferenceError {
        let timed_out = std::error::Error::source(transport)
            .and_then(|source| source.downcast_ref::<std::io::Error>())
            .is_some_and(|e| is_timeout_kind(e.kind()));
        let message = transport.to_string();

        if timed_out || message.contains("timed out") || message.contains("timeout") {
            self.timeout()
        } else {
            InferenceError::ServerUnavailable {
                endpoint: self.endpoint.address(),
                reason: message,
            }
        }
    }

    fn io_error(&self, err: &std::io::Error) -> InferenceError {
        if is_timeout_kind(err.kind()) {
            self.timeout()
        } else {
            InferenceError::ServerUnavailable {
                endpoint: self.endpoint.address(),
                reason: err.to_string(),
            }
        }
    }

    fn timeout(&self) -> InferenceError {
        InferenceError::Timeout {
            endpoint: self.endpoint.address(),
            timeout_ms: self.endpoint.timeout_ms,
        }
    }
}

impl InferenceBackend for KServeClient {
    fn infer(&self, sequence: &EncodedSequence) -> Result<LogitPair> {
        self.call(sequence).map_err(|err| {
            tracing::debug!(
                window = sequence.window_index,
                endpoint = %self.endpoint.address(),
                error = %err,
                "inference call failed"
            );
            err.into()
        })
    }

    fn describe(&self) -> String {
        format!(
            "kserve {} model {}",
            self.endpoint.address(),
            self.endpoint.model_name
        )
    }
}

const fn is_timeout_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let client = KServeClient::new(EndpointConfig::default());
        assert_eq!(client.describe(), "kserve localhost:8000 model bert");
        assert_eq!(client.endpoint().timeout_ms, 10_000);
    }

    #[test]
    fn test_io_error_classification() {
        let client = KServeClient::new(EndpointConfig::default());
        let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert!(matches!(
            client.io_error(&timeout),
            InferenceError::Timeout {
                timeout_ms: 10_000,
                ..
            }
        ));

        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(
            client.io_error(&reset),
            InferenceError::ServerUnavailable { .. }
        ));
    }
}
