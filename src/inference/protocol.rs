//! KServe v2 request and response payloads.
//!
//! Requests use the binary tensor extension: a JSON header followed by the
//! raw little-endian tensor bytes, with the header size carried in the
//! [`HEADER_LENGTH`] HTTP header. Responses are accepted either in the same
//! binary form or as plain JSON with inline `data` arrays.

use crate::config::TensorNames;
use crate::error::InferenceError;
use crate::inference::LogitPair;
use crate::sequence::EncodedSequence;
use serde::{Deserialize, Serialize};

/// HTTP header carrying the JSON header size of a binary payload.
pub const HEADER_LENGTH: &str = "Inference-Header-Content-Length";

/// Content type of binary payloads.
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Datatype of every input tensor.
pub const INPUT_DATATYPE: &str = "INT64";

/// A serialized inference request.
#[derive(Debug, Clone)]
pub struct InferRequest {
    /// JSON header followed by tensor bytes.
    pub body: Vec<u8>,
    /// Size of the JSON header in bytes.
    pub header_length: usize,
}

#[derive(Serialize)]
struct RequestHeader<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    inputs: Vec<InputTensor<'a>>,
    outputs: Vec<RequestedOutput<'a>>,
}

#[derive(Serialize)]
struct InputTensor<'a> {
    name: &'a str,
    shape: [usize; 2],
    datatype: &'static str,
    parameters: BinaryDataSize,
}

#[derive(Serialize)]
struct BinaryDataSize {
    binary_data_size: usize,
}

#[derive(Serialize)]
struct RequestedOutput<'a> {
    name: &'a str,
    parameters: BinaryData,
}

#[derive(Serialize)]
struct BinaryData {
    binary_data: bool,
}

#[derive(Deserialize)]
struct ResponseHeader {
    #[serde(default)]
    outputs: Vec<OutputTensor>,
}

#[derive(Deserialize)]
struct OutputTensor {
    name: String,
    #[serde(default)]
    shape: Vec<usize>,
    datatype: String,
    #[serde(default)]
    parameters: OutputParameters,
    #[serde(default)]
    data: Option<Vec<f64>>,
}

#[derive(Deserialize, Default)]
struct OutputParameters {
    #[serde(default)]
    binary_data_size: Option<usize>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Serializes one sequence as a binary inference request.
///
/// Inputs are sent in the order ids, mask, segments, each with shape `[1, L]`.
///
/// # Errors
///
/// Returns [`InferenceError::MalformedResponse`] only if the header cannot
/// be serialized, which does not happen for valid tensor names.
pub fn encode_request(
    sequence: &EncodedSequence,
    names: &TensorNames,
    request_id: Option<&str>,
) -> Result<InferRequest, InferenceError> {
    let len = sequence.len();
    let tensors = [
        (names.input_ids.as_str(), sequence.input_ids.as_slice()),
        (names.attention_mask.as_str(), sequence.attention_mask.as_slice()),
        (names.segment_ids.as_str(), sequence.segment_ids.as_slice()),
    ];

    let header = RequestHeader {
        id: request_id,
        inputs: tensors
            .iter()
            .map(|&(name, values)| InputTensor {
                name,
                shape: [1, len],
                datatype: INPUT_DATATYPE,
                parameters: BinaryDataSize {
                    binary_data_size: values.len() * size_of::<i64>(),
                },
            })
            .collect(),
        outputs: [&names.start_logits, &names.end_logits]
            .into_iter()
            .map(|name| RequestedOutput {
                name,
                parameters: BinaryData { binary_data: true },
            })
            .collect(),
    };

    let mut body = serde_json::to_vec(&header)
        .map_err(|e| InferenceError::malformed(format!("request header: {e}")))?;
    let header_length = body.len();

    body.reserve(3 * len * size_of::<i64>());
    for (_, values) in tensors {
        for value in values {
            body.extend_from_slice(&value.to_le_bytes());
        }
    }

    Ok(InferRequest {
        body,
        header_length,
    })
}

/// Decodes a response body into start and end scores.
///
/// `header_length` is the value of [`HEADER_LENGTH`] when the server sent
/// one; without it the whole body is parsed as JSON. Each output must carry
/// exactly `expected_len` values.
///
/// # Errors
///
/// Returns [`InferenceError::MalformedResponse`] when the body cannot be
/// parsed, an output is missing, has an unsupported datatype, or has the
/// wrong number of values.
pub fn decode_response(
    body: &[u8],
    header_length: Option<usize>,
    names: &TensorNames,
    expected_len: usize,
) -> Result<LogitPair, InferenceError> {
    let (header_bytes, mut binary) = match header_length {
        Some(n) if n > body.len() => {
            return Err(InferenceError::malformed(format!(
                "header length {n} exceeds body size {}",
                body.len()
            )));
        }
        Some(n) => body.split_at(n),
        None => (body, &[][..]),
    };

    let header: ResponseHeader = serde_json::from_slice(header_bytes)
        .map_err(|e| InferenceError::malformed(format!("response header: {e}")))?;

    let mut start = None;
    let mut end = None;

    for output in header.outputs {
        let values = match output.parameters.binary_data_size {
            Some(size) => {
                if size > binary.len() {
                    return Err(InferenceError::malformed(format!(
                        "output {} declares {size} bytes, {} remain",
                        output.name,
                        binary.len()
                    )));
                }
                let (bytes, rest) = binary.split_at(size);
                binary = rest;
                decode_binary(&output.name, &output.datatype, bytes)?
            }
            None => decode_json(&output)?,
        };

        let elements: usize = output.shape.iter().product();
        if !output.shape.is_empty() && elements != values.len() {
            return Err(InferenceError::malformed(format!(
                "output {} has shape {:?} but {} values",
                output.name,
                output.shape,
                values.len()
            )));
        }

        if output.name == names.start_logits {
            start = Some(values);
        } else if output.name == names.end_logits {
            end = Some(values);
        }
    }

    let start_scores = start.ok_or_else(|| missing(&names.start_logits))?;
    let end_scores = end.ok_or_else(|| missing(&names.end_logits))?;

    let pair = LogitPair::new(start_scores, end_scores);
    pair.validate(expected_len)?;
    Ok(pair)
}

/// Extracts the diagnostic from an error response body.
///
/// KServe servers answer failures with `{"error": "..."}`; anything else is
/// returned as trimmed text.
#[must_use]
pub fn error_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        return parsed.error;
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "no error message".to_string()
    } else {
        text
    }
}

fn missing(name: &str) -> InferenceError {
    InferenceError::malformed(format!("missing output {name}"))
}

#[allow(clippy::cast_possible_truncation)]
fn decode_binary(name: &str, datatype: &str, bytes: &[u8]) -> Result<Vec<f32>, InferenceError> {
    match datatype {
        "FP32" => {
            check_width(name, bytes, 4)?;
            Ok(bytes
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect())
        }
        "FP64" => {
            check_width(name, bytes, 8)?;
            Ok(bytes
                .chunks_exact(8)
                .map(|chunk| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(chunk);
                    f64::from_le_bytes(raw) as f32
                })
                .collect())
        }
        other => Err(unsupported(name, other)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn decode_json(output: &OutputTensor) -> Result<Vec<f32>, InferenceError> {
    if !matches!(output.datatype.as_str(), "FP32" | "FP64") {
        return Err(unsupported(&output.name, &output.datatype));
    }
    let data = output
        .data
        .as_ref()
        .ok_or_else(|| InferenceError::malformed(format!("output {} has no data", output.name)))?;
    Ok(data.iter().map(|&v| v as f32).collect())
}

fn check_width(name: &str, bytes: &[u8], width: usize) -> Result<(), InferenceError> {
    if bytes.len() % width == 0 {
        Ok(())
    } else {
        Err(InferenceError::malformed(format!(
            "output {name} has {} bytes, not a multiple of {width}",
            bytes.len()
        )))
    }
}

fn unsupported(name: &str, datatype: &str) -> InferenceError {
    InferenceError::malformed(format!("output {name} has unsupported datatype {datatype}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sequence(len: usize) -> EncodedSequence {
        EncodedSequence {
            input_ids: (0..len as i64).collect(),
            segment_ids: vec![0; len],
            attention_mask: vec![1; len],
            token_to_char: vec![None; len],
            window_index: 0,
            context_offset: 0,
            context_positions: 0..0,
        }
    }

    fn binary_response(start: &[f32], end: &[f32]) -> (Vec<u8>, usize) {
        let header = serde_json::json!({
            "model_name": "bert",
            "outputs": [
                {"name": "end_logits", "shape": [1, end.len()], "datatype": "FP32",
                 "parameters": {"binary_data_size": end.len() * 4}},
                {"name": "start_logits", "shape": [1, start.len()], "datatype": "FP32",
                 "parameters": {"binary_data_size": start.len() * 4}},
            ]
        });
        let mut body = serde_json::to_vec(&header).unwrap();
        let header_length = body.len();
        for v in end.iter().chain(start) {
            body.extend_from_slice(&v.to_le_bytes());
        }
        (body, header_length)
    }

    #[test]
    fn test_encode_request_layout() {
        let seq = sequence(4);
        let request = encode_request(&seq, &TensorNames::default(), Some("q-1")).unwrap();

        let header: serde_json::Value =
            serde_json::from_slice(&request.body[..request.header_length]).unwrap();
        assert_eq!(header["id"], "q-1");
        assert_eq!(header["inputs"][0]["name"], "input_ids");
        assert_eq!(header["inputs"][0]["shape"], serde_json::json!([1, 4]));
        assert_eq!(header["inputs"][0]["datatype"], "INT64");
        assert_eq!(header["inputs"][2]["name"], "token_type_ids");
        assert_eq!(header["inputs"][1]["parameters"]["binary_data_size"], 32);
        assert_eq!(header["outputs"][1]["name"], "end_logits");

        let tensors = &request.body[request.header_length..];
        assert_eq!(tensors.len(), 3 * 4 * 8);
        assert_eq!(i64::from_le_bytes(tensors[8..16].try_into().unwrap()), 1);
        // attention mask follows the ids
        assert_eq!(i64::from_le_bytes(tensors[32..40].try_into().unwrap()), 1);
    }

    #[test]
    fn test_encode_request_without_id() {
        let request = encode_request(&sequence(2), &TensorNames::default(), None).unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&request.body[..request.header_length]).unwrap();
        assert!(header.get("id").is_none());
    }

    #[test]
    fn test_decode_binary_response_any_output_order() {
        let (body, header_length) = binary_response(&[0.5, 1.5, -2.0], &[3.0, 0.0, 1.0]);
        let pair = decode_response(&body, Some(header_length), &TensorNames::default(), 3).unwrap();
        assert_eq!(pair.start_scores, vec![0.5, 1.5, -2.0]);
        assert_eq!(pair.end_scores, vec![3.0, 0.0, 1.0]);
    }

    #[test]
    fn test_decode_json_response() {
        let body = serde_json::to_vec(&serde_json::json!({
            "outputs": [
                {"name": "start_logits", "shape": [1, 2], "datatype": "FP32", "data": [1.0, 2.0]},
                {"name": "end_logits", "shape": [1, 2], "datatype": "FP64", "data": [0.25, -1.0]},
            ]
        }))
        .unwrap();
        let pair = decode_response(&body, None, &TensorNames::default(), 2).unwrap();
        assert_eq!(pair.start_scores, vec![1.0, 2.0]);
        assert_eq!(pair.end_scores, vec![0.25, -1.0]);
    }

    #[test]
    fn test_decode_short_output_is_malformed() {
        let (body, header_length) = binary_response(&[0.5, 1.5], &[3.0, 0.0]);
        let err = decode_response(&body, Some(header_length), &TensorNames::default(), 3)
            .unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse { .. }));
    }

    #[test]
    fn test_decode_missing_output() {
        let body = serde_json::to_vec(&serde_json::json!({
            "outputs": [
                {"name": "start_logits", "shape": [1, 1], "datatype": "FP32", "data": [1.0]},
            ]
        }))
        .unwrap();
        let err = decode_response(&body, None, &TensorNames::default(), 1).unwrap_err();
        assert!(err.to_string().contains("missing output end_logits"));
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        let names = TensorNames::default();
        assert!(decode_response(b"not json", None, &names, 1).is_err());
        assert!(decode_response(b"{}", Some(10), &names, 1).is_err());

        let (mut body, header_length) = binary_response(&[1.0], &[1.0]);
        body.truncate(body.len() - 2);
        assert!(decode_response(&body, Some(header_length), &names, 1).is_err());

        let body = serde_json::to_vec(&serde_json::json!({
            "outputs": [
                {"name": "start_logits", "shape": [1, 1], "datatype": "INT8", "data": [1]},
            ]
        }))
        .unwrap();
        let err = decode_response(&body, None, &names, 1).unwrap_err();
        assert!(err.to_string().contains("unsupported datatype INT8"));
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let body = serde_json::to_vec(&serde_json::json!({
            "outputs": [
                {"name": "start_logits", "shape": [1, 3], "datatype": "FP32", "data": [1.0]},
                {"name": "end_logits", "shape": [1, 1], "datatype": "FP32", "data": [1.0]},
            ]
        }))
        .unwrap();
        let err = decode_response(&body, None, &TensorNames::default(), 1).unwrap_err();
        assert!(err.to_string().contains("shape"));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(br#"{"error": "Invalid input shape"}"#), "Invalid input shape");
        assert_eq!(error_message(b"  gateway down \n"), "gateway down");
        assert_eq!(error_message(b""), "no error message");
    }
}
