//! Service response envelope decoding.
//!
//! Every endpoint answers with
//! `{request_id, request_time, response_time, status, summary, result}`.
//! `status` is `Success` on 200 and `Accepted` on 202; anything else is a
//! service error whose `result.errors` lists the offending fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AuditError;
use crate::transport::RawResponse;

/// Status string for completed requests.
pub const STATUS_SUCCESS: &str = "Success";
/// Status string for queued requests.
pub const STATUS_ACCEPTED: &str = "Accepted";

/// Metadata common to every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Request identifier.
    #[serde(default)]
    pub request_id: String,
    /// When the service received the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_time: Option<String>,
    /// When the service answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    /// Outcome status.
    pub status: String,
    /// Human-readable summary.
    #[serde(default)]
    pub summary: String,
}

/// One structured error reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Error code.
    #[serde(default)]
    pub code: String,
    /// Description.
    #[serde(default)]
    pub detail: String,
    /// Offending input location.
    #[serde(default)]
    pub source: String,
    /// JSON path, when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(flatten)]
    header: ResponseHeader,
    #[serde(default)]
    result: Value,
}

#[derive(Deserialize, Default)]
struct ErrorResult {
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// Splits a raw response into its header and untyped result.
pub fn decode_envelope(raw: RawResponse) -> Result<(ResponseHeader, Value), AuditError> {
    let envelope: Envelope = serde_json::from_value(raw.body)?;
    let Envelope { header, result } = envelope;

    match header.status.as_str() {
        STATUS_SUCCESS => Ok((header, result)),
        STATUS_ACCEPTED => Err(AuditError::AcceptedPending {
            request_id: header.request_id,
        }),
        _ => {
            let errors = serde_json::from_value::<ErrorResult>(result)
                .unwrap_or_default()
                .errors;
            Err(AuditError::Service {
                request_id: header.request_id,
                status: header.status,
                summary: header.summary,
                errors,
            })
        }
    }
}

/// Decodes a successful response's result into `T`.
pub fn decode_result<T: DeserializeOwned>(raw: RawResponse) -> Result<(ResponseHeader, T), AuditError> {
    let (header, result) = decode_envelope(raw)?;
    Ok((header, serde_json::from_value(result)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, body: Value) -> RawResponse {
        RawResponse { status, body }
    }

    #[test]
    fn decodes_success_result() {
        let body = json!({
            "request_id": "req_1",
            "request_time": "2024-01-01T00:00:00Z",
            "response_time": "2024-01-01T00:00:01Z",
            "status": "Success",
            "summary": "ok",
            "result": {"value": 3}
        });
        let (header, result): (_, Value) = decode_result(raw(200, body)).unwrap();
        assert_eq!(header.request_id, "req_1");
        assert_eq!(result["value"], 3);
    }

    #[test]
    fn accepted_becomes_pending() {
        let body = json!({"request_id": "req_2", "status": "Accepted", "summary": "queued"});
        let err = decode_envelope(raw(202, body)).unwrap_err();
        assert!(matches!(err, AuditError::AcceptedPending { request_id } if request_id == "req_2"));
    }

    #[test]
    fn service_error_carries_field_errors() {
        let body = json!({
            "request_id": "req_3",
            "status": "ValidationError",
            "summary": "bad input",
            "result": {"errors": [{"code": "missing", "detail": "message is required", "source": "/event/message"}]}
        });
        match decode_envelope(raw(400, body)).unwrap_err() {
            AuditError::Service { status, errors, .. } => {
                assert_eq!(status, "ValidationError");
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].source, "/event/message");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = decode_envelope(raw(200, json!(["not", "an", "object"]))).unwrap_err();
        assert!(matches!(err, AuditError::Decode(_)));
    }
}
