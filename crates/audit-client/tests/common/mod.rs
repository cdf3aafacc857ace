#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use audit_client::{RawResponse, Transport, TransportError};
use audit_canonical::hash_canonical;
use serde_json::{json, Value};

/// One call seen by the mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: Value,
}

/// Transport replaying canned responses in order and recording every call.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    polls: Mutex<VecDeque<RawResponse>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: RawResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_success(&self, result: Value) {
        self.push(success(result));
    }

    pub fn push_poll(&self, response: RawResponse) {
        self.polls.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, path: &str, body: Value) {
        self.requests.lock().unwrap().push(Recorded {
            path: path.to_string(),
            body,
        });
    }

    fn next(queue: &Mutex<VecDeque<RawResponse>>, path: &str) -> Result<RawResponse, TransportError> {
        queue.lock().unwrap().pop_front().ok_or_else(|| TransportError::Request {
            url: path.to_string(),
            message: "no canned response".into(),
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(&self, path: &str, body: Value) -> Result<RawResponse, TransportError> {
        self.record(path, body);
        Self::next(&self.responses, path)
    }

    async fn get_json(&self, path: &str) -> Result<RawResponse, TransportError> {
        self.record(path, Value::Null);
        Self::next(&self.responses, path)
    }

    async fn poll_by_id(&self, request_id: &str) -> Result<RawResponse, TransportError> {
        let path = format!("request/{request_id}");
        self.record(&path, Value::Null);
        Self::next(&self.polls, &path)
    }
}

pub fn success(result: Value) -> RawResponse {
    RawResponse {
        status: 200,
        body: json!({
            "request_id": "req_ok",
            "request_time": "2024-01-01T00:00:00.000000Z",
            "response_time": "2024-01-01T00:00:00.100000Z",
            "status": "Success",
            "summary": "ok",
            "result": result,
        }),
    }
}

pub fn accepted(request_id: &str) -> RawResponse {
    RawResponse {
        status: 202,
        body: json!({
            "request_id": request_id,
            "status": "Accepted",
            "summary": "queued",
        }),
    }
}

/// Raw envelope for `message` and the hash the service would report for it.
pub fn envelope(message: &str) -> (Value, String) {
    hashed(json!({
        "event": {"message": message},
        "received_at": "2024-03-04T05:06:07.123456Z",
    }))
}

/// `raw` paired with the SHA-256 of its canonical bytes.
pub fn hashed(raw: Value) -> (Value, String) {
    let hash = hash_canonical(&raw).unwrap().to_hex();
    (raw, hash)
}
