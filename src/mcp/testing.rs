//! Scripted transport for protocol tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::{
    collections::VecDeque,
    sync::Mutex,
    time::Duration,
};

use crate::mcp::{
    transport::{RawResponse, Transport, TransportError},
    types::{JsonRpcRequest, SESSION_HEADER},
};

/// One request seen by the scripted transport
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub session_id: Option<String>,
    pub params: Value,
    pub timeout: Duration,
}

/// Replays queued responses in order and records every request
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<RawResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering, to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(
        &self,
        request: &JsonRpcRequest,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.to_string(),
            session_id: session_id.map(str::to_string),
            params: request.params.clone(),
            timeout,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(TransportError::Network("no scripted response left".to_string())))
    }
}

/// Successful handshake issuing `token`
pub fn handshake_ok(token: &str) -> RawResponse {
    let body = sse_message(&json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": { "protocolVersion": "2024-11-05", "capabilities": { "tools": {} } }
    }));
    RawResponse::new(200, body).with_header(SESSION_HEADER, token)
}

/// SSE body carrying one tool result with `text`
pub fn tool_text_body(text: &str) -> String {
    sse_message(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "result": { "content": [ { "type": "text", "text": text } ] }
    }))
}

/// Successful tool call answering with `text`
pub fn tool_text_ok(text: &str) -> RawResponse {
    RawResponse::new(200, tool_text_body(text))
}

/// Wrap a JSON value into a single `message` event
pub fn sse_message(value: &Value) -> String {
    format!("event: message\ndata: {}\n\n", value)
}
