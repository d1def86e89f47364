//! Decoding of SSE-formatted response bodies
//!
//! The analysis service answers a tool call with a server-sent-events stream
//! that has been buffered into a single body. Each block carries an optional
//! `event:` line and one or more `data:` lines. JSON-RPC responses complete a
//! message; bare `{"content": ..}` / `{"text": ..}` objects are chunks that
//! accumulate until `[DONE]` or the end of the body.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::mcp::types::{JsonRpcMessage, ToolCallResult};

const MESSAGE_EVENT: &str = "message";
const DONE_MARKER: &str = "[DONE]";

/// Why a body yielded no usable text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseDiagnostic {
    #[error("No message event present in response")]
    NoMessageEvent,

    #[error("Failed to parse message data: {0}")]
    InvalidPayload(String),

    #[error("Malformed event stream: {0}")]
    Malformed(String),

    #[error("DeepWiki error: {message} (code {code})")]
    RpcError { code: i64, message: String },
}

/// Text extracted from a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub text: String,
    /// The tool reported the text as an error (`isError`)
    pub is_error: bool,
}

/// What a single data payload contributes
enum Payload {
    Complete(ParsedMessage),
    Chunk(String),
    Skip,
    Failed(ParseDiagnostic),
    Unrecognized(String),
}

/// One SSE block
#[derive(Default)]
struct Block<'a> {
    event: Option<&'a str>,
    data: Vec<&'a str>,
}

pub struct ResponseParser;

impl ResponseParser {
    /// Extract the answer text from a response body
    pub fn parse(body: &str) -> Result<String, ParseDiagnostic> {
        Self::parse_message(body).map(|message| message.text)
    }

    /// Like [`ResponseParser::parse`], keeping the tool's error flag
    pub fn parse_message(body: &str) -> Result<ParsedMessage, ParseDiagnostic> {
        let trimmed = body.trim();

        // Servers may answer with plain JSON instead of an event stream
        if trimmed.starts_with('{') {
            return Self::parse_json_body(trimmed);
        }

        let mut chunks = String::new();
        let mut invalid: Option<String> = None;
        let mut malformed: Option<String> = None;

        for lines in Self::split_blocks(body) {
            let block = match Self::parse_block(&lines) {
                Ok(block) => block,
                Err(line) => {
                    trace!("Skipping malformed SSE block at line: {}", line);
                    malformed.get_or_insert_with(|| format!("unexpected line '{}'", line));
                    continue;
                }
            };

            if block.event.map_or(false, |event| event != MESSAGE_EVENT) || block.data.is_empty() {
                continue;
            }

            let data = block.data.join("\n");
            let data = data.trim();
            if data == DONE_MARKER {
                break;
            }

            match Self::interpret(data) {
                Payload::Complete(mut message) => {
                    if !chunks.is_empty() {
                        chunks.push_str(&message.text);
                        message.text = chunks;
                    }
                    return Ok(message);
                }
                Payload::Chunk(text) => chunks.push_str(&text),
                Payload::Skip => {}
                Payload::Failed(diagnostic) => return Err(diagnostic),
                Payload::Unrecognized(detail) => {
                    invalid.get_or_insert(detail);
                }
            }
        }

        if !chunks.is_empty() {
            return Ok(ParsedMessage {
                text: chunks,
                is_error: false,
            });
        }

        let diagnostic = match (malformed, invalid) {
            (Some(detail), _) => ParseDiagnostic::Malformed(detail),
            (None, Some(detail)) => ParseDiagnostic::InvalidPayload(detail),
            (None, None) => ParseDiagnostic::NoMessageEvent,
        };
        debug!("Response yielded no message: {}", diagnostic);
        Err(diagnostic)
    }

    fn parse_json_body(body: &str) -> Result<ParsedMessage, ParseDiagnostic> {
        match Self::interpret(body) {
            Payload::Complete(message) => Ok(message),
            Payload::Chunk(text) => Ok(ParsedMessage {
                text,
                is_error: false,
            }),
            Payload::Skip => Err(ParseDiagnostic::NoMessageEvent),
            Payload::Failed(diagnostic) => Err(diagnostic),
            Payload::Unrecognized(detail) => Err(ParseDiagnostic::InvalidPayload(detail)),
        }
    }

    /// Group lines into blank-line separated blocks; `lines()` also strips `\r`
    fn split_blocks(body: &str) -> Vec<Vec<&str>> {
        let mut blocks = Vec::new();
        let mut current = Vec::new();

        for line in body.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
            } else {
                current.push(line);
            }
        }

        if !current.is_empty() {
            blocks.push(current);
        }

        blocks
    }

    /// Parse the field lines of one block; the offending line on failure.
    /// Unknown field names are ignored, a line without a colon is not.
    fn parse_block<'a>(lines: &[&'a str]) -> Result<Block<'a>, &'a str> {
        let mut block = Block::default();

        for &line in lines {
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').ok_or(line)?;
            let value = value.strip_prefix(' ').unwrap_or(value);

            match field {
                "event" => block.event = Some(value.trim()),
                "data" => block.data.push(value),
                "id" | "retry" => {}
                other => trace!("Ignoring unknown SSE field '{}'", other),
            }
        }

        Ok(block)
    }

    fn interpret(data: &str) -> Payload {
        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => return Payload::Unrecognized(e.to_string()),
        };

        let Some(object) = value.as_object() else {
            return Payload::Unrecognized("data is not a JSON object".to_string());
        };

        let is_rpc = ["jsonrpc", "result", "error", "method"]
            .iter()
            .any(|key| object.contains_key(*key));

        if !is_rpc {
            return match object
                .get("content")
                .or_else(|| object.get("text"))
                .and_then(Value::as_str)
            {
                Some(text) => Payload::Chunk(text.to_string()),
                None => Payload::Unrecognized("object carries no text".to_string()),
            };
        }

        let message: JsonRpcMessage = match serde_json::from_value(value.clone()) {
            Ok(message) => message,
            Err(e) => return Payload::Unrecognized(e.to_string()),
        };

        if let Some(error) = message.error {
            return Payload::Failed(ParseDiagnostic::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        if message.is_notification() {
            return Payload::Skip;
        }

        let Some(result) = message.result else {
            return Payload::Unrecognized("response has neither result nor error".to_string());
        };

        match serde_json::from_value::<ToolCallResult>(result) {
            Ok(tool_result) => match tool_result.text() {
                Some(text) => Payload::Complete(ParsedMessage {
                    text,
                    is_error: tool_result.is_error,
                }),
                None => Payload::Unrecognized("result carries no text content".to_string()),
            },
            Err(e) => Payload::Unrecognized(e.to_string()),
        }
    }
}
