//! MCP types and data structures

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON-RPC protocol version tag
pub const JSONRPC_VERSION: &str = "2.0";

/// Handshake method
pub const METHOD_INITIALIZE: &str = "initialize";

/// Tool invocation method
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Tool answering free-form questions about a repository
pub const TOOL_ASK_QUESTION: &str = "ask_question";

/// Transport header carrying the session token
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Accept header value; the server may answer with plain JSON or SSE
pub const ACCEPT_VALUE: &str = "application/json, text/event-stream";

const INITIALIZE_REQUEST_ID: u64 = 1;
const TOOL_CALL_REQUEST_ID: u64 = 2;

/// Client identity announced during the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Parameters of the `initialize` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

/// Arguments of the `ask_question` tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskQuestionArguments {
    pub repo_name: String,
    pub question: String,
}

/// Outgoing JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
    pub id: u64,
}

impl JsonRpcRequest {
    /// Build the session handshake request
    pub fn initialize(protocol_version: &str, client_info: ClientInfo) -> Self {
        let params = InitializeParams {
            protocol_version: protocol_version.to_string(),
            capabilities: json!({ "tools": {} }),
            client_info,
        };

        Self {
            jsonrpc: JSONRPC_VERSION,
            method: METHOD_INITIALIZE,
            params: json!(params),
            id: INITIALIZE_REQUEST_ID,
        }
    }

    /// Build an `ask_question` tool invocation
    pub fn ask_question(repo_name: &str, question: &str) -> Self {
        let arguments = AskQuestionArguments {
            repo_name: repo_name.to_string(),
            question: question.to_string(),
        };

        Self {
            jsonrpc: JSONRPC_VERSION,
            method: METHOD_TOOLS_CALL,
            params: json!({
                "name": TOOL_ASK_QUESTION,
                "arguments": arguments,
            }),
            id: TOOL_CALL_REQUEST_ID,
        }
    }

    pub fn to_value(&self) -> Value {
        json!(self)
    }
}

/// Incoming JSON-RPC message (response or notification)
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<McpError>,
}

impl JsonRpcMessage {
    /// Notifications carry a method and no result
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.result.is_none() && self.error.is_none()
    }
}

/// MCP error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Result payload of a `tools/call`
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Concatenated text items, `None` when there are none
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|item| match item {
                ToolContent::Text { text } => Some(text.as_str()),
                ToolContent::Other => None,
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        }
    }
}

/// A single content item of a tool result
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_request_shape() {
        let request = JsonRpcRequest::initialize(
            "2024-11-05",
            ClientInfo {
                name: "sidekick-mcp-client".to_string(),
                version: "0.1.0".to_string(),
            },
        );
        let value = request.to_value();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "initialize");
        assert_eq!(value["id"], 1);
        assert_eq!(value["params"]["protocolVersion"], "2024-11-05");
        assert_eq!(value["params"]["clientInfo"]["name"], "sidekick-mcp-client");
        assert!(value["params"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_ask_question_request_shape() {
        let value = JsonRpcRequest::ask_question("octocat/Hello-World", "What is this?").to_value();

        assert_eq!(value["method"], "tools/call");
        assert_eq!(value["params"]["name"], "ask_question");
        assert_eq!(value["params"]["arguments"]["repoName"], "octocat/Hello-World");
        assert_eq!(value["params"]["arguments"]["question"], "What is this?");
    }

    #[test]
    fn test_tool_result_text_skips_non_text_items() {
        let result: ToolCallResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "Hello " },
                { "type": "image", "data": "..." },
                { "type": "text", "text": "world" }
            ]
        }))
        .unwrap();

        assert_eq!(result.text().as_deref(), Some("Hello world"));
        assert!(!result.is_error);
    }

    #[test]
    fn test_notification_detection() {
        let message: JsonRpcMessage = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": "notifications/progress",
            "params": { "progress": 1 }
        }))
        .unwrap();

        assert!(message.is_notification());
    }
}
