//! Conversation messages, tool calls and tool results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A message in a conversation. Immutable once appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
    /// Present only on assistant messages that request tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Present only on tool messages; links the result to its request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::text(text)])
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::text(text)])
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// Create an assistant message that requests tool invocations.
    ///
    /// Any accompanying text is kept; empty text produces no content part.
    pub fn assistant_tool_calls(text: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        let text = text.into();
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![ContentPart::text(text)]
        };
        Self::assistant_parts(content, calls)
    }

    /// Create an assistant message from the model's content as sent,
    /// structured fragments included.
    pub fn assistant_parts(content: Vec<ContentPart>, calls: Vec<ToolCallRequest>) -> Self {
        let mut message = Self::new(Role::Assistant, content);
        message.tool_calls = calls;
        message
    }

    /// Create a tool message carrying a single result.
    ///
    /// An error result keeps its structure as a `tool_error` part after the
    /// text the model reads.
    pub fn tool_result(result: &ToolResult) -> Self {
        let mut content = vec![ContentPart::text(result.output.to_model_text())];
        if let ToolOutput::Error(err) = &result.output {
            content.push(ContentPart::opaque(TOOL_ERROR_PART, err.to_json()));
        }
        let mut message = Self::new(Role::Tool, content);
        message.tool_call_id = Some(result.tool_call_id.clone());
        message
    }

    /// The structured error of a tool message, when it reports one.
    pub fn tool_error(&self) -> Option<ToolError> {
        self.content.iter().find_map(|part| match part {
            ContentPart::Opaque { kind, data } if kind == TOOL_ERROR_PART => {
                serde_json::from_value(data.clone()).ok()
            }
            _ => None,
        })
    }

    /// Normalized text content: all text parts concatenated in order.
    pub fn text(&self) -> String {
        normalize_parts(&self.content)
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Concatenate plain-text fragments in order, skipping opaque fragments.
pub fn normalize_parts(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            ContentPart::Opaque { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Opaque part kind carrying a [`ToolError`] on tool messages.
pub const TOOL_ERROR_PART: &str = "tool_error";

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Structured fragment the core does not interpret.
    Opaque {
        kind: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn opaque(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Opaque {
            kind: kind.into(),
            data,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result of one tool invocation. Exactly one exists per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub output: ToolOutput,
}

impl ToolResult {
    pub fn text(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            output: ToolOutput::Text(text.into()),
        }
    }

    pub fn error(
        tool_call_id: impl Into<String>,
        kind: ToolErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            output: ToolOutput::Error(ToolError {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.output, ToolOutput::Error(_))
    }
}

/// Tool output: text, or a structured error fed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutput {
    Text(String),
    Error(ToolError),
}

impl ToolOutput {
    /// Render the output as the text the model sees in the tool message.
    pub fn to_model_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Error(err) => serde_json::json!({ "error": err.to_json() }).to_string(),
        }
    }
}

/// Structured tool failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    /// `{"kind": ..., "message": ...}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind.to_string(),
            "message": self.message,
        })
    }
}

/// Why a tool invocation produced no usable output.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    CredentialUnavailable,
    InvocationFailed,
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_opaque_parts_and_keeps_order() {
        let mut message = Message::assistant("Hello");
        message
            .content
            .push(ContentPart::opaque("thought_signature", serde_json::json!("abc")));
        message.content.push(ContentPart::text(", world"));

        assert_eq!(message.text(), "Hello, world");
    }

    #[test]
    fn tool_message_links_back_to_request() {
        let result = ToolResult::text("call_1", "3 unread emails");
        let message = Message::tool_result(&result);

        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(message.text(), "3 unread emails");
    }

    #[test]
    fn error_output_renders_kind_and_message() {
        let result = ToolResult::error("call_2", ToolErrorKind::UnknownTool, "no tool 'fly'");
        let rendered: serde_json::Value =
            serde_json::from_str(&result.output.to_model_text()).unwrap();

        assert_eq!(rendered["error"]["kind"], "unknown_tool");
        assert_eq!(rendered["error"]["message"], "no tool 'fly'");
    }

    #[test]
    fn tool_error_survives_in_the_tool_message() {
        let result = ToolResult::error("call_3", ToolErrorKind::Timeout, "'search' did not finish");
        let message = Message::tool_result(&result);

        assert_eq!(message.content.len(), 2);
        assert_eq!(message.text(), result.output.to_model_text());
        let restored: Message =
            serde_json::from_str(&serde_json::to_string(&message).unwrap()).unwrap();
        let err = restored.tool_error().unwrap();
        assert_eq!(err.kind, ToolErrorKind::Timeout);
        assert_eq!(err.message, "'search' did not finish");

        assert!(Message::tool_result(&ToolResult::text("call_4", "ok")).tool_error().is_none());
    }

    #[test]
    fn assistant_without_text_has_no_content_parts() {
        let call = ToolCallRequest::new("c1", "search", serde_json::json!({"query": "rust"}));
        let message = Message::assistant_tool_calls("", vec![call]);

        assert!(message.content.is_empty());
        assert!(message.has_tool_calls());
    }
}
