//! Tests for core types.

use pretty_assertions::assert_eq;
use serde_json::json;

use planx::reasoning::ReplyContent;
use planx::types::*;

#[test]
fn message_constructors_set_roles() {
    assert_eq!(Message::system("You are helpful.").role, Role::System);
    assert_eq!(Message::user("Hello").role, Role::User);
    assert_eq!(Message::assistant("Hi there!").text(), "Hi there!");
}

#[test]
fn message_wire_format() {
    let call = ToolCallRequest::new("call_1", "web_search", json!({ "query": "rust" }));
    let mut message = Message::assistant_tool_calls("Looking it up.", vec![call]);
    message.timestamp = None;

    let wire = serde_json::to_value(&message).unwrap();
    assert_eq!(
        wire,
        json!({
            "role": "assistant",
            "content": [{ "type": "text", "text": "Looking it up." }],
            "tool_calls": [{
                "id": "call_1",
                "name": "web_search",
                "arguments": { "query": "rust" }
            }]
        })
    );
}

#[test]
fn stored_message_without_optional_fields_loads() {
    let message: Message = serde_json::from_value(json!({
        "role": "tool",
        "content": [{ "type": "text", "text": "42" }],
        "tool_call_id": "call_9"
    }))
    .unwrap();

    assert_eq!(message.role, Role::Tool);
    assert_eq!(message.tool_call_id.as_deref(), Some("call_9"));
    assert!(message.tool_calls.is_empty());
    assert!(message.timestamp.is_none());
}

#[test]
fn role_parses_from_lowercase() {
    assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
    assert_eq!(Role::Tool.to_string(), "tool");
}

#[test]
fn identity_serializes_as_plain_string() {
    let user = UserIdentity::new("ada@example.com").unwrap();
    assert_eq!(serde_json::to_value(&user).unwrap(), json!("ada@example.com"));

    let blank = serde_json::from_value::<UserIdentity>(json!("  "));
    assert!(blank.is_err());
}

#[test]
fn tool_result_error_kinds_render_snake_case() {
    assert_eq!(ToolErrorKind::CredentialUnavailable.to_string(), "credential_unavailable");
    let result = ToolResult::error("call_1", ToolErrorKind::Timeout, "too slow");
    assert!(result.is_error());
    assert!(!ToolResult::text("call_1", "fine").is_error());
}

#[test]
fn reply_content_normalizes_mixed_fragments() {
    let content = ReplyContent::from_json(&json!([
        "It is ",
        { "type": "text", "text": "sunny" },
        { "type": "thought_signature", "signature": "abc" },
        { "text": " today." }
    ]));
    assert_eq!(content.normalize(), "It is sunny today.");

    let plain = ReplyContent::from_json(&json!("Plain answer"));
    assert_eq!(plain.normalize(), "Plain answer");
}
