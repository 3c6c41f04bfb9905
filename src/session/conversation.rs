//! Per-user conversation log.

use crate::types::{Message, Role, UserIdentity};

/// A user's conversation: the fixed system preamble followed by an
/// append-only message log.
///
/// Tracks which suffix of the log has not yet been written to the session
/// store, so a turn can commit only at consistent points.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    owner: UserIdentity,
    messages: Vec<Message>,
    committed: usize,
}

impl ConversationSession {
    /// Start a new session whose first message is the system preamble.
    /// Nothing is committed yet.
    pub fn start(owner: UserIdentity, system_prompt: impl Into<String>) -> Self {
        Self {
            owner,
            messages: vec![Message::system(system_prompt)],
            committed: 0,
        }
    }

    /// Rebuild a session from persisted messages (all committed).
    pub fn restore(owner: UserIdentity, messages: Vec<Message>) -> Self {
        let committed = messages.len();
        Self {
            owner,
            messages,
            committed,
        }
    }

    pub fn owner(&self) -> &UserIdentity {
        &self.owner
    }

    /// The fixed preamble, when the log starts with a system message.
    pub fn system_prompt(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.role == Role::System)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Messages appended since the last commit.
    pub fn uncommitted(&self) -> &[Message] {
        &self.messages[self.committed..]
    }

    pub fn mark_committed(&mut self) {
        self.committed = self.messages.len();
    }

    /// Get the last N messages.
    pub fn last_n(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Check that every assistant message requesting N tools is immediately
/// followed by exactly N tool messages answering those requests in order.
///
/// Returns a description of the first violation.
pub fn check_tool_pairing(messages: &[Message]) -> Result<(), String> {
    let mut i = 0;
    while i < messages.len() {
        let message = &messages[i];
        if message.role == Role::Tool {
            return Err(format!("tool message at {i} does not follow a tool request"));
        }
        i += 1;
        if message.role != Role::Assistant || !message.has_tool_calls() {
            continue;
        }
        for call in &message.tool_calls {
            let Some(reply) = messages.get(i) else {
                return Err(format!("tool call '{}' has no result", call.id));
            };
            if reply.role != Role::Tool || reply.tool_call_id.as_deref() != Some(call.id.as_str()) {
                return Err(format!(
                    "expected result for tool call '{}' at {i}, found {} message",
                    call.id, reply.role
                ));
            }
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ToolCallRequest, ToolResult};

    fn alice() -> UserIdentity {
        UserIdentity::new("alice").unwrap()
    }

    #[test]
    fn commit_tracking() {
        let mut session = ConversationSession::start(alice(), "be helpful");
        session.append(Message::user("hi"));
        assert_eq!(session.uncommitted().len(), 2);

        session.mark_committed();
        session.append(Message::assistant("hello"));
        assert_eq!(session.uncommitted().len(), 1);

        session.mark_committed();
        assert_eq!(session.len(), 3);
        assert!(session.uncommitted().is_empty());
        assert_eq!(session.system_prompt().unwrap().text(), "be helpful");
    }

    #[test]
    fn pairing_accepts_matched_results_in_order() {
        let calls = vec![
            ToolCallRequest::new("a", "search", serde_json::json!({})),
            ToolCallRequest::new("b", "search", serde_json::json!({})),
        ];
        let log = vec![
            Message::user("q"),
            Message::assistant_tool_calls("", calls),
            Message::tool_result(&ToolResult::text("a", "1")),
            Message::tool_result(&ToolResult::text("b", "2")),
            Message::assistant("done"),
        ];
        assert!(check_tool_pairing(&log).is_ok());
    }

    #[test]
    fn pairing_rejects_out_of_order_or_missing_results() {
        let calls = vec![
            ToolCallRequest::new("a", "search", serde_json::json!({})),
            ToolCallRequest::new("b", "search", serde_json::json!({})),
        ];
        let swapped = vec![
            Message::assistant_tool_calls("", calls.clone()),
            Message::tool_result(&ToolResult::text("b", "2")),
            Message::tool_result(&ToolResult::text("a", "1")),
        ];
        let dangling = vec![
            Message::assistant_tool_calls("", calls),
            Message::tool_result(&ToolResult::text("a", "1")),
        ];

        assert!(check_tool_pairing(&swapped).is_err());
        assert!(check_tool_pairing(&dangling).is_err());
    }
}
