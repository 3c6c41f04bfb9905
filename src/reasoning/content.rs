//! Model reply content and its normalization to text.

use serde_json::Value;

use crate::types::{normalize_parts, ContentPart};

/// Content of a model reply: either one string or ordered fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for ReplyContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl ReplyContent {
    /// Interpret raw provider content.
    ///
    /// A string is one text fragment. In an array, strings and objects with a
    /// string `"text"` field are text fragments; anything else is kept as an
    /// opaque fragment tagged with its `"type"` (or `"unknown"`).
    pub fn from_json(raw: &Value) -> Self {
        match raw {
            Value::String(text) => Self::Text(text.clone()),
            Value::Null => Self::default(),
            Value::Array(items) => Self::Parts(items.iter().map(fragment).collect()),
            other => Self::Parts(vec![fragment(other)]),
        }
    }

    /// Concatenate every text fragment in order; opaque fragments are skipped.
    pub fn normalize(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => normalize_parts(parts),
        }
    }

    /// The content as message parts, opaque fragments included. Empty text
    /// yields no parts.
    pub fn into_parts(self) -> Vec<ContentPart> {
        match self {
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => vec![ContentPart::text(text)],
            Self::Parts(parts) => parts,
        }
    }
}

impl From<String> for ReplyContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ReplyContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

fn fragment(item: &Value) -> ContentPart {
    if let Some(text) = item.as_str() {
        return ContentPart::text(text);
    }
    if let Some(text) = item.get("text").and_then(Value::as_str) {
        return ContentPart::text(text);
    }
    let kind = item
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    ContentPart::opaque(kind, item.clone())
}
