//! The Reasoning Step: one bounded, retried call to the model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::content::ReplyContent;
use crate::error::PlanxError;
use crate::tools::ToolDescriptor;
use crate::types::{ContentPart, Message, ToolCallRequest};
use crate::util::{with_timeout, RetryPolicy};

/// Everything the model sees on one call.
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    /// Full session history, system preamble first.
    pub messages: Vec<Message>,
    /// Tools visible to the user, in registration order.
    pub tools: Vec<ToolDescriptor>,
}

/// Raw reply from the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub content: ReplyContent,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelReply {
    pub fn text(content: impl Into<ReplyContent>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: ReplyContent::default(),
            tool_calls: calls,
        }
    }
}

/// The language model. Stateless between calls.
#[async_trait]
pub trait ReasoningModel: Send + Sync {
    async fn complete(&self, request: &ReasoningRequest) -> Result<ModelReply, PlanxError>;
}

/// What the loop does next.
///
/// `text` is the normalized reply; `content` is the reply as sent, opaque
/// fragments included, and is what gets persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningOutcome {
    FinalAnswer {
        text: String,
        content: Vec<ContentPart>,
    },
    ToolRequests {
        /// Possibly empty.
        text: String,
        content: Vec<ContentPart>,
        requests: Vec<ToolCallRequest>,
    },
}

impl ReasoningOutcome {
    /// The normalized reply text.
    pub fn text(&self) -> &str {
        match self {
            Self::FinalAnswer { text, .. } | Self::ToolRequests { text, .. } => text,
        }
    }
}

/// Calls the model under a deadline with retry of transient failures.
#[derive(Clone)]
pub struct ReasoningStep {
    model: Arc<dyn ReasoningModel>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ReasoningStep {
    pub fn new(model: Arc<dyn ReasoningModel>, timeout: Duration) -> Self {
        Self {
            model,
            timeout,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Ask the model for the next move given the whole history.
    ///
    /// Any failure, once retries are exhausted, is reported as
    /// [`PlanxError::ReasoningUnavailable`].
    pub async fn reason(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ReasoningOutcome, PlanxError> {
        let request = ReasoningRequest {
            messages: history.to_vec(),
            tools: tools.to_vec(),
        };

        let reply = self
            .retry
            .execute(|| with_timeout(self.timeout, self.model.complete(&request)))
            .await
            .map_err(|err| match err {
                PlanxError::ReasoningUnavailable(_) => err,
                other => PlanxError::ReasoningUnavailable(other.to_string()),
            })?;

        let text = reply.content.normalize();
        let content = reply.content.into_parts();
        if reply.tool_calls.is_empty() {
            return Ok(ReasoningOutcome::FinalAnswer { text, content });
        }

        let requests = reply
            .tool_calls
            .into_iter()
            .map(|mut call| {
                if call.id.trim().is_empty() {
                    call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
                }
                call
            })
            .collect();
        Ok(ReasoningOutcome::ToolRequests {
            text,
            content,
            requests,
        })
    }
}

impl std::fmt::Debug for ReasoningStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningStep")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}
