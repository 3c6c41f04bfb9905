//! The Tool Execution Step.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::CredentialResolver;
use crate::error::PlanxError;
use crate::tools::{ToolContext, ToolRegistry};
use crate::types::{ToolCallRequest, ToolResult, UserIdentity};

/// Runs a batch of tool requests for one user, sequentially and in order.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    resolver: CredentialResolver,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, resolver: CredentialResolver, timeout: Duration) -> Self {
        Self {
            registry,
            resolver,
            timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// One result per request, in request order, ids matched.
    ///
    /// Tool failures are encoded in the results. The only error is a
    /// credential store failure, which aborts the whole batch.
    pub async fn execute(
        &self,
        requests: &[ToolCallRequest],
        user: &UserIdentity,
    ) -> Result<Vec<ToolResult>, PlanxError> {
        let mut results = Vec::with_capacity(requests.len());
        for call in requests {
            results.push(self.execute_one(call, user).await?);
        }
        Ok(results)
    }

    /// Invoke one request, resolving the credential (refreshing if expired)
    /// when the tool needs one.
    pub async fn execute_one(
        &self,
        call: &ToolCallRequest,
        user: &UserIdentity,
    ) -> Result<ToolResult, PlanxError> {
        let needs_credential = self
            .registry
            .get(&call.name)
            .is_some_and(|tool| tool.required_scope().is_some());
        let credential = if needs_credential {
            self.resolver.resolve(user).await?
        } else {
            None
        };

        let ctx = ToolContext::new(user.clone(), &call.id).with_credential(credential);
        let result = self.registry.invoke(call, &ctx, self.timeout).await;
        tracing::debug!(
            user = %user,
            tool = %call.name,
            tool_call_id = %call.id,
            is_error = result.is_error(),
            "tool call finished"
        );
        Ok(result)
    }
}
