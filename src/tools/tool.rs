//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::types::{ToolDescriptor, ToolParameters};
use crate::auth::{Credential, Scope};
use crate::error::PlanxError;
use crate::types::UserIdentity;

/// Context handed to a tool for a single invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The user whose turn requested the call.
    pub user: UserIdentity,
    /// The user's credential, resolved for this invocation only.
    pub credential: Option<Credential>,
    pub tool_call_id: String,
}

impl ToolContext {
    pub fn new(user: UserIdentity, tool_call_id: impl Into<String>) -> Self {
        Self {
            user,
            credential: None,
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    /// The access token, or `CredentialUnavailable` when none was resolved.
    pub fn access_token(&self) -> Result<&str, PlanxError> {
        self.credential
            .as_ref()
            .map(|c| c.access_token.as_str())
            .ok_or_else(|| {
                PlanxError::CredentialUnavailable(format!("no credential for {}", self.user))
            })
    }
}

/// A capability the reasoning model may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ToolParameters;

    /// Scope the user must have granted; `None` for tools that need no
    /// external account.
    fn required_scope(&self) -> Option<&Scope> {
        None
    }

    /// Run the tool with validated arguments.
    async fn invoke(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, PlanxError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
            required_scope: self.required_scope().cloned(),
        }
    }
}

type ToolHandler = dyn Fn(
        ToolArguments,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, PlanxError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    scope: Option<Scope>,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, PlanxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            scope: None,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    /// Hide the tool from users who have not granted `scope`.
    pub fn with_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn required_scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    async fn invoke(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, PlanxError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("scope", &self.scope)
            .finish()
    }
}
