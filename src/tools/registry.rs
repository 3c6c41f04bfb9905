//! The catalog of tools available to the reasoning model.

use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolContext};
use super::types::ToolDescriptor;
use super::validation::{normalize_arguments, validate_arguments};
use crate::auth::Scope;
use crate::error::PlanxError;
use crate::types::{ToolCallRequest, ToolErrorKind, ToolResult};
use crate::util::with_timeout;

/// Registered tools, in registration order.
///
/// The registry never fails an invocation: every outcome, including panics
/// and timeouts, becomes a [`ToolResult`] for the model to read.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names are unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), PlanxError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(PlanxError::Configuration("tool name must not be empty".into()));
        }
        if self.index.contains_key(&name) {
            return Err(PlanxError::Configuration(format!(
                "tool '{name}' is already registered"
            )));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Result<Self, PlanxError> {
        self.register(Arc::new(tool))?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Every registered tool.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor()).collect()
    }

    /// Tools usable with the given granted scopes. Scope-free tools are
    /// always listed.
    pub fn list_available(&self, granted: &BTreeSet<Scope>) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .filter(|tool| tool.required_scope().map_or(true, |s| granted.contains(s)))
            .map(|tool| tool.descriptor())
            .collect()
    }

    /// Invoke one requested tool and turn the outcome into a result.
    pub async fn invoke(
        &self,
        call: &ToolCallRequest,
        ctx: &ToolContext,
        timeout: Duration,
    ) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            tracing::warn!(tool = %call.name, tool_call_id = %call.id, "model requested unknown tool");
            return ToolResult::error(
                &call.id,
                ToolErrorKind::UnknownTool,
                format!("no tool named '{}'", call.name),
            );
        };

        if let Some(scope) = tool.required_scope() {
            let granted = ctx
                .credential
                .as_ref()
                .is_some_and(|credential| credential.has_scope(scope));
            if !granted {
                return ToolResult::error(
                    &call.id,
                    ToolErrorKind::CredentialUnavailable,
                    format!("'{}' requires access to {scope}; ask the user to connect their account", call.name),
                );
            }
        }

        let args = match normalize_arguments(&call.arguments)
            .and_then(|args| validate_arguments(&args, &tool.parameters().schema).map(|()| args))
        {
            Ok(args) => ToolArguments::new(args),
            Err(message) => {
                tracing::debug!(tool = %call.name, tool_call_id = %call.id, %message, "invalid tool arguments");
                return ToolResult::error(&call.id, ToolErrorKind::InvalidArguments, message);
            }
        };

        let invocation = AssertUnwindSafe(tool.invoke(&args, ctx)).catch_unwind();
        let outcome = with_timeout(timeout, async {
            invocation
                .await
                .map_err(|panic| PlanxError::tool(&call.name, panic_message(panic.as_ref())))
        })
        .await;

        match outcome {
            Ok(Ok(value)) => ToolResult::text(&call.id, render_output(value)),
            Ok(Err(err)) => {
                tracing::warn!(tool = %call.name, tool_call_id = %call.id, error = %err, "tool failed");
                ToolResult::error(&call.id, ToolErrorKind::InvocationFailed, err.to_string())
            }
            Err(PlanxError::Timeout(ms)) => {
                tracing::warn!(tool = %call.name, tool_call_id = %call.id, timeout_ms = ms, "tool timed out");
                ToolResult::error(
                    &call.id,
                    ToolErrorKind::Timeout,
                    format!("'{}' did not finish within {ms}ms", call.name),
                )
            }
            Err(err) => {
                tracing::error!(tool = %call.name, tool_call_id = %call.id, error = %err, "tool panicked");
                ToolResult::error(&call.id, ToolErrorKind::InvocationFailed, err.to_string())
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}

fn render_output(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("tool panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;
    use crate::tools::{AgentTool, ToolParameters};
    use crate::types::{ToolOutput, UserIdentity};
    use serde_json::json;

    fn echo() -> AgentTool {
        AgentTool::new(
            "echo",
            "Echo the text back",
            ToolParameters::object().string("text", "Text to echo", true).build(),
            |args, _ctx| async move { Ok(json!(args.get_str("text")?)) },
        )
    }

    fn ctx() -> ToolContext {
        ToolContext::new(UserIdentity::new("ada@example.com").unwrap(), "call_1")
    }

    fn error_kind(result: &ToolResult) -> ToolErrorKind {
        match &result.output {
            ToolOutput::Error(err) => err.kind,
            ToolOutput::Text(text) => panic!("expected error, got text {text}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let registry = ToolRegistry::new().with_tool(echo()).unwrap();
        let err = registry.with_tool(echo()).unwrap_err();
        assert!(matches!(err, PlanxError::Configuration(_)));
    }

    #[test]
    fn scoped_tools_are_hidden_without_grant() {
        let mail = AgentTool::new("list_mail", "List mail", ToolParameters::empty(), |_, _| async {
            Ok(json!([]))
        })
        .with_scope(Scope::mail());
        let registry = ToolRegistry::new()
            .with_tool(echo())
            .unwrap()
            .with_tool(mail)
            .unwrap();

        let names = |granted: &BTreeSet<Scope>| {
            registry
                .list_available(granted)
                .into_iter()
                .map(|d| d.name)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&BTreeSet::new()), vec!["echo"]);
        assert_eq!(
            names(&BTreeSet::from([Scope::mail()])),
            vec!["echo", "list_mail"]
        );
    }

    #[tokio::test]
    async fn string_output_is_used_verbatim() {
        let registry = ToolRegistry::new().with_tool(echo()).unwrap();
        let call = ToolCallRequest::new("call_1", "echo", json!({ "text": "hi" }));
        let result = registry.invoke(&call, &ctx(), Duration::from_secs(1)).await;
        assert_eq!(result, ToolResult::text("call_1", "hi"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let registry = ToolRegistry::new();
        let call = ToolCallRequest::new("call_1", "teleport", json!({}));
        let result = registry.invoke(&call, &ctx(), Duration::from_secs(1)).await;
        assert_eq!(error_kind(&result), ToolErrorKind::UnknownTool);
    }

    #[tokio::test]
    async fn invalid_arguments_are_reported() {
        let registry = ToolRegistry::new().with_tool(echo()).unwrap();
        let call = ToolCallRequest::new("call_1", "echo", json!({ "text": 7 }));
        let result = registry.invoke(&call, &ctx(), Duration::from_secs(1)).await;
        assert_eq!(error_kind(&result), ToolErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn scoped_tool_without_credential_is_reported() {
        let mail = AgentTool::new("list_mail", "List mail", ToolParameters::empty(), |_, _| async {
            Ok(json!([]))
        })
        .with_scope(Scope::mail());
        let registry = ToolRegistry::new().with_tool(mail).unwrap();
        let call = ToolCallRequest::new("call_1", "list_mail", json!({}));

        let result = registry.invoke(&call, &ctx(), Duration::from_secs(1)).await;
        assert_eq!(error_kind(&result), ToolErrorKind::CredentialUnavailable);

        let user = UserIdentity::new("ada@example.com").unwrap();
        let credential = Credential::new(user, "token").with_scopes([Scope::mail()]);
        let granted = ctx().with_credential(Some(credential));
        let result = registry.invoke(&call, &granted, Duration::from_secs(1)).await;
        assert_eq!(result, ToolResult::text("call_1", "[]"));
    }

    #[tokio::test]
    async fn panicking_tool_becomes_error_result() {
        let bomb = AgentTool::new("bomb", "Explodes", ToolParameters::empty(), |_, _| async {
            if true {
                panic!("boom");
            }
            Ok(json!(null))
        });
        let registry = ToolRegistry::new().with_tool(bomb).unwrap();
        let call = ToolCallRequest::new("call_1", "bomb", json!({}));
        let result = registry.invoke(&call, &ctx(), Duration::from_secs(1)).await;
        assert_eq!(error_kind(&result), ToolErrorKind::InvocationFailed);
        assert!(result.output.to_model_text().contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let slow = AgentTool::new("slow", "Sleeps", ToolParameters::empty(), |_, _| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!("done"))
        });
        let registry = ToolRegistry::new().with_tool(slow).unwrap();
        let call = ToolCallRequest::new("call_1", "slow", json!({}));
        let result = registry.invoke(&call, &ctx(), Duration::from_secs(5)).await;
        assert_eq!(error_kind(&result), ToolErrorKind::Timeout);
    }
}
