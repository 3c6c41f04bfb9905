//! Convenience re-exports for common use.

pub use crate::agent_loop::{Orchestrator, TurnEvent, TurnEventPayload, TurnEventSink, TurnResult};
pub use crate::auth::{
    ConnectionStatus, Credential, CredentialRefresher, CredentialStore, FileCredentialStore,
    InMemoryCredentialStore, Scope,
};
pub use crate::config::PlanxConfig;
pub use crate::error::{PlanxError, Result};
pub use crate::reasoning::ReasoningModel;
pub use crate::session::{FileSessionStore, InMemorySessionStore, SessionStore};
pub use crate::tools::{AgentTool, Tool, ToolArguments, ToolContext, ToolParameters, ToolRegistry};
pub use crate::types::{ContentPart, Message, Role, ToolCallRequest, ToolResult, UserIdentity};
