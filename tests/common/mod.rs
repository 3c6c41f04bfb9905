//! Shared test helpers: a scripted reasoning model and stock tools.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use planx::agent_loop::Orchestrator;
use planx::auth::{InMemoryCredentialStore, Scope};
use planx::config::PlanxConfig;
use planx::error::PlanxError;
use planx::reasoning::{ModelReply, ReasoningModel, ReasoningRequest};
use planx::session::{InMemorySessionStore, SessionStore};
use planx::tools::{AgentTool, ToolParameters, ToolRegistry};
use planx::types::{Message, ToolCallRequest, UserIdentity};

/// What the model saw on one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

enum Step {
    Reply(ModelReply),
    Fail(String),
    Delayed(Duration, ModelReply),
}

/// A reasoning model that plays back queued replies and records every call.
///
/// When the queue is empty it repeats the fallback reply, or answers "ok".
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Step>>,
    fallback: Mutex<Option<ModelReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, text: &str) -> Self {
        self.push(Step::Reply(ModelReply::text(text)))
    }

    pub fn tool_call(self, id: &str, name: &str, args: serde_json::Value) -> Self {
        self.tool_calls(vec![ToolCallRequest::new(id, name, args)])
    }

    pub fn tool_calls(self, calls: Vec<ToolCallRequest>) -> Self {
        self.push(Step::Reply(ModelReply::tool_calls(calls)))
    }

    /// Queue an arbitrary reply.
    pub fn reply(self, reply: ModelReply) -> Self {
        self.push(Step::Reply(reply))
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Step::Fail(message.to_string()))
    }

    pub fn delayed_answer(self, delay: Duration, text: &str) -> Self {
        self.push(Step::Delayed(delay, ModelReply::text(text)))
    }

    /// Request `name` on every call once the queue is drained.
    pub fn always_tool(self, name: &str, args: serde_json::Value) -> Self {
        *self.fallback.lock().unwrap() =
            Some(ModelReply::tool_calls(vec![ToolCallRequest::new("", name, args)]));
        self
    }

    fn push(self, step: Step) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReasoningModel for ScriptedModel {
    async fn complete(&self, request: &ReasoningRequest) -> Result<ModelReply, PlanxError> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: request.messages.clone(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
        });
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(message)) => Err(PlanxError::ReasoningUnavailable(message)),
            Some(Step::Delayed(delay, reply)) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            None => Ok(self
                .fallback
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| ModelReply::text("ok"))),
        }
    }
}

/// Counts invocations of the stock tools.
#[derive(Default)]
pub struct ToolCounters {
    pub search: AtomicUsize,
    pub mail: AtomicUsize,
}

impl ToolCounters {
    pub fn search_calls(&self) -> usize {
        self.search.load(Ordering::SeqCst)
    }

    pub fn mail_calls(&self) -> usize {
        self.mail.load(Ordering::SeqCst)
    }
}

/// `web_search` (no scope), `unread_mail` (mail scope), `flaky_api` (always fails).
pub fn stock_tools(counters: Arc<ToolCounters>) -> ToolRegistry {
    let search_counter = counters.clone();
    let search = AgentTool::new(
        "web_search",
        "Search the web for real-time information",
        ToolParameters::object()
            .string("query", "Search query", true)
            .build(),
        move |args, _ctx| {
            let counters = search_counter.clone();
            async move {
                counters.search.fetch_add(1, Ordering::SeqCst);
                Ok(json!(format!("3 results for {}", args.get_str("query")?)))
            }
        },
    );

    let mail_counter = counters;
    let mail = AgentTool::new(
        "unread_mail",
        "Count unread messages",
        ToolParameters::empty(),
        move |_args, ctx| {
            let counters = mail_counter.clone();
            async move {
                counters.mail.fetch_add(1, Ordering::SeqCst);
                let token = ctx.access_token()?;
                Ok(json!({ "unread": 4, "token": token }))
            }
        },
    )
    .with_scope(Scope::mail());

    let flaky = AgentTool::new("flaky_api", "Always fails", ToolParameters::empty(), |_, _| async {
        Err(PlanxError::tool("flaky_api", "upstream returned 503"))
    });

    ToolRegistry::new()
        .with_tool(search)
        .unwrap()
        .with_tool(mail)
        .unwrap()
        .with_tool(flaky)
        .unwrap()
}

/// An orchestrator over in-memory stores, plus handles to inspect them.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub model: Arc<ScriptedModel>,
    pub sessions: Arc<InMemorySessionStore>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub counters: Arc<ToolCounters>,
}

impl Harness {
    pub fn new(model: ScriptedModel) -> Self {
        Self::with_config(model, test_config())
    }

    pub fn with_config(model: ScriptedModel, config: PlanxConfig) -> Self {
        let model = Arc::new(model);
        let sessions = Arc::new(InMemorySessionStore::new());
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let counters = Arc::new(ToolCounters::default());
        let orchestrator = Orchestrator::builder()
            .model(model.clone())
            .sessions(sessions.clone())
            .credentials(credentials.clone())
            .tools(stock_tools(counters.clone()))
            .config(config)
            .build()
            .expect("valid orchestrator");
        Self {
            orchestrator,
            model,
            sessions,
            credentials,
            counters,
        }
    }

    pub async fn history(&self, user: &UserIdentity) -> Vec<Message> {
        self.sessions.load(user).await.expect("session load")
    }
}

/// Fast timeouts, no retry backoff surprises.
pub fn test_config() -> PlanxConfig {
    PlanxConfig {
        reasoning_timeout: Duration::from_secs(5),
        tool_timeout: Duration::from_secs(2),
        reasoning_attempts: 1,
        data_dir: std::env::temp_dir().join("planx-tests"),
        ..PlanxConfig::default()
    }
}

pub fn user(name: &str) -> UserIdentity {
    UserIdentity::new(format!("{name}@example.com")).expect("valid identity")
}
