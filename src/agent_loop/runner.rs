//! The orchestration loop.

use std::sync::Arc;

use bon::bon;
use chrono::Local;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::events::{TurnEventEmitter, TurnEventPayload, TurnEventSink, TurnLifecycle};
use super::executor::ToolExecutor;
use super::types::{capped_answer, TurnId, TurnResult, TurnState};
use crate::auth::{
    ConnectionStatus, Credential, CredentialRefresher, CredentialResolver, CredentialService,
    CredentialStore,
};
use crate::config::PlanxConfig;
use crate::error::PlanxError;
use crate::reasoning::{ReasoningModel, ReasoningOutcome, ReasoningStep};
use crate::session::{ConversationSession, KeyedLocks, SessionStore};
use crate::tools::{ToolDescriptor, ToolRegistry};
use crate::types::{ContentPart, Message, ToolCallRequest, UserIdentity};

/// Runs turns: reasoning and tool execution alternate until the model
/// answers or the round-trip cap is hit.
///
/// Turns for the same user are serialized; turns for different users run
/// concurrently. Session writes happen only at consistent points, so a
/// failed or cancelled turn never leaves a tool request without its results.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use planx::prelude::*;
///
/// # async fn example(model: Arc<dyn ReasoningModel>) -> planx::error::Result<()> {
/// let orchestrator = Orchestrator::builder()
///     .model(model)
///     .sessions(Arc::new(InMemorySessionStore::new()))
///     .credentials(Arc::new(InMemoryCredentialStore::new()))
///     .build()?;
///
/// let user = UserIdentity::new("ada@example.com")?;
/// let result = orchestrator.turn(&user, "What's on my calendar today?").await?;
/// println!("{}", result.answer);
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    reasoning: ReasoningStep,
    executor: ToolExecutor,
    resolver: CredentialResolver,
    credentials: CredentialService,
    sessions: Arc<dyn SessionStore>,
    locks: KeyedLocks,
    config: PlanxConfig,
    event_sink: Option<TurnEventSink>,
}

#[bon]
impl Orchestrator {
    #[builder]
    pub fn new(
        model: Arc<dyn ReasoningModel>,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialStore>,
        refresher: Option<Arc<dyn CredentialRefresher>>,
        #[builder(default)] tools: ToolRegistry,
        #[builder(default)] config: PlanxConfig,
        event_sink: Option<TurnEventSink>,
    ) -> Result<Self, PlanxError> {
        config.validate()?;
        let resolver = CredentialResolver::new(credentials.clone(), refresher);
        let reasoning = ReasoningStep::new(model, config.reasoning_timeout)
            .with_retry(config.reasoning_retry());
        let executor = ToolExecutor::new(Arc::new(tools), resolver.clone(), config.tool_timeout);
        Ok(Self {
            reasoning,
            executor,
            resolver,
            credentials: CredentialService::new(credentials),
            sessions,
            locks: KeyedLocks::new(),
            config,
            event_sink,
        })
    }
}

impl Orchestrator {
    pub fn config(&self) -> &PlanxConfig {
        &self.config
    }

    /// Run one turn to completion.
    pub async fn turn(
        &self,
        user: &UserIdentity,
        text: impl Into<String>,
    ) -> Result<TurnResult, PlanxError> {
        self.turn_with_cancel(user, text, &CancellationToken::new())
            .await
    }

    /// Run one turn, stopping early when `cancel` fires.
    ///
    /// Cancellation is honoured before each reasoning call and while one is
    /// in flight. A tool execution phase always finishes and is committed
    /// first.
    pub async fn turn_with_cancel(
        &self,
        user: &UserIdentity,
        text: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<TurnResult, PlanxError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PlanxError::InvalidArgument(
                "user message must not be empty".into(),
            ));
        }

        let turn_id = Uuid::new_v4();
        let emitter = TurnEventEmitter::new(turn_id, user.clone(), self.event_sink.clone());

        let _guard = self.locks.acquire(&user.storage_key()).await;
        emitter.lifecycle(TurnLifecycle::Started);
        tracing::debug!(%turn_id, user = %user, "turn started");

        let result = self.run_turn(turn_id, user, text, cancel, &emitter).await;
        match &result {
            Ok(done) => {
                emitter.lifecycle(TurnLifecycle::Completed);
                tracing::info!(
                    %turn_id,
                    user = %user,
                    round_trips = done.round_trips,
                    capped = done.capped,
                    "turn completed"
                );
            }
            Err(PlanxError::Cancelled) => {
                emitter.lifecycle(TurnLifecycle::Cancelled);
                tracing::info!(%turn_id, user = %user, "turn cancelled");
            }
            Err(err) => {
                emitter.lifecycle(TurnLifecycle::Failed {
                    error: err.to_string(),
                });
                tracing::error!(%turn_id, user = %user, error = %err, "turn failed");
            }
        }
        result
    }

    async fn run_turn(
        &self,
        turn_id: TurnId,
        user: &UserIdentity,
        text: String,
        cancel: &CancellationToken,
        emitter: &TurnEventEmitter,
    ) -> Result<TurnResult, PlanxError> {
        let mut session = self.open_session(user).await?;
        session.append(Message::user(text));

        let mut state = TurnState::Reasoning;
        let mut pending: Vec<ToolCallRequest> = Vec::new();
        let mut round_trips = 0u32;
        let mut finish: Option<FinalReply> = None;

        loop {
            state = match state {
                TurnState::Reasoning => {
                    if cancel.is_cancelled() {
                        return Err(PlanxError::Cancelled);
                    }
                    let tools = self.available_tools(user).await?;
                    emitter.emit(TurnEventPayload::ReasoningStarted {
                        round: round_trips + 1,
                    });
                    tracing::debug!(
                        %turn_id,
                        round = round_trips + 1,
                        tools = tools.len(),
                        history = session.len(),
                        "reasoning"
                    );

                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(PlanxError::Cancelled),
                        outcome = self.reasoning.reason(session.messages(), &tools) => outcome,
                    }?;

                    match outcome {
                        ReasoningOutcome::FinalAnswer { text, content } => {
                            finish = Some(self.final_answer(text, content));
                            TurnState::Idle
                        }
                        ReasoningOutcome::ToolRequests { requests, .. }
                            if round_trips >= self.config.max_round_trips =>
                        {
                            tracing::warn!(
                                %turn_id,
                                user = %user,
                                round_trips,
                                dropped_requests = requests.len(),
                                "round-trip cap reached"
                            );
                            let answer = capped_answer(self.config.max_round_trips);
                            finish = Some(FinalReply {
                                content: vec![ContentPart::text(answer.clone())],
                                answer,
                                capped: true,
                            });
                            TurnState::Idle
                        }
                        ReasoningOutcome::ToolRequests {
                            content, requests, ..
                        } => {
                            session.append(Message::assistant_parts(content, requests.clone()));
                            pending = requests;
                            TurnState::Executing
                        }
                    }
                }
                TurnState::Executing => {
                    round_trips += 1;
                    for call in &pending {
                        emitter.emit(TurnEventPayload::ToolCallStarted { call: call.clone() });
                    }
                    let results = self.executor.execute(&pending, user).await?;
                    for result in results {
                        session.append(Message::tool_result(&result));
                        emitter.emit(TurnEventPayload::ToolResult { result });
                    }
                    pending.clear();
                    self.commit(&mut session).await?;
                    TurnState::Reasoning
                }
                TurnState::Idle => break,
            };
        }

        let FinalReply {
            answer,
            content,
            capped,
        } = finish.ok_or_else(|| {
            PlanxError::InvalidState("turn reached idle without an answer".into())
        })?;
        session.append(Message::assistant_parts(content, Vec::new()));
        self.commit(&mut session).await?;
        emitter.emit(TurnEventPayload::FinalAnswer {
            text: answer.clone(),
            capped,
        });
        Ok(TurnResult::new(turn_id, answer, round_trips, capped))
    }

    /// The persisted form of a final reply. A blank answer is replaced by
    /// the configured fallback; structured fragments are kept either way.
    fn final_answer(&self, text: String, mut content: Vec<ContentPart>) -> FinalReply {
        if !text.trim().is_empty() {
            return FinalReply {
                answer: text,
                content,
                capped: false,
            };
        }
        let answer = self.config.empty_answer_fallback.clone();
        content.retain(|part| !matches!(part, ContentPart::Text { .. }));
        content.push(ContentPart::text(answer.clone()));
        FinalReply {
            answer,
            content,
            capped: false,
        }
    }

    async fn open_session(&self, user: &UserIdentity) -> Result<ConversationSession, PlanxError> {
        let history = self.sessions.load(user).await?;
        if history.is_empty() {
            let preamble = self.config.render_system_prompt(Local::now().date_naive());
            tracing::debug!(user = %user, "creating session");
            Ok(ConversationSession::start(user.clone(), preamble))
        } else {
            Ok(ConversationSession::restore(user.clone(), history))
        }
    }

    async fn commit(&self, session: &mut ConversationSession) -> Result<(), PlanxError> {
        self.sessions
            .append(session.owner(), session.uncommitted())
            .await?;
        session.mark_committed();
        Ok(())
    }

    /// Tools the model may see for this user, filtered by granted scopes.
    pub async fn available_tools(
        &self,
        user: &UserIdentity,
    ) -> Result<Vec<ToolDescriptor>, PlanxError> {
        let granted = self.resolver.granted_scopes(user).await?;
        Ok(self.executor.registry().list_available(&granted))
    }

    /// The user's persisted conversation.
    pub async fn history(&self, user: &UserIdentity) -> Result<Vec<Message>, PlanxError> {
        Ok(self.sessions.load(user).await?)
    }

    /// Forget the user's conversation. The next turn starts a fresh session.
    pub async fn reset_session(&self, user: &UserIdentity) -> Result<(), PlanxError> {
        let _guard = self.locks.acquire(&user.storage_key()).await;
        self.sessions.clear(user).await?;
        tracing::info!(user = %user, "session reset");
        Ok(())
    }

    /// Record a credential produced by the authorization handshake.
    pub async fn on_credential_granted(
        &self,
        user: &UserIdentity,
        credential: Credential,
    ) -> Result<(), PlanxError> {
        self.credentials.grant(user, credential).await
    }

    pub async fn on_credential_revoked(&self, user: &UserIdentity) -> Result<(), PlanxError> {
        self.credentials.revoke(user).await
    }

    pub async fn credential_status(
        &self,
        user: &UserIdentity,
    ) -> Result<ConnectionStatus, PlanxError> {
        self.credentials.status(user).await
    }
}

/// How a turn ends: the user-visible answer and the assistant content to persist.
struct FinalReply {
    answer: String,
    content: Vec<ContentPart>,
    capped: bool,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("reasoning", &self.reasoning)
            .field("tools", self.executor.registry())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
