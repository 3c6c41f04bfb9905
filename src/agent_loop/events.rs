//! Turn event stream types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::TurnId;
use crate::types::{ToolCallRequest, ToolResult, UserIdentity};

/// Callback used for streaming turn events.
pub type TurnEventSink = Arc<dyn Fn(TurnEvent) + Send + Sync>;

/// Turn lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TurnLifecycle {
    Started,
    Completed,
    Failed { error: String },
    Cancelled,
}

/// Concrete event payloads emitted by the loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEventPayload {
    Lifecycle { state: TurnLifecycle },
    ReasoningStarted { round: u32 },
    ToolCallStarted { call: ToolCallRequest },
    ToolResult { result: ToolResult },
    FinalAnswer { text: String, capped: bool },
}

/// Envelope for turn events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEvent {
    pub turn_id: TurnId,
    pub user: UserIdentity,
    /// Per-turn sequence number starting at 1.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: TurnEventPayload,
}

pub(crate) struct TurnEventEmitter {
    turn_id: TurnId,
    user: UserIdentity,
    seq: AtomicU64,
    sink: Option<TurnEventSink>,
}

impl TurnEventEmitter {
    pub(crate) fn new(turn_id: TurnId, user: UserIdentity, sink: Option<TurnEventSink>) -> Self {
        Self {
            turn_id,
            user,
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, payload: TurnEventPayload) {
        let Some(sink) = &self.sink else { return; };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(TurnEvent {
            turn_id: self.turn_id,
            user: self.user.clone(),
            seq,
            timestamp: Utc::now(),
            payload,
        });
    }

    pub(crate) fn lifecycle(&self, state: TurnLifecycle) {
        self.emit(TurnEventPayload::Lifecycle { state });
    }
}
