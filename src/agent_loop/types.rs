//! Core turn types for the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Unique turn identifier.
pub type TurnId = Uuid;

/// Loop state. A turn starts in `Reasoning` and ends in `Idle`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TurnState {
    Idle,
    Reasoning,
    Executing,
}

/// Outcome of a completed turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnResult {
    pub turn_id: TurnId,
    /// The final answer, as persisted.
    pub answer: String,
    /// Executing phases run during the turn.
    pub round_trips: u32,
    /// Whether the answer was forced by the round-trip cap.
    pub capped: bool,
    pub finished_at: DateTime<Utc>,
}

impl TurnResult {
    pub(crate) fn new(turn_id: TurnId, answer: String, round_trips: u32, capped: bool) -> Self {
        Self {
            turn_id,
            answer,
            round_trips,
            capped,
            finished_at: Utc::now(),
        }
    }
}

/// Text of the synthetic answer produced when the round-trip cap is hit.
pub fn capped_answer(max_round_trips: u32) -> String {
    format!(
        "I stopped after {max_round_trips} rounds of tool calls without reaching an answer. \
         Please narrow the request or try again."
    )
}
