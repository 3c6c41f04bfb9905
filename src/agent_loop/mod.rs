//! Agent loop: the reasoning/tool-execution state machine.

pub mod events;
pub mod executor;
pub mod runner;
pub mod types;

pub use events::{TurnEvent, TurnEventPayload, TurnEventSink, TurnLifecycle};
pub use executor::ToolExecutor;
pub use runner::Orchestrator;
pub use types::{capped_answer, TurnId, TurnResult, TurnState};
