//! Reasoning: the boundary to the language model.

pub mod content;
pub mod step;

pub use content::ReplyContent;
pub use step::{ModelReply, ReasoningModel, ReasoningOutcome, ReasoningRequest, ReasoningStep};
