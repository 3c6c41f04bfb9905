//! Error types for planx.

pub mod store;
pub mod unified;

pub use store::StoreError;
pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all planx operations.
///
/// Only infrastructure failures reach a turn's caller. Tool failures and
/// missing credentials are turned into conversational content instead.
#[derive(Error, Debug)]
pub enum PlanxError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Reasoning unavailable: {0}")]
    ReasoningUnavailable(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlanxError {
    /// Shorthand for a tool failure.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::ReasoningUnavailable(_) => ErrorCategory::Reasoning,
            Self::StoreUnavailable(_) => ErrorCategory::Store,
            Self::CredentialUnavailable(_) => ErrorCategory::Credential,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::InvalidArgument(_) | Self::InvalidState(_) | Self::Io(_) => {
                ErrorCategory::Unknown
            }
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Timeout
        )
    }

    /// Whether this error ends the current turn when it reaches the loop.
    pub fn is_turn_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Reasoning | ErrorCategory::Store | ErrorCategory::Cancelled
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Reasoning | ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Store => RecoverySuggestion::CheckStorage,
            ErrorCategory::Credential => RecoverySuggestion::Reauthorize,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            ErrorCategory::Cancelled => RecoverySuggestion::None,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PlanxError>;
