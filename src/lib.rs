//! planx: multi-tenant agent orchestration.
//!
//! Runs a reasoning/tool-execution loop per user turn. Each user has their
//! own persisted conversation and their own external-service credential;
//! tools that need a scope the user has not granted are hidden from the
//! model. Turns for one user are serialized, turns for different users run
//! in parallel.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use planx::prelude::*;
//! use planx::reasoning::{ModelReply, ReasoningRequest};
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl ReasoningModel for Echo {
//!     async fn complete(&self, request: &ReasoningRequest) -> planx::error::Result<ModelReply> {
//!         let last = request.messages.last().map(|m| m.text()).unwrap_or_default();
//!         Ok(ModelReply::text(format!("You said: {last}")))
//!     }
//! }
//!
//! # async fn example() -> planx::error::Result<()> {
//! let orchestrator = Orchestrator::builder()
//!     .model(Arc::new(Echo))
//!     .sessions(Arc::new(InMemorySessionStore::new()))
//!     .credentials(Arc::new(InMemoryCredentialStore::new()))
//!     .build()?;
//!
//! let user = UserIdentity::new("ada@example.com")?;
//! let result = orchestrator.turn(&user, "Hello!").await?;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod auth;
pub mod config;
pub mod error;
pub mod prelude;
pub mod reasoning;
pub mod session;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
