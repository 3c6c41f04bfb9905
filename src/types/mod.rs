//! Core types for planx.

pub mod identity;
pub mod message;

pub use identity::*;
pub use message::*;
