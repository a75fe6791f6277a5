//! # Rill Actor Messaging Substrate
//!
//! Substrate abstraction the Rill cluster harness is wired against: actor
//! creation, name addressing, fire-and-forget delivery, request-reply with
//! a bounded wait, and forceful termination. Ships an in-process
//! implementation ([`LocalSubstrate`]) built on tokio tasks and channels;
//! the production networked substrate lives outside this repository and
//! satisfies the same [`ActorSubstrate`] contract.

pub mod envelope;
pub mod registry;
pub mod system;

// Re-export commonly used types
pub use envelope::{Envelope, Payload, ReplySender, SessionId};
pub use registry::{ActorAddr, ActorRegistry};
pub use system::{
    ActorBehavior, ActorContext, ActorHandle, ActorId, ActorSubstrate, LocalSubstrate,
    SubstrateStats, SubstrateStatsSnapshot,
};

use std::time::Duration;

/// Substrate-level errors. These propagate to callers unchanged; the
/// substrate adds no retry layer.
#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    #[error("no actor registered under address: {0}")]
    ActorNotFound(String),

    #[error("mailbox closed for actor: {0}")]
    MailboxClosed(String),

    #[error("actor name already in use: {0}")]
    DuplicateName(String),

    #[error("ask timed out after {0:?}")]
    AskTimeout(Duration),

    #[error("asked actor dropped the reply slot")]
    ReplyDropped,

    #[error("reply payload had an unexpected type")]
    UnexpectedReply,
}

/// Result type for substrate operations.
pub type SubstrateResult<T> = std::result::Result<T, SubstrateError>;
