//! Message Envelope and Dynamic Payloads
//!
//! Messages travel through the substrate as `Arc<dyn Any + Send + Sync>`
//! payloads wrapped in an [`Envelope`] that carries routing metadata: the
//! sender address for reply paths, an optional leader-session tag for
//! epoch fencing, and an optional one-shot reply slot for the ask pattern.
//!
//! Payloads are shared by `Arc`, so same-process delivery never serializes.

use crate::registry::ActorAddr;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;
use uuid::Uuid;

/// Dynamic message payload shared across actors without serialization.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Reply slot for the ask pattern. Consumed by the first response.
pub type ReplySender = oneshot::Sender<Payload>;

/// Epoch token distinguishing the currently active leader instance from
/// superseded ones. Envelopes tagged with a stale session are fenced off
/// by session-aware receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The well-known fixed session id used when leader election is
    /// bypassed. Every harness-started role shares this epoch.
    pub fn fixed() -> Self {
        Self(Uuid::nil())
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0.simple())
    }
}

/// Routing wrapper around a dynamic payload.
///
/// An envelope is consumed on delivery. The reply slot, when present, is
/// taken by the receiving behavior via [`Envelope::respond`] or
/// [`Envelope::take_reply`]; forwarding the envelope unchanged keeps both
/// the original sender and the reply path intact.
pub struct Envelope {
    payload: Payload,
    /// Address of the originating actor, `None` for external callers.
    pub sender: Option<ActorAddr>,
    /// Leader-session tag for epoch fencing, `None` for untagged traffic.
    pub session: Option<SessionId>,
    reply: Option<ReplySender>,
}

impl Envelope {
    /// Wrap a typed message for fire-and-forget delivery.
    pub fn tell<T: Any + Send + Sync>(message: T) -> Self {
        Self::from_payload(Arc::new(message))
    }

    /// Wrap an already-shared payload.
    pub fn from_payload(payload: Payload) -> Self {
        Self {
            payload,
            sender: None,
            session: None,
            reply: None,
        }
    }

    /// Attach the originating actor address.
    pub fn with_sender(mut self, sender: ActorAddr) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Tag the envelope with a leader-session id.
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    /// Attach a reply slot, turning the envelope into an ask.
    pub fn with_reply(mut self, reply: ReplySender) -> Self {
        self.reply = Some(reply);
        self
    }

    /// Downcast the payload to a concrete message type. The payload is
    /// shared, so this clones the `Arc`, never the message.
    pub fn payload<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.payload).downcast::<T>().ok()
    }

    /// Check the payload type without downcasting.
    pub fn payload_is<T: Any + Send + Sync>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Get the raw payload.
    pub fn raw_payload(&self) -> Payload {
        Arc::clone(&self.payload)
    }

    /// Whether a reply slot is still attached.
    pub fn expects_reply(&self) -> bool {
        self.reply.is_some()
    }

    /// Send a response through the reply slot. Returns `false` when no
    /// slot is attached or the asker has gone away; a missing slot is
    /// logged since it usually means a tell was handled as an ask.
    pub fn respond<T: Any + Send + Sync>(&mut self, response: T) -> bool {
        match self.reply.take() {
            Some(tx) => tx.send(Arc::new(response)).is_ok(),
            None => {
                warn!(
                    response_type = std::any::type_name::<T>(),
                    "attempted to respond to an envelope without a reply slot"
                );
                false
            }
        }
    }

    /// Detach the reply slot for deferred responding, e.g. when the
    /// response is produced by work scheduled on an execution context.
    pub fn take_reply(&mut self) -> Option<ReplySender> {
        self.reply.take()
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("sender", &self.sender)
            .field("session", &self.session)
            .field("expects_reply", &self.reply.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    #[test]
    fn test_payload_downcast() {
        let env = Envelope::tell(Ping(7));
        assert!(env.payload_is::<Ping>());
        assert!(!env.payload_is::<String>());

        let ping = env.payload::<Ping>().unwrap();
        assert_eq!(*ping, Ping(7));
        assert!(env.payload::<String>().is_none());
    }

    #[test]
    fn test_sender_and_session_tags() {
        let addr = ActorAddr::new("worker-1");
        let session = SessionId::generate();
        let env = Envelope::tell(Ping(1))
            .with_sender(addr.clone())
            .with_session(session);

        assert_eq!(env.sender, Some(addr));
        assert_eq!(env.session, Some(session));
    }

    #[tokio::test]
    async fn test_respond_consumes_reply_slot() {
        let (tx, rx) = oneshot::channel();
        let mut env = Envelope::tell(Ping(3)).with_reply(tx);

        assert!(env.expects_reply());
        assert!(env.respond(Ping(4)));
        assert!(!env.expects_reply());
        // Second respond has no slot left.
        assert!(!env.respond(Ping(5)));

        let reply = rx.await.unwrap().downcast::<Ping>().unwrap();
        assert_eq!(*reply, Ping(4));
    }

    #[test]
    fn test_fixed_session_is_stable() {
        assert_eq!(SessionId::fixed(), SessionId::fixed());
        assert_ne!(SessionId::fixed(), SessionId::generate());
    }
}
