//! Forwarding Relay
//!
//! Addressable message sink that re-sends every envelope to a fixed target
//! address, preserving the original sender as the return address. The
//! target's reply path is transparent to the original caller. Used to
//! intercept or proxy traffic between cluster roles.
//!
//! With an expected session id configured, envelopes tagged with a
//! different session are dropped instead of forwarded, matching the
//! cluster's at-most-one-active-leader discipline. Untagged envelopes are
//! always forwarded.

use async_trait::async_trait;
use rill_substrate::{ActorAddr, ActorBehavior, ActorContext, Envelope, SessionId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Relay behavior. Single "relaying" state, no transitions; lives until
/// the substrate destroys the actor.
pub struct ForwardingRelay {
    target: ActorAddr,
    expected_session: Option<SessionId>,
    forwarded: Arc<AtomicU64>,
}

impl ForwardingRelay {
    /// Relay everything to `target`, no session fencing.
    pub fn new(target: ActorAddr) -> Self {
        Self {
            target,
            expected_session: None,
            forwarded: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Relay to `target`, dropping envelopes tagged with any session other
    /// than `expected`.
    pub fn fencing(target: ActorAddr, expected: SessionId) -> Self {
        Self {
            expected_session: Some(expected),
            ..Self::new(target)
        }
    }

    /// Counter of forwarded envelopes; clone the handle before handing the
    /// relay to the substrate.
    pub fn forwarded_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.forwarded)
    }
}

#[async_trait]
impl ActorBehavior for ForwardingRelay {
    async fn handle(&mut self, envelope: Envelope, ctx: &ActorContext) -> anyhow::Result<()> {
        if let (Some(expected), Some(tagged)) = (self.expected_session, envelope.session) {
            if tagged != expected {
                debug!(
                    relay = %ctx.addr,
                    stale = %tagged,
                    expected = %expected,
                    "dropping stale-session envelope"
                );
                return Ok(());
            }
        }

        // Forward unchanged: sender and reply slot stay with the envelope,
        // so replies from the target bypass the relay entirely.
        ctx.substrate.tell(&self.target, envelope).await?;
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
