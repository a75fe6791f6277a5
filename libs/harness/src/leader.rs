//! Fixed Leader Binding
//!
//! Real leader election is asynchronous and non-deterministic, which is exactly
//! what a deterministic harness must avoid. The harness substitutes a
//! fixed binding that satisfies the same lookup contract as the real
//! discovery service: resolve a role name to an address, observe address
//! changes. The fixed variant always resolves to one preconfigured
//! address and never fires a change.

use rill_substrate::{ActorAddr, SessionId};
use tokio::sync::watch;

/// Logical role name of the coordinator in discovery lookups.
pub const COORDINATOR_ROLE: &str = "coordinator";

/// Leader lookup contract shared with the real discovery service.
pub trait LeaderDiscovery: Send + Sync {
    /// Resolve a role name to the current leader address.
    fn resolve(&self, role: &str) -> Option<ActorAddr>;

    /// Session epoch of the resolved leader.
    fn session_id(&self) -> SessionId;

    /// Observe leader address changes.
    fn changes(&self) -> watch::Receiver<ActorAddr>;
}

/// Fixed-address substitute for leader election. Immutable once
/// constructed; one binding per coordinator instance.
pub struct FixedLeaderBinding {
    addr: ActorAddr,
    session: SessionId,
    // Sender kept alive so subscribers never observe a change.
    changes_tx: watch::Sender<ActorAddr>,
}

impl std::fmt::Debug for FixedLeaderBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedLeaderBinding")
            .field("addr", &self.addr)
            .field("session", &self.session)
            .finish()
    }
}

impl FixedLeaderBinding {
    /// Bind every role lookup to `addr` under `session`.
    pub fn new(addr: ActorAddr, session: SessionId) -> Self {
        let (changes_tx, _) = watch::channel(addr.clone());
        Self {
            addr,
            session,
            changes_tx,
        }
    }

    /// The bound address.
    pub fn addr(&self) -> &ActorAddr {
        &self.addr
    }
}

impl LeaderDiscovery for FixedLeaderBinding {
    fn resolve(&self, _role: &str) -> Option<ActorAddr> {
        // Every role name resolves to the one preconfigured address.
        Some(self.addr.clone())
    }

    fn session_id(&self) -> SessionId {
        self.session
    }

    fn changes(&self) -> watch::Receiver<ActorAddr> {
        self.changes_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_any_role_to_bound_address() {
        let addr = ActorAddr::new("test-coordinator-0");
        let binding = FixedLeaderBinding::new(addr.clone(), SessionId::fixed());

        assert_eq!(binding.resolve(COORDINATOR_ROLE), Some(addr.clone()));
        assert_eq!(binding.resolve("anything-else"), Some(addr));
        assert_eq!(binding.session_id(), SessionId::fixed());
    }

    #[tokio::test]
    async fn test_change_notifications_never_fire() {
        let binding =
            FixedLeaderBinding::new(ActorAddr::new("test-coordinator-0"), SessionId::fixed());
        let mut changes = binding.changes();

        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            changes.changed(),
        )
        .await;
        assert!(waited.is_err(), "fixed binding must never notify");
    }
}
