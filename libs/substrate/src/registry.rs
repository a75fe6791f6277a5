//! Actor Registry
//!
//! Name-addressed actor discovery. Every actor registers its mailbox under
//! a unique logical address; senders resolve addresses at delivery time,
//! so a killed actor simply disappears from the registry.

use crate::envelope::Envelope;
use crate::SubstrateError;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Logical address of an actor, unique within one substrate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorAddr(String);

impl ActorAddr {
    /// Create an address from a logical name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the logical name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorAddr {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Mailbox handle stored per registered actor.
pub type MailboxSender = mpsc::UnboundedSender<Envelope>;

/// Registry mapping logical addresses to live mailboxes.
#[derive(Debug, Default)]
pub struct ActorRegistry {
    mailboxes: RwLock<HashMap<ActorAddr, MailboxSender>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mailbox under an address. Addresses are unique; a second
    /// registration under a live name is rejected.
    pub async fn register(
        &self,
        addr: ActorAddr,
        sender: MailboxSender,
    ) -> Result<(), SubstrateError> {
        let mut mailboxes = self.mailboxes.write().await;
        if mailboxes.contains_key(&addr) {
            return Err(SubstrateError::DuplicateName(addr.to_string()));
        }
        debug!(actor = %addr, "registering actor");
        mailboxes.insert(addr, sender);
        Ok(())
    }

    /// Remove an address. Missing entries are ignored: removal races with
    /// kill are benign.
    pub async fn remove(&self, addr: &ActorAddr) {
        if self.mailboxes.write().await.remove(addr).is_some() {
            debug!(actor = %addr, "unregistered actor");
        }
    }

    /// Resolve an address to its mailbox sender.
    pub async fn sender_for(&self, addr: &ActorAddr) -> Option<MailboxSender> {
        self.mailboxes.read().await.get(addr).cloned()
    }

    /// Check whether an address is currently registered.
    pub async fn contains(&self, addr: &ActorAddr) -> bool {
        self.mailboxes.read().await.contains_key(addr)
    }

    /// List all registered addresses.
    pub async fn list(&self) -> Vec<ActorAddr> {
        self.mailboxes.read().await.keys().cloned().collect()
    }
}
