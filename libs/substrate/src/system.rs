//! Local Actor Substrate
//!
//! In-process implementation of the [`ActorSubstrate`] capability: one
//! unbounded tokio mailbox per actor, name-addressed delivery through the
//! [`ActorRegistry`], ask via one-shot reply slots with a bounded wait, and
//! forceful kill by task abort.
//!
//! The harness depends only on the [`ActorSubstrate`] trait; production
//! code wires the same bootstrap logic to a networked substrate.

use crate::envelope::{Envelope, Payload};
use crate::registry::{ActorAddr, ActorRegistry};
use crate::SubstrateError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Unique actor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0.simple())
    }
}

/// Handle to a reachable actor: identity plus logical address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorHandle {
    pub id: ActorId,
    pub addr: ActorAddr,
}

/// Context handed to a behavior on every callback. Carries the actor's own
/// address and the substrate it runs on, so behaviors stay substrate-agnostic.
#[derive(Clone)]
pub struct ActorContext {
    pub addr: ActorAddr,
    pub substrate: Arc<dyn ActorSubstrate>,
}

impl ActorContext {
    /// Send an envelope with this actor as the sender.
    pub async fn tell(&self, target: &ActorAddr, envelope: Envelope) -> Result<(), SubstrateError> {
        self.substrate
            .tell(target, envelope.with_sender(self.addr.clone()))
            .await
    }
}

impl fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext").field("addr", &self.addr).finish()
    }
}

/// Message-handling behavior of one actor.
///
/// Handler failures are reported and swallowed by the mailbox loop: a
/// failing message never kills the actor or the messages queued behind it.
#[async_trait]
pub trait ActorBehavior: Send + 'static {
    /// Handle one delivered envelope.
    async fn handle(&mut self, envelope: Envelope, ctx: &ActorContext) -> anyhow::Result<()>;

    /// Called once before the first message.
    async fn on_start(&mut self, _ctx: &ActorContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the mailbox closes. Not called on forceful kill.
    async fn on_stop(&mut self) {}
}

/// Actor creation, addressing, messaging, and termination primitives.
#[async_trait]
pub trait ActorSubstrate: Send + Sync + 'static {
    /// Start an actor under a unique logical name.
    async fn create(
        &self,
        behavior: Box<dyn ActorBehavior>,
        name: &str,
    ) -> Result<ActorHandle, SubstrateError>;

    /// Deliver an envelope, fire-and-forget.
    async fn tell(&self, target: &ActorAddr, envelope: Envelope) -> Result<(), SubstrateError>;

    /// Request-reply with a bounded wait. Timeout is a first-class outcome,
    /// surfaced as [`SubstrateError::AskTimeout`].
    async fn ask(
        &self,
        target: &ActorAddr,
        payload: Payload,
        timeout: Duration,
    ) -> Result<Payload, SubstrateError>;

    /// Forceful termination. Returns immediately without waiting for the
    /// actor to acknowledge or finish.
    async fn kill(&self, handle: &ActorHandle);

    /// Whether an address is currently reachable.
    async fn contains(&self, addr: &ActorAddr) -> bool;
}

/// Delivery counters, observation only.
#[derive(Debug, Default)]
pub struct SubstrateStats {
    pub actors_spawned: AtomicU64,
    pub actors_killed: AtomicU64,
    pub envelopes_delivered: AtomicU64,
    pub asks_issued: AtomicU64,
}

impl SubstrateStats {
    pub fn snapshot(&self) -> SubstrateStatsSnapshot {
        SubstrateStatsSnapshot {
            actors_spawned: self.actors_spawned.load(Ordering::Relaxed),
            actors_killed: self.actors_killed.load(Ordering::Relaxed),
            envelopes_delivered: self.envelopes_delivered.load(Ordering::Relaxed),
            asks_issued: self.asks_issued.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`SubstrateStats`].
#[derive(Debug, Clone, Copy)]
pub struct SubstrateStatsSnapshot {
    pub actors_spawned: u64,
    pub actors_killed: u64,
    pub envelopes_delivered: u64,
    pub asks_issued: u64,
}

/// In-process actor substrate backed by tokio tasks and channels.
#[derive(Clone)]
pub struct LocalSubstrate {
    registry: Arc<ActorRegistry>,
    tasks: Arc<Mutex<HashMap<ActorId, JoinHandle<()>>>>,
    stats: Arc<SubstrateStats>,
}

impl LocalSubstrate {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ActorRegistry::new()),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(SubstrateStats::default()),
        }
    }

    /// Delivery counters for test inspection.
    pub fn stats(&self) -> Arc<SubstrateStats> {
        Arc::clone(&self.stats)
    }

    /// All currently registered addresses.
    pub async fn list_actors(&self) -> Vec<ActorAddr> {
        self.registry.list().await
    }
}

impl Default for LocalSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalSubstrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSubstrate")
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[async_trait]
impl ActorSubstrate for LocalSubstrate {
    async fn create(
        &self,
        behavior: Box<dyn ActorBehavior>,
        name: &str,
    ) -> Result<ActorHandle, SubstrateError> {
        let addr = ActorAddr::new(name);
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        self.registry.register(addr.clone(), tx).await?;

        let id = ActorId::new();
        let ctx = ActorContext {
            addr: addr.clone(),
            substrate: Arc::new(self.clone()),
        };
        let registry = Arc::clone(&self.registry);
        let mut behavior = behavior;

        let task = tokio::spawn(async move {
            if let Err(e) = behavior.on_start(&ctx).await {
                error!(actor = %ctx.addr, error = %e, "actor failed during startup");
                registry.remove(&ctx.addr).await;
                return;
            }
            debug!(actor = %ctx.addr, "actor started");

            while let Some(envelope) = rx.recv().await {
                if let Err(e) = behavior.handle(envelope, &ctx).await {
                    error!(actor = %ctx.addr, error = %e, "actor message handling failed");
                }
            }

            behavior.on_stop().await;
            registry.remove(&ctx.addr).await;
            debug!(actor = %ctx.addr, "actor stopped");
        });

        self.tasks.lock().insert(id, task);
        self.stats.actors_spawned.fetch_add(1, Ordering::Relaxed);
        info!(actor = %addr, actor_id = %id, "actor created");

        Ok(ActorHandle { id, addr })
    }

    async fn tell(&self, target: &ActorAddr, envelope: Envelope) -> Result<(), SubstrateError> {
        let sender = self
            .registry
            .sender_for(target)
            .await
            .ok_or_else(|| SubstrateError::ActorNotFound(target.to_string()))?;

        sender
            .send(envelope)
            .map_err(|_| SubstrateError::MailboxClosed(target.to_string()))?;
        self.stats.envelopes_delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn ask(
        &self,
        target: &ActorAddr,
        payload: Payload,
        timeout: Duration,
    ) -> Result<Payload, SubstrateError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope::from_payload(payload).with_reply(reply_tx);

        self.tell(target, envelope).await?;
        self.stats.asks_issued.fetch_add(1, Ordering::Relaxed);

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(SubstrateError::ReplyDropped),
            Err(_) => Err(SubstrateError::AskTimeout(timeout)),
        }
    }

    async fn kill(&self, handle: &ActorHandle) {
        self.registry.remove(&handle.addr).await;
        if let Some(task) = self.tasks.lock().remove(&handle.id) {
            task.abort();
            self.stats.actors_killed.fetch_add(1, Ordering::Relaxed);
            info!(actor = %handle.addr, actor_id = %handle.id, "actor killed");
        }
    }

    async fn contains(&self, addr: &ActorAddr) -> bool {
        self.registry.contains(addr).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[derive(Debug, PartialEq)]
    struct Echo(String);

    /// Replies to every ask with its own payload.
    struct EchoActor;

    #[async_trait]
    impl ActorBehavior for EchoActor {
        async fn handle(&mut self, mut envelope: Envelope, _ctx: &ActorContext) -> anyhow::Result<()> {
            if let Some(msg) = envelope.payload::<Echo>() {
                envelope.respond(Echo(msg.0.clone()));
            }
            Ok(())
        }
    }

    /// Never replies; used to exercise ask timeouts.
    struct SilentActor;

    #[async_trait]
    impl ActorBehavior for SilentActor {
        async fn handle(&mut self, _envelope: Envelope, _ctx: &ActorContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_and_ask_roundtrip() {
        let substrate = LocalSubstrate::new();
        let handle = substrate.create(Box::new(EchoActor), "echo").await.unwrap();

        let reply = substrate
            .ask(
                &handle.addr,
                Arc::new(Echo("hello".into())),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        let echoed = reply.downcast::<Echo>().unwrap();
        assert_eq!(*echoed, Echo("hello".into()));
        assert_eq!(substrate.stats().snapshot().asks_issued, 1);
    }

    #[tokio::test]
    async fn test_ask_times_out_on_silent_actor() {
        let substrate = LocalSubstrate::new();
        let handle = substrate.create(Box::new(SilentActor), "silent").await.unwrap();

        let err = substrate
            .ask(
                &handle.addr,
                Arc::new(Echo("anyone there".into())),
                Duration::from_millis(20),
            )
            .await
            .unwrap_err();
        assert_matches!(err, SubstrateError::AskTimeout(_));
    }

    #[tokio::test]
    async fn test_tell_to_unknown_actor_fails() {
        let substrate = LocalSubstrate::new();
        let err = substrate
            .tell(&ActorAddr::new("ghost"), Envelope::tell(Echo("boo".into())))
            .await
            .unwrap_err();
        assert_matches!(err, SubstrateError::ActorNotFound(name) if name == "ghost");
    }

    #[tokio::test]
    async fn test_duplicate_actor_name_rejected() {
        let substrate = LocalSubstrate::new();
        substrate.create(Box::new(EchoActor), "echo").await.unwrap();
        let err = substrate.create(Box::new(EchoActor), "echo").await.unwrap_err();
        assert_matches!(err, SubstrateError::DuplicateName(_));
    }

    #[tokio::test]
    async fn test_kill_removes_actor_without_waiting() {
        let substrate = LocalSubstrate::new();
        let handle = substrate.create(Box::new(EchoActor), "victim").await.unwrap();
        assert!(substrate.contains(&handle.addr).await);

        substrate.kill(&handle).await;

        assert!(!substrate.contains(&handle.addr).await);
        let err = substrate
            .tell(&handle.addr, Envelope::tell(Echo("late".into())))
            .await
            .unwrap_err();
        assert_matches!(err, SubstrateError::ActorNotFound(_));
        assert_eq!(substrate.stats().snapshot().actors_killed, 1);
    }

    #[tokio::test]
    async fn test_kill_is_idempotent() {
        let substrate = LocalSubstrate::new();
        let handle = substrate.create(Box::new(EchoActor), "victim").await.unwrap();
        substrate.kill(&handle).await;
        substrate.kill(&handle).await;
        assert_eq!(substrate.stats().snapshot().actors_killed, 1);
    }
}
