//! Worker role-actor.
//!
//! On start the worker resolves the coordinator through its leader binding
//! and sends a one-shot registration request. `NotifyWhenRegistered` asks
//! are answered immediately once registered, or parked until the
//! acknowledgement arrives.

use crate::config::RoleConfig;
use crate::leader::{FixedLeaderBinding, LeaderDiscovery, COORDINATOR_ROLE};
use crate::roles::messages::{
    NotifyWhenRegistered, RegisterWorker, RegistrationAck, RegistrationDeclined,
    RegistrationStatus,
};
use async_trait::async_trait;
use rill_substrate::{ActorBehavior, ActorContext, Envelope, ReplySender};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Worker {
    binding: Arc<FixedLeaderBinding>,
    config: RoleConfig,
    registered: bool,
    pending_notify: Vec<ReplySender>,
}

impl Worker {
    pub fn new(config: RoleConfig, binding: Arc<FixedLeaderBinding>) -> Self {
        Self {
            binding,
            config,
            registered: false,
            pending_notify: Vec::new(),
        }
    }
}

#[async_trait]
impl ActorBehavior for Worker {
    async fn on_start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        let coordinator = self
            .binding
            .resolve(COORDINATOR_ROLE)
            .ok_or_else(|| anyhow::anyhow!("leader binding did not resolve the coordinator"))?;
        let session = self.binding.session_id();

        info!(worker = %ctx.addr, coordinator = %coordinator, session = %session,
            memory_mb = self.config.memory_mb(),
            local_transport = self.config.local_transport(),
            "worker starting, requesting registration");

        ctx.tell(
            &coordinator,
            Envelope::tell(RegisterWorker {
                worker: ctx.addr.clone(),
                session,
                task_slots: self.config.task_slots(),
            })
            .with_session(session),
        )
        .await?;
        Ok(())
    }

    async fn handle(&mut self, mut envelope: Envelope, ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(ack) = envelope.payload::<RegistrationAck>() {
            self.registered = true;
            info!(worker = %ctx.addr, coordinator = %ack.coordinator, "worker registered");
            for slot in self.pending_notify.drain(..) {
                let _ = slot.send(Arc::new(RegistrationStatus { registered: true }));
            }
        } else if let Some(declined) = envelope.payload::<RegistrationDeclined>() {
            warn!(worker = %ctx.addr, reason = %declined.reason, "registration declined");
        } else if envelope.payload_is::<NotifyWhenRegistered>() {
            if self.registered {
                envelope.respond(RegistrationStatus { registered: true });
            } else if let Some(slot) = envelope.take_reply() {
                self.pending_notify.push(slot);
            }
        } else {
            debug!(worker = %ctx.addr, ?envelope, "ignoring unknown message");
        }
        Ok(())
    }
}
