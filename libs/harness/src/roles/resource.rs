//! Resource controller role-actor.
//!
//! Registers with the coordinator under the fixed leader session, then
//! idles. The real resource-allocation protocol belongs to the engine;
//! the harness controller only exercises the registration path.

use crate::config::RoleConfig;
use crate::leader::{FixedLeaderBinding, LeaderDiscovery, COORDINATOR_ROLE};
use crate::roles::messages::{
    ControllerStatus, GetControllerStatus, RegisterResourceController, RegistrationAck,
    RegistrationDeclined,
};
use async_trait::async_trait;
use rill_substrate::{ActorBehavior, ActorContext, Envelope};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ResourceController {
    binding: Arc<FixedLeaderBinding>,
    config: RoleConfig,
    registered: bool,
}

impl ResourceController {
    pub fn new(config: RoleConfig, binding: Arc<FixedLeaderBinding>) -> Self {
        Self {
            binding,
            config,
            registered: false,
        }
    }
}

#[async_trait]
impl ActorBehavior for ResourceController {
    async fn on_start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        let coordinator = self
            .binding
            .resolve(COORDINATOR_ROLE)
            .ok_or_else(|| anyhow::anyhow!("leader binding did not resolve the coordinator"))?;
        let session = self.binding.session_id();

        info!(controller = %ctx.addr, coordinator = %coordinator, session = %session,
            memory_mb = self.config.memory_mb(),
            "resource controller starting, requesting registration");

        ctx.tell(
            &coordinator,
            Envelope::tell(RegisterResourceController {
                controller: ctx.addr.clone(),
                session,
            })
            .with_session(session),
        )
        .await?;
        Ok(())
    }

    async fn handle(&mut self, mut envelope: Envelope, ctx: &ActorContext) -> anyhow::Result<()> {
        if envelope.payload_is::<RegistrationAck>() {
            self.registered = true;
            info!(controller = %ctx.addr, "resource controller registered");
        } else if let Some(declined) = envelope.payload::<RegistrationDeclined>() {
            warn!(controller = %ctx.addr, reason = %declined.reason, "registration declined");
        } else if envelope.payload_is::<GetControllerStatus>() {
            envelope.respond(ControllerStatus {
                registered: self.registered,
            });
        } else {
            debug!(controller = %ctx.addr, ?envelope, "ignoring unknown message");
        }
        Ok(())
    }
}
