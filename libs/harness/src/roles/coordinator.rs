//! Coordinator role-actor.
//!
//! Owns the registered-worker and resource-controller sets, runs submitted
//! jobs on its execution context, and forwards finished jobs to the
//! archival companion. Registrations are session-fenced: a request
//! claiming any session other than the coordinator's own is declined.

use crate::config::RoleConfig;
use crate::execution::ExecutionContext;
use crate::roles::messages::{
    ArchiveJob, GetRegisteredWorkers, JobReply, JobResult, RegisterResourceController,
    RegisterWorker, RegisteredWorkers, RegistrationAck, RegistrationDeclined, SubmitJob,
};
use crate::DeferredAction;
use async_trait::async_trait;
use rill_substrate::{ActorAddr, ActorBehavior, ActorContext, Envelope, SessionId};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Everything a coordinator needs at construction time.
pub struct CoordinatorSeed {
    pub session: SessionId,
    pub config: RoleConfig,
    pub executor: Arc<dyn ExecutionContext>,
    pub archivist: Option<ActorAddr>,
}

pub struct Coordinator {
    session: SessionId,
    config: RoleConfig,
    executor: Arc<dyn ExecutionContext>,
    archivist: Option<ActorAddr>,
    workers: Vec<ActorAddr>,
    controllers: Vec<ActorAddr>,
}

impl Coordinator {
    pub fn new(seed: CoordinatorSeed) -> Self {
        Self {
            session: seed.session,
            config: seed.config,
            executor: seed.executor,
            archivist: seed.archivist,
            workers: Vec::new(),
            controllers: Vec::new(),
        }
    }

    fn fence(&self, claimed: SessionId) -> Result<(), RegistrationDeclined> {
        if claimed == self.session {
            Ok(())
        } else {
            Err(RegistrationDeclined {
                reason: format!("stale leader session {claimed}, active is {}", self.session),
            })
        }
    }

    async fn handle_register_worker(
        &mut self,
        msg: &RegisterWorker,
        ctx: &ActorContext,
    ) -> anyhow::Result<()> {
        if let Err(declined) = self.fence(msg.session) {
            warn!(coordinator = %ctx.addr, worker = %msg.worker, reason = %declined.reason,
                "declining worker registration");
            ctx.tell(&msg.worker, Envelope::tell(declined)).await?;
            return Ok(());
        }

        if !self.workers.contains(&msg.worker) {
            self.workers.push(msg.worker.clone());
        }
        info!(coordinator = %ctx.addr, worker = %msg.worker, task_slots = msg.task_slots,
            registered = self.workers.len(), "worker registered");

        ctx.tell(
            &msg.worker,
            Envelope::tell(RegistrationAck {
                coordinator: ctx.addr.clone(),
            })
            .with_session(self.session),
        )
        .await?;
        Ok(())
    }

    async fn handle_register_controller(
        &mut self,
        msg: &RegisterResourceController,
        ctx: &ActorContext,
    ) -> anyhow::Result<()> {
        if let Err(declined) = self.fence(msg.session) {
            warn!(coordinator = %ctx.addr, controller = %msg.controller,
                reason = %declined.reason, "declining resource controller registration");
            ctx.tell(&msg.controller, Envelope::tell(declined)).await?;
            return Ok(());
        }

        if !self.controllers.contains(&msg.controller) {
            self.controllers.push(msg.controller.clone());
        }
        info!(coordinator = %ctx.addr, controller = %msg.controller,
            "resource controller registered");

        ctx.tell(
            &msg.controller,
            Envelope::tell(RegistrationAck {
                coordinator: ctx.addr.clone(),
            })
            .with_session(self.session),
        )
        .await?;
        Ok(())
    }

    /// Run the job body on the execution context. The reply slot travels
    /// into the deferred work, so with a manual context the submitter sees
    /// nothing until the test triggers the queued action. Finished jobs
    /// reach the archivist through a completion bridge task.
    fn handle_submit_job(&self, envelope: &mut Envelope, job: &SubmitJob, ctx: &ActorContext) {
        let reply = envelope.take_reply();
        debug!(job = job.job.name(), memory_mb = job.config.memory_mb(),
            "job submission accepted");
        let job = job.job.clone();
        let job_name = job.name().to_string();
        let (done_tx, done_rx) = oneshot::channel::<JobResult>();

        if let Some(archivist) = self.archivist.clone() {
            let substrate = Arc::clone(&ctx.substrate);
            let coordinator = ctx.addr.clone();
            tokio::spawn(async move {
                if let Ok(result) = done_rx.await {
                    if let Err(e) = substrate
                        .tell(
                            &archivist,
                            Envelope::tell(ArchiveJob { result }).with_sender(coordinator),
                        )
                        .await
                    {
                        warn!(error = %e, "failed to archive finished job");
                    }
                }
            });
        }

        let submitted = self.executor.submit(DeferredAction::new(move || {
            let result = match job.run() {
                Ok(output) => {
                    let result = JobResult {
                        job_name: job.name().to_string(),
                        output,
                    };
                    let _ = done_tx.send(result.clone());
                    Ok(result)
                }
                Err(e) => Err(e.to_string()),
            };
            if let Some(tx) = reply {
                let _ = tx.send(Arc::new(JobReply { result }));
            }
            Ok(())
        }));

        match submitted {
            Ok(()) => debug!(job = %job_name, "job handed to execution context"),
            Err(e) => warn!(job = %job_name, error = %e, "execution context rejected job"),
        }
    }
}

#[async_trait]
impl ActorBehavior for Coordinator {
    async fn handle(&mut self, mut envelope: Envelope, ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(msg) = envelope.payload::<RegisterWorker>() {
            self.handle_register_worker(&msg, ctx).await?;
        } else if let Some(msg) = envelope.payload::<RegisterResourceController>() {
            self.handle_register_controller(&msg, ctx).await?;
        } else if let Some(msg) = envelope.payload::<SubmitJob>() {
            self.handle_submit_job(&mut envelope, &msg, ctx);
        } else if envelope.payload_is::<GetRegisteredWorkers>() {
            envelope.respond(RegisteredWorkers {
                workers: self.workers.clone(),
            });
        } else {
            debug!(coordinator = %ctx.addr, ?envelope, "ignoring unknown message");
        }
        Ok(())
    }

    async fn on_start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        info!(coordinator = %ctx.addr, session = %self.session,
            memory_mb = self.config.memory_mb(), "coordinator started");
        Ok(())
    }
}
