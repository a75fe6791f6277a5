//! Cluster Bootstrapper
//!
//! Assembles a runnable miniature cluster: a coordinator bound to the
//! well-known fixed leader session, workers and resource controllers wired
//! to it through a [`FixedLeaderBinding`], and an archival companion next
//! to every coordinator. Substituting the fixed binding for real leader
//! election removes an entire class of test flakiness while the
//! registration and messaging paths of each role stay real.
//!
//! Role construction goes through factory capabilities: callers may swap
//! any default behavior for their own without touching the wiring.

use crate::config::{keys, RoleConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::execution::{ExecutionContext, InlineExecutionContext};
use crate::leader::{FixedLeaderBinding, LeaderDiscovery, COORDINATOR_ROLE};
use crate::roles::{
    Archivist, Coordinator, CoordinatorSeed, Job, JobReply, JobResult, NotifyWhenRegistered,
    ResourceController, SubmitJob, Worker,
};
use rill_substrate::{
    ActorBehavior, ActorHandle, ActorSubstrate, Payload, SessionId, SubstrateError,
};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Bound on the worker registration handshake.
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on job completion in [`ClusterBootstrapper::submit_and_await`].
/// Generous on purpose: a slow CI machine must not fail a passing job.
pub const SUBMISSION_TIMEOUT: Duration = Duration::from_secs(300);

/// A reachable role-actor plus the leader session it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorGateway {
    pub handle: ActorHandle,
    pub session: SessionId,
}

/// Construction inputs for worker and resource-controller factories.
pub struct RoleSeed {
    pub config: RoleConfig,
    pub binding: Arc<FixedLeaderBinding>,
}

/// Constructor capability for coordinator behaviors.
pub type CoordinatorFactory = Box<dyn FnOnce(CoordinatorSeed) -> Box<dyn ActorBehavior> + Send>;

/// Constructor capability for worker and resource-controller behaviors.
pub type MemberFactory = Box<dyn FnOnce(RoleSeed) -> Box<dyn ActorBehavior> + Send>;

/// Builds and wires miniature clusters on a substrate.
pub struct ClusterBootstrapper {
    substrate: Arc<dyn ActorSubstrate>,
    executor: Arc<dyn ExecutionContext>,
    registration_timeout: Duration,
    submission_timeout: Duration,
    seq: AtomicU64,
}

impl ClusterBootstrapper {
    pub fn new(substrate: Arc<dyn ActorSubstrate>) -> Self {
        Self {
            substrate,
            executor: Arc::new(InlineExecutionContext::new()),
            registration_timeout: REGISTRATION_TIMEOUT,
            submission_timeout: SUBMISSION_TIMEOUT,
            seq: AtomicU64::new(0),
        }
    }

    /// Back coordinator computations with the given execution context, e.g.
    /// a [`ControllableExecutionContext`](crate::ControllableExecutionContext)
    /// for deterministic job interleavings.
    pub fn with_executor(mut self, executor: Arc<dyn ExecutionContext>) -> Self {
        self.executor = executor;
        self
    }

    /// Shorten or lengthen the registration bound.
    pub fn with_registration_timeout(mut self, bound: Duration) -> Self {
        self.registration_timeout = bound;
        self
    }

    /// Shorten or lengthen the job completion bound.
    pub fn with_submission_timeout(mut self, bound: Duration) -> Self {
        self.submission_timeout = bound;
        self
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Start a coordinator with the default behavior.
    pub async fn start_coordinator(
        &self,
        config: RoleConfig,
        address_prefix: &str,
    ) -> HarnessResult<ActorGateway> {
        self.start_coordinator_with(
            config,
            address_prefix,
            Box::new(|seed| Box::new(Coordinator::new(seed)) as Box<dyn ActorBehavior>),
        )
        .await
    }

    /// Start a coordinator built by `factory`, bound to the well-known
    /// fixed leader session, with an archival companion alongside it.
    pub async fn start_coordinator_with(
        &self,
        config: RoleConfig,
        address_prefix: &str,
        factory: CoordinatorFactory,
    ) -> HarnessResult<ActorGateway> {
        let n = self.next_seq();
        let session = SessionId::fixed();
        let merged = config.merged_over(&RoleConfig::role_defaults());

        let archivist = self
            .substrate
            .create(
                Box::new(Archivist::new()),
                &format!("{address_prefix}-archivist-{n}"),
            )
            .await?;

        let behavior = factory(CoordinatorSeed {
            session,
            config: merged,
            executor: Arc::clone(&self.executor),
            archivist: Some(archivist.addr.clone()),
        });
        let handle = self
            .substrate
            .create(behavior, &format!("{address_prefix}-coordinator-{n}"))
            .await?;

        info!(coordinator = %handle.addr, archivist = %archivist.addr, session = %session,
            "coordinator started");
        Ok(ActorGateway { handle, session })
    }

    /// Start a worker with the default behavior.
    pub async fn start_worker(
        &self,
        coordinator: &ActorGateway,
        config: RoleConfig,
        use_local_transport: bool,
        wait_for_registration: bool,
    ) -> HarnessResult<ActorGateway> {
        self.start_worker_with(
            coordinator,
            config,
            use_local_transport,
            wait_for_registration,
            Box::new(|seed: RoleSeed| {
                Box::new(Worker::new(seed.config, seed.binding)) as Box<dyn ActorBehavior>
            }),
        )
        .await
    }

    /// Start a worker built by `factory` against `coordinator`. The worker
    /// discovers the coordinator through a [`FixedLeaderBinding`] that
    /// always resolves to the coordinator's address.
    ///
    /// With `wait_for_registration` the call returns only after the worker
    /// acknowledges a completed handshake; exceeding the bound fails the
    /// whole operation with [`HarnessError::RegistrationTimeout`] and the
    /// half-started worker is killed so no partial gateway escapes.
    pub async fn start_worker_with(
        &self,
        coordinator: &ActorGateway,
        config: RoleConfig,
        use_local_transport: bool,
        wait_for_registration: bool,
        factory: MemberFactory,
    ) -> HarnessResult<ActorGateway> {
        let merged = config
            .merged_over(&RoleConfig::worker_defaults())
            .with(keys::LOCAL_TRANSPORT, use_local_transport.to_string());
        let binding = Arc::new(FixedLeaderBinding::new(
            coordinator.handle.addr.clone(),
            coordinator.session,
        ));

        let behavior = factory(RoleSeed {
            config: merged,
            binding,
        });
        let name = format!("worker-{}", self.next_seq());
        let handle = self.substrate.create(behavior, &name).await?;

        if wait_for_registration {
            match self
                .substrate
                .ask(
                    &handle.addr,
                    Arc::new(NotifyWhenRegistered),
                    self.registration_timeout,
                )
                .await
            {
                Ok(reply) => {
                    expect_reply::<crate::roles::RegistrationStatus>(reply)?;
                }
                Err(SubstrateError::AskTimeout(bound)) => {
                    warn!(worker = %handle.addr, ?bound,
                        "worker registration timed out, killing half-started worker");
                    self.substrate.kill(&handle).await;
                    return Err(HarnessError::RegistrationTimeout(bound));
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(worker = %handle.addr, coordinator = %coordinator.handle.addr,
            waited = wait_for_registration, "worker started");
        Ok(ActorGateway {
            handle,
            session: coordinator.session,
        })
    }

    /// Start a resource controller with the default behavior, bound to the
    /// same fixed leader session as the coordinator.
    pub async fn start_resource_controller(
        &self,
        coordinator: &ActorGateway,
        config: RoleConfig,
    ) -> HarnessResult<ActorGateway> {
        self.start_resource_controller_with(
            coordinator,
            config,
            Box::new(|seed: RoleSeed| {
                Box::new(ResourceController::new(seed.config, seed.binding))
                    as Box<dyn ActorBehavior>
            }),
        )
        .await
    }

    /// Start a resource controller built by `factory`.
    pub async fn start_resource_controller_with(
        &self,
        coordinator: &ActorGateway,
        config: RoleConfig,
        factory: MemberFactory,
    ) -> HarnessResult<ActorGateway> {
        let merged = config.merged_over(&RoleConfig::role_defaults());
        let binding = Arc::new(FixedLeaderBinding::new(
            coordinator.handle.addr.clone(),
            coordinator.session,
        ));

        let behavior = factory(RoleSeed {
            config: merged,
            binding,
        });
        let name = format!("resource-controller-{}", self.next_seq());
        let handle = self.substrate.create(behavior, &name).await?;

        info!(controller = %handle.addr, coordinator = %coordinator.handle.addr,
            "resource controller started");
        Ok(ActorGateway {
            handle,
            session: coordinator.session,
        })
    }

    /// Submit a job through a fresh [`FixedLeaderBinding`] at the
    /// coordinator and await its outcome. Fails with the job's own failure,
    /// or [`HarnessError::SubmissionTimeout`] once the bound elapses.
    pub async fn submit_and_await(
        &self,
        coordinator: &ActorGateway,
        job: Job,
        config: RoleConfig,
    ) -> HarnessResult<JobResult> {
        let binding =
            FixedLeaderBinding::new(coordinator.handle.addr.clone(), coordinator.session);
        let target = binding
            .resolve(COORDINATOR_ROLE)
            .ok_or_else(|| SubstrateError::ActorNotFound(COORDINATOR_ROLE.into()))?;
        let merged = config.merged_over(&RoleConfig::role_defaults());

        info!(job = job.name(), coordinator = %target, "submitting job");
        match self
            .substrate
            .ask(
                &target,
                Arc::new(SubmitJob {
                    job,
                    config: merged,
                }),
                self.submission_timeout,
            )
            .await
        {
            Ok(reply) => {
                let reply = expect_reply::<JobReply>(reply)?;
                match &reply.result {
                    Ok(result) => Ok(result.clone()),
                    Err(failure) => Err(HarnessError::JobFailed(failure.clone())),
                }
            }
            Err(SubstrateError::AskTimeout(bound)) => Err(HarnessError::SubmissionTimeout(bound)),
            Err(e) => Err(e.into()),
        }
    }

    /// Forcefully terminate the actor behind `gateway` without waiting for
    /// shutdown completion. An absent gateway is a no-op.
    pub async fn terminate(&self, gateway: Option<&ActorGateway>) {
        if let Some(gateway) = gateway {
            info!(actor = %gateway.handle.addr, "terminating actor");
            self.substrate.kill(&gateway.handle).await;
        }
    }
}

fn expect_reply<T: Any + Send + Sync>(reply: Payload) -> HarnessResult<Arc<T>> {
    reply
        .downcast::<T>()
        .map_err(|_| SubstrateError::UnexpectedReply.into())
}
