//! # Rill Cluster Test Harness
//!
//! Deterministic scheduling control and miniature-cluster assembly for
//! tests of the Rill compute cluster.
//!
//! Two pieces carry the weight:
//!
//! - The [`ControllableExecutionContext`] with its [`ActionQueue`]: a
//!   submission surface that either runs work immediately or buffers it
//!   for manual, turn-by-turn release, so a test picks the exact
//!   interleaving of deferred computations.
//! - The [`ClusterBootstrapper`]: stands up coordinator, worker, and
//!   resource-controller role-actors against a fixed leader binding:
//!   real registration and messaging paths, none of leader election's
//!   non-determinism, with blocking-with-timeout synchronization on
//!   worker registration and job completion.
//!
//! A [`ForwardingRelay`] can be dropped between roles to observe or
//! intercept traffic, and [`shared_runner`] provides the lazily-created
//! process-wide scheduled executor for tests that do not need manual
//! control. The actor substrate itself is an injected capability; see
//! `rill-substrate`.

pub mod action_queue;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod execution;
pub mod leader;
pub mod relay;
pub mod roles;
pub mod runner;

// Re-export commonly used types
pub use action_queue::{ActionQueue, ActionResult, DeferredAction};
pub use bootstrap::{
    ActorGateway, ClusterBootstrapper, CoordinatorFactory, MemberFactory, RoleSeed,
    REGISTRATION_TIMEOUT, SUBMISSION_TIMEOUT,
};
pub use config::RoleConfig;
pub use error::{HarnessError, HarnessResult};
pub use execution::{
    logging_failure_hook, ControllableExecutionContext, ExecutionContext, ExecutionMode,
    FailureHook, InlineExecutionContext, PeriodicAction,
};
pub use leader::{FixedLeaderBinding, LeaderDiscovery, COORDINATOR_ROLE};
pub use relay::ForwardingRelay;
pub use runner::{shared_runner, SharedRunner, SharedRunnerContext};

pub use rill_substrate::SessionId;
