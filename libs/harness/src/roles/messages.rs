//! Role-actor message types.
//!
//! Messages travel as dynamic payloads through the substrate; each type
//! here is one protocol step of the registration handshake, job
//! submission, or test inspection.

use rill_substrate::{ActorAddr, SessionId};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Opaque job description: a name plus an executable body. The engine that
/// would normally plan and run a job graph is out of scope; the harness
/// coordinator runs the body on its execution context.
#[derive(Clone)]
pub struct Job {
    name: String,
    body: Arc<dyn Fn() -> anyhow::Result<Value> + Send + Sync>,
}

impl Job {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the job body.
    pub fn run(&self) -> anyhow::Result<Value> {
        (self.body)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("name", &self.name).finish()
    }
}

/// Outcome of a successfully completed job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub job_name: String,
    pub output: Value,
}

/// Worker -> coordinator: registration request.
#[derive(Debug, Clone)]
pub struct RegisterWorker {
    pub worker: ActorAddr,
    pub session: SessionId,
    pub task_slots: usize,
}

/// Resource controller -> coordinator: registration request.
#[derive(Debug, Clone)]
pub struct RegisterResourceController {
    pub controller: ActorAddr,
    pub session: SessionId,
}

/// Coordinator -> registrant: handshake completed.
#[derive(Debug, Clone)]
pub struct RegistrationAck {
    pub coordinator: ActorAddr,
}

/// Coordinator -> registrant: handshake rejected.
#[derive(Debug, Clone)]
pub struct RegistrationDeclined {
    pub reason: String,
}

/// Ask to a worker: reply once registration has completed. The reply is
/// queued until the handshake finishes.
#[derive(Debug, Clone, Copy)]
pub struct NotifyWhenRegistered;

/// Reply to [`NotifyWhenRegistered`].
#[derive(Debug, Clone, Copy)]
pub struct RegistrationStatus {
    pub registered: bool,
}

/// Ask to the coordinator: run a job and reply with its outcome.
#[derive(Debug)]
pub struct SubmitJob {
    pub job: Job,
    pub config: crate::config::RoleConfig,
}

/// Reply to [`SubmitJob`].
#[derive(Debug, Clone)]
pub struct JobReply {
    pub result: Result<JobResult, String>,
}

/// Ask to the coordinator: current registered-worker set.
#[derive(Debug, Clone, Copy)]
pub struct GetRegisteredWorkers;

/// Reply to [`GetRegisteredWorkers`], in registration order.
#[derive(Debug, Clone)]
pub struct RegisteredWorkers {
    pub workers: Vec<ActorAddr>,
}

/// Coordinator -> archivist: record a finished job.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub result: JobResult,
}

/// Ask to the archivist: everything archived so far.
#[derive(Debug, Clone, Copy)]
pub struct GetArchivedJobs;

/// Reply to [`GetArchivedJobs`], in arrival order.
#[derive(Debug, Clone)]
pub struct ArchivedJobs {
    pub results: Vec<JobResult>,
}

/// Ask to a resource controller: registration state.
#[derive(Debug, Clone, Copy)]
pub struct GetControllerStatus;

/// Reply to [`GetControllerStatus`].
#[derive(Debug, Clone, Copy)]
pub struct ControllerStatus {
    pub registered: bool,
}
