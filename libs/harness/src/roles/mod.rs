//! Default role-actor behaviors for harness-built miniature clusters.
//!
//! These are deliberately thin: they exercise the real registration and
//! messaging code paths of each role while leaving job planning, task
//! execution, and resource allocation to the engine proper.

pub mod archivist;
pub mod coordinator;
pub mod messages;
pub mod resource;
pub mod worker;

pub use archivist::Archivist;
pub use coordinator::{Coordinator, CoordinatorSeed};
pub use messages::{
    ArchiveJob, ArchivedJobs, ControllerStatus, GetArchivedJobs, GetControllerStatus,
    GetRegisteredWorkers, Job, JobReply, JobResult, NotifyWhenRegistered,
    RegisterResourceController, RegisterWorker, RegisteredWorkers, RegistrationAck,
    RegistrationDeclined, RegistrationStatus, SubmitJob,
};
pub use resource::ResourceController;
pub use worker::Worker;
