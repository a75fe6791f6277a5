//! Archival companion actor.
//!
//! Started alongside every coordinator; stores finished job results in
//! arrival order for later inspection.

use crate::roles::messages::{ArchiveJob, ArchivedJobs, GetArchivedJobs, JobResult};
use async_trait::async_trait;
use rill_substrate::{ActorBehavior, ActorContext, Envelope};
use tracing::{debug, info};

#[derive(Default)]
pub struct Archivist {
    archived: Vec<JobResult>,
}

impl Archivist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActorBehavior for Archivist {
    async fn handle(&mut self, mut envelope: Envelope, ctx: &ActorContext) -> anyhow::Result<()> {
        if let Some(msg) = envelope.payload::<ArchiveJob>() {
            info!(archivist = %ctx.addr, job = %msg.result.job_name, "archiving finished job");
            self.archived.push(msg.result.clone());
        } else if envelope.payload_is::<GetArchivedJobs>() {
            envelope.respond(ArchivedJobs {
                results: self.archived.clone(),
            });
        } else {
            debug!(archivist = %ctx.addr, ?envelope, "ignoring unknown message");
        }
        Ok(())
    }
}
