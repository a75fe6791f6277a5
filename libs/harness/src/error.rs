//! Harness error taxonomy.
//!
//! Every failure is raised synchronously from the call that triggered it;
//! there is no asynchronous failure channel beside the bounded waits' own
//! timeout outcomes. Timeouts carry the elapsed bound and are never retried
//! here; retrying is the test's decision.

use rill_substrate::SubstrateError;
use std::time::Duration;

/// Errors raised by the harness core.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Pop or trigger on an empty action queue. A programming error in the
    /// test, not a condition to wait out.
    #[error("action queue is empty")]
    EmptyQueue,

    /// Timer-based scheduling requested on a deterministic context. Never
    /// silently degrades to real scheduling.
    #[error("unsupported operation on deterministic execution context: {0}")]
    UnsupportedOperation(&'static str),

    /// Worker registration acknowledgement did not arrive within the bound.
    #[error("worker registration timed out after {0:?}")]
    RegistrationTimeout(Duration),

    /// Job completion did not arrive within the bound.
    #[error("job submission timed out after {0:?}")]
    SubmissionTimeout(Duration),

    /// The submitted job itself reported a failure.
    #[error("job failed: {0}")]
    JobFailed(String),

    /// Work handed to the shared runner after it was shut down and before
    /// the accessor recreated it.
    #[error("shared runner is shut down")]
    RunnerShutDown,

    /// A triggered action's own failure, propagated to the caller.
    #[error("deferred action failed")]
    ActionFailed(#[source] anyhow::Error),

    /// Substrate failures pass through unchanged; no retry layer is added.
    #[error(transparent)]
    Substrate(#[from] SubstrateError),
}

/// Result type for harness operations.
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
