//! Execution Contexts
//!
//! An execution context is the submission surface role-actors run their
//! asynchronous computations against. Tests choose between a real backing
//! executor (see [`crate::runner`]) and the deterministic
//! [`ControllableExecutionContext`], which either runs work immediately or
//! buffers it into an [`ActionQueue`] for manual, turn-by-turn release.

use crate::action_queue::{ActionQueue, ActionResult, DeferredAction};
use crate::error::{HarnessError, HarnessResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Repeatable work item for fixed-rate and fixed-delay scheduling.
pub type PeriodicAction = Arc<dyn Fn() -> ActionResult + Send + Sync>;

/// Hook receiving uncaught failures from executed work. Failures are
/// reported here and discarded so one failing work item cannot abort the
/// harness or corrupt queued state.
pub type FailureHook = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

/// Default hook: structured error log, nothing re-thrown.
pub fn logging_failure_hook() -> FailureHook {
    Arc::new(|e| error!(error = %e, "uncaught failure from submitted work"))
}

/// Submission surface for asynchronous computations.
///
/// Lifecycle operations mirror a generic executor so resource-cleanup code
/// paths can call them blindly; deterministic implementations turn them
/// into documented no-ops.
pub trait ExecutionContext: Send + Sync {
    /// Submit work for execution. Never blocks, never rejects on load.
    fn submit(&self, work: DeferredAction) -> HarnessResult<()>;

    /// Run work once after a delay.
    fn schedule_once(&self, delay: Duration, work: DeferredAction) -> HarnessResult<()>;

    /// Run work repeatedly at a fixed rate, measured start-to-start.
    fn schedule_at_fixed_rate(
        &self,
        initial_delay: Duration,
        period: Duration,
        work: PeriodicAction,
    ) -> HarnessResult<()>;

    /// Run work repeatedly with a fixed delay between the end of one run
    /// and the start of the next.
    fn schedule_with_fixed_delay(
        &self,
        initial_delay: Duration,
        delay: Duration,
        work: PeriodicAction,
    ) -> HarnessResult<()>;

    /// Request shutdown. Deterministic contexts make this a no-op.
    fn shutdown(&self);

    /// Whether shutdown has taken effect.
    fn is_shutdown(&self) -> bool;

    /// Wait up to `timeout` for termination; returns whether the context
    /// terminated. Deterministic contexts return `false` immediately.
    fn await_termination(&self, timeout: Duration) -> bool;
}

/// Execution mode of a [`ControllableExecutionContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Submissions are buffered into the action queue for manual release.
    Manual,
    /// Submissions execute synchronously in the calling thread.
    Automatic,
}

/// Deterministic execution context under explicit test control.
///
/// Starts in [`ExecutionMode::Manual`]. The mode is read on every
/// submission and mutated only by [`toggle_mode`](Self::toggle_mode);
/// toggling is not retroactive: work already queued stays queued until
/// explicitly triggered. Toggling concurrently with submissions from other
/// threads needs external synchronization; the flag itself is atomic but
/// the mode decision is not atomic with the enqueue.
///
/// Timer-based scheduling always fails with
/// [`HarnessError::UnsupportedOperation`]: the context is for
/// deterministic unit-level control, not timer simulation.
pub struct ControllableExecutionContext {
    queue: Arc<ActionQueue>,
    automatic: AtomicBool,
    on_failure: FailureHook,
}

impl ControllableExecutionContext {
    /// Create a context in manual mode with the logging failure hook.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(ActionQueue::new()),
            automatic: AtomicBool::new(false),
            on_failure: logging_failure_hook(),
        }
    }

    /// Create a context starting in the given mode.
    pub fn starting_in(mode: ExecutionMode) -> Self {
        let ctx = Self::new();
        ctx.automatic
            .store(mode == ExecutionMode::Automatic, Ordering::SeqCst);
        ctx
    }

    /// Replace the failure hook.
    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.on_failure = hook;
        self
    }

    /// The owned action queue, for manual draining.
    pub fn queue(&self) -> Arc<ActionQueue> {
        Arc::clone(&self.queue)
    }

    /// Current execution mode.
    pub fn mode(&self) -> ExecutionMode {
        if self.automatic.load(Ordering::SeqCst) {
            ExecutionMode::Automatic
        } else {
            ExecutionMode::Manual
        }
    }

    /// Flip manual ⇄ automatic and return the new mode. Takes effect for
    /// subsequent submissions only.
    pub fn toggle_mode(&self) -> ExecutionMode {
        let was_automatic = self.automatic.fetch_xor(true, Ordering::SeqCst);
        if was_automatic {
            ExecutionMode::Manual
        } else {
            ExecutionMode::Automatic
        }
    }
}

impl Default for ControllableExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext for ControllableExecutionContext {
    fn submit(&self, work: DeferredAction) -> HarnessResult<()> {
        match self.mode() {
            ExecutionMode::Automatic => {
                if let Err(e) = work.run() {
                    (self.on_failure)(&e);
                }
            }
            ExecutionMode::Manual => self.queue.enqueue_action(work),
        }
        Ok(())
    }

    fn schedule_once(&self, _delay: Duration, _work: DeferredAction) -> HarnessResult<()> {
        Err(HarnessError::UnsupportedOperation("schedule_once"))
    }

    fn schedule_at_fixed_rate(
        &self,
        _initial_delay: Duration,
        _period: Duration,
        _work: PeriodicAction,
    ) -> HarnessResult<()> {
        Err(HarnessError::UnsupportedOperation("schedule_at_fixed_rate"))
    }

    fn schedule_with_fixed_delay(
        &self,
        _initial_delay: Duration,
        _delay: Duration,
        _work: PeriodicAction,
    ) -> HarnessResult<()> {
        Err(HarnessError::UnsupportedOperation("schedule_with_fixed_delay"))
    }

    /// No-op: queued state survives so generic cleanup paths can call this
    /// blindly. Real cleanup is draining the queue explicitly. Tests that
    /// expect executor-style shutdown semantics will leak queued actions
    /// silently here.
    fn shutdown(&self) {}

    fn is_shutdown(&self) -> bool {
        false
    }

    fn await_termination(&self, _timeout: Duration) -> bool {
        false
    }
}

/// Immediate-execution surface with no thread hand-off: submissions run
/// synchronously on the caller's thread, failures are logged through the
/// hook and discarded. Timer-based scheduling is unsupported; only the
/// shared runner owns timers.
pub struct InlineExecutionContext {
    on_failure: FailureHook,
}

impl InlineExecutionContext {
    pub fn new() -> Self {
        Self {
            on_failure: logging_failure_hook(),
        }
    }

    /// Replace the failure hook.
    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.on_failure = hook;
        self
    }
}

impl Default for InlineExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext for InlineExecutionContext {
    fn submit(&self, work: DeferredAction) -> HarnessResult<()> {
        if let Err(e) = work.run() {
            (self.on_failure)(&e);
        }
        Ok(())
    }

    fn schedule_once(&self, _delay: Duration, _work: DeferredAction) -> HarnessResult<()> {
        Err(HarnessError::UnsupportedOperation("schedule_once"))
    }

    fn schedule_at_fixed_rate(
        &self,
        _initial_delay: Duration,
        _period: Duration,
        _work: PeriodicAction,
    ) -> HarnessResult<()> {
        Err(HarnessError::UnsupportedOperation("schedule_at_fixed_rate"))
    }

    fn schedule_with_fixed_delay(
        &self,
        _initial_delay: Duration,
        _delay: Duration,
        _work: PeriodicAction,
    ) -> HarnessResult<()> {
        Err(HarnessError::UnsupportedOperation("schedule_with_fixed_delay"))
    }

    fn shutdown(&self) {}

    fn is_shutdown(&self) -> bool {
        false
    }

    fn await_termination(&self, _timeout: Duration) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;

    fn recording_action(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> DeferredAction {
        let log = Arc::clone(log);
        DeferredAction::new(move || {
            log.lock().push(label);
            Ok(())
        })
    }

    #[test]
    fn test_automatic_mode_runs_before_submit_returns() {
        let ctx = ControllableExecutionContext::starting_in(ExecutionMode::Automatic);
        let log = Arc::new(Mutex::new(Vec::new()));

        ctx.submit(recording_action(&log, "now")).unwrap();

        assert_eq!(*log.lock(), vec!["now"]);
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_manual_mode_defers_until_triggered() {
        let ctx = ControllableExecutionContext::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        ctx.submit(recording_action(&log, "later")).unwrap();
        assert!(log.lock().is_empty());

        ctx.queue().trigger().unwrap();
        assert_eq!(*log.lock(), vec!["later"]);
    }

    #[test]
    fn test_toggle_is_not_retroactive() {
        let ctx = ControllableExecutionContext::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        ctx.submit(recording_action(&log, "queued")).unwrap();
        assert_eq!(ctx.toggle_mode(), ExecutionMode::Automatic);

        // Queued work stays queued; new work runs immediately.
        ctx.submit(recording_action(&log, "direct")).unwrap();
        assert_eq!(*log.lock(), vec!["direct"]);
        assert_eq!(ctx.queue().len(), 1);

        ctx.queue().trigger().unwrap();
        assert_eq!(*log.lock(), vec!["direct", "queued"]);
    }

    #[test]
    fn test_toggle_roundtrip() {
        let ctx = ControllableExecutionContext::new();
        assert_eq!(ctx.mode(), ExecutionMode::Manual);
        assert_eq!(ctx.toggle_mode(), ExecutionMode::Automatic);
        assert_eq!(ctx.toggle_mode(), ExecutionMode::Manual);
    }

    #[test]
    fn test_timer_scheduling_is_unsupported() {
        let ctx = ControllableExecutionContext::new();
        let noop: PeriodicAction = Arc::new(|| Ok(()));

        assert_matches!(
            ctx.schedule_once(Duration::ZERO, DeferredAction::new(|| Ok(()))),
            Err(HarnessError::UnsupportedOperation(_))
        );
        assert_matches!(
            ctx.schedule_at_fixed_rate(Duration::ZERO, Duration::from_millis(1), Arc::clone(&noop)),
            Err(HarnessError::UnsupportedOperation(_))
        );
        assert_matches!(
            ctx.schedule_with_fixed_delay(Duration::ZERO, Duration::from_millis(1), noop),
            Err(HarnessError::UnsupportedOperation(_))
        );
    }

    #[test]
    fn test_shutdown_is_a_noop() {
        let ctx = ControllableExecutionContext::new();
        ctx.submit(DeferredAction::new(|| Ok(()))).unwrap();

        ctx.shutdown();

        assert!(!ctx.is_shutdown());
        assert!(!ctx.await_termination(Duration::from_millis(5)));
        // Queued state survives shutdown.
        assert_eq!(ctx.queue().len(), 1);
    }

    #[test]
    fn test_failure_hook_sees_automatic_failures() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: FailureHook = Arc::new(move |e| sink.lock().push(e.to_string()));

        let ctx = ControllableExecutionContext::starting_in(ExecutionMode::Automatic)
            .with_failure_hook(hook);
        ctx.submit(DeferredAction::new(|| Err(anyhow::anyhow!("boom"))))
            .unwrap();

        assert_eq!(*seen.lock(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_inline_context_runs_and_discards_failures() {
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let ctx = InlineExecutionContext::new()
            .with_failure_hook(Arc::new(move |_| *sink.lock() += 1));

        let log = Arc::new(Mutex::new(Vec::new()));
        ctx.submit(recording_action(&log, "inline")).unwrap();
        ctx.submit(DeferredAction::new(|| Err(anyhow::anyhow!("dropped"))))
            .unwrap();

        assert_eq!(*log.lock(), vec!["inline"]);
        assert_eq!(*seen.lock(), 1);
        assert!(!ctx.is_shutdown());
    }
}
