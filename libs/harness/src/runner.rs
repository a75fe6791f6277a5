//! Shared Scheduled Runner
//!
//! Process-wide single-thread scheduled task runner, used as the default
//! backing executor when a test does not need manual control. Lazily
//! created on first access and recreated automatically when observed shut
//! down; the check-and-create sequence is guarded by one mutex. Exposed
//! only through [`shared_runner`], never as a public mutable variable.

use crate::action_queue::DeferredAction;
use crate::error::{HarnessError, HarnessResult};
use crate::execution::{ExecutionContext, PeriodicAction};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

static SHARED_RUNNER: Lazy<Mutex<Option<Arc<SharedRunner>>>> = Lazy::new(|| Mutex::new(None));

/// Access the process-wide runner, creating or recreating it as needed.
pub fn shared_runner() -> Arc<SharedRunner> {
    let mut slot = SHARED_RUNNER.lock();
    if let Some(runner) = slot.as_ref() {
        if !runner.is_shutdown() {
            return Arc::clone(runner);
        }
        debug!("shared runner was shut down, recreating");
    }
    let runner = SharedRunner::start();
    *slot = Some(Arc::clone(&runner));
    runner
}

/// Single-thread scheduled task runner: a dedicated thread driving a
/// current-thread tokio runtime. Supports immediate, delayed, fixed-rate,
/// and fixed-delay scheduling. Shutdown cancels pending tasks and does not
/// wait for the thread to exit.
pub struct SharedRunner {
    handle: tokio::runtime::Handle,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    shut_down: AtomicBool,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl SharedRunner {
    fn start() -> Arc<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build shared runner runtime");
        let handle = runtime.handle().clone();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("rill-shared-runner".into())
            .spawn(move || {
                // Dropping the runtime on exit cancels anything still queued.
                runtime.block_on(async {
                    let _ = shutdown_rx.await;
                });
            })
            .expect("failed to spawn shared runner thread");

        info!("shared runner started");
        Arc::new(Self {
            handle,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shut_down: AtomicBool::new(false),
            thread: Mutex::new(Some(thread)),
        })
    }

    fn ensure_running(&self) -> HarnessResult<()> {
        if self.is_shutdown() {
            return Err(HarnessError::RunnerShutDown);
        }
        Ok(())
    }

    /// Run work as soon as the runner thread gets to it.
    pub fn submit(&self, work: DeferredAction) -> HarnessResult<()> {
        self.ensure_running()?;
        self.handle.spawn(async move {
            if let Err(e) = work.run() {
                error!(error = %e, "uncaught failure from submitted work");
            }
        });
        Ok(())
    }

    /// Run work once after `delay`.
    pub fn schedule_once(&self, delay: Duration, work: DeferredAction) -> HarnessResult<()> {
        self.ensure_running()?;
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = work.run() {
                error!(error = %e, "uncaught failure from scheduled work");
            }
        });
        Ok(())
    }

    /// Run work repeatedly at a fixed rate, start-to-start.
    pub fn schedule_at_fixed_rate(
        &self,
        initial_delay: Duration,
        period: Duration,
        work: PeriodicAction,
    ) -> HarnessResult<()> {
        self.ensure_running()?;
        self.handle.spawn(async move {
            tokio::time::sleep(initial_delay).await;
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if let Err(e) = work() {
                    error!(error = %e, "uncaught failure from fixed-rate work");
                }
            }
        });
        Ok(())
    }

    /// Run work repeatedly with a fixed delay between runs.
    pub fn schedule_with_fixed_delay(
        &self,
        initial_delay: Duration,
        delay: Duration,
        work: PeriodicAction,
    ) -> HarnessResult<()> {
        self.ensure_running()?;
        self.handle.spawn(async move {
            tokio::time::sleep(initial_delay).await;
            loop {
                if let Err(e) = work() {
                    error!(error = %e, "uncaught failure from fixed-delay work");
                }
                tokio::time::sleep(delay).await;
            }
        });
        Ok(())
    }

    /// Stop the runner. Pending and periodic tasks are cancelled when the
    /// runtime drops; the call does not wait for the thread to exit.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        info!("shared runner shut down");
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Whether the runner thread has exited.
    pub fn is_terminated(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(true)
    }
}

/// [`ExecutionContext`] adapter over a [`SharedRunner`], handed to
/// role-actors whose computations should run off the caller's thread.
pub struct SharedRunnerContext {
    runner: Arc<SharedRunner>,
}

impl SharedRunnerContext {
    pub fn new(runner: Arc<SharedRunner>) -> Self {
        Self { runner }
    }

    /// Adapter over the process-wide runner.
    pub fn shared() -> Self {
        Self::new(shared_runner())
    }
}

impl ExecutionContext for SharedRunnerContext {
    fn submit(&self, work: DeferredAction) -> HarnessResult<()> {
        self.runner.submit(work)
    }

    fn schedule_once(&self, delay: Duration, work: DeferredAction) -> HarnessResult<()> {
        self.runner.schedule_once(delay, work)
    }

    fn schedule_at_fixed_rate(
        &self,
        initial_delay: Duration,
        period: Duration,
        work: PeriodicAction,
    ) -> HarnessResult<()> {
        self.runner.schedule_at_fixed_rate(initial_delay, period, work)
    }

    fn schedule_with_fixed_delay(
        &self,
        initial_delay: Duration,
        delay: Duration,
        work: PeriodicAction,
    ) -> HarnessResult<()> {
        self.runner.schedule_with_fixed_delay(initial_delay, delay, work)
    }

    fn shutdown(&self) {
        self.runner.shutdown();
    }

    fn is_shutdown(&self) -> bool {
        self.runner.is_shutdown()
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.runner.is_terminated() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.runner.is_terminated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_submit_runs_work_on_runner_thread() {
        let runner = SharedRunner::start();
        let (tx, rx) = mpsc::channel();

        runner
            .submit(DeferredAction::new(move || {
                tx.send(std::thread::current().name().map(str::to_owned))
                    .unwrap();
                Ok(())
            }))
            .unwrap();

        let thread_name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(thread_name.as_deref(), Some("rill-shared-runner"));
        runner.shutdown();
    }

    #[test]
    fn test_schedule_once_runs_after_delay() {
        let runner = SharedRunner::start();
        let (tx, rx) = mpsc::channel();
        let started = Instant::now();

        runner
            .schedule_once(
                Duration::from_millis(20),
                DeferredAction::new(move || {
                    tx.send(()).unwrap();
                    Ok(())
                }),
            )
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        runner.shutdown();
    }

    #[test]
    fn test_fixed_rate_work_repeats() {
        let runner = SharedRunner::start();
        let (tx, rx) = mpsc::channel();

        runner
            .schedule_at_fixed_rate(
                Duration::ZERO,
                Duration::from_millis(5),
                Arc::new(move || {
                    let _ = tx.send(());
                    Ok(())
                }),
            )
            .unwrap();

        for _ in 0..3 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        runner.shutdown();
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let runner = SharedRunner::start();
        runner.shutdown();
        assert!(runner.is_shutdown());

        let err = runner.submit(DeferredAction::new(|| Ok(()))).unwrap_err();
        assert!(matches!(err, HarnessError::RunnerShutDown));
    }

    #[test]
    fn test_runner_context_reports_termination() {
        let ctx = SharedRunnerContext::new(SharedRunner::start());
        assert!(!ctx.is_shutdown());

        ctx.shutdown();
        assert!(ctx.is_shutdown());
        assert!(ctx.await_termination(Duration::from_secs(5)));
    }

    /// The accessor lifecycle is covered in one test: parallel test threads
    /// would otherwise race the global slot through shutdown.
    #[test]
    fn test_shared_accessor_reuses_then_recreates() {
        let first = shared_runner();
        let again = shared_runner();
        assert!(Arc::ptr_eq(&first, &again));

        first.shutdown();
        let recreated = shared_runner();
        assert!(!Arc::ptr_eq(&first, &recreated));
        assert!(!recreated.is_shutdown());
        recreated.shutdown();
    }
}
