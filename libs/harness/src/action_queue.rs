//! Action Queue
//!
//! Ordered buffer of deferred work. A test drains the queue turn by turn to
//! pick the exact interleaving of asynchronous computations.
//!
//! The queue carries no ordering coordination of its own: it is designed
//! for single-threaded, turn-by-turn manual draining. The interior mutex
//! exists so handles can be shared with an execution context, not to make
//! concurrent draining meaningful; callers sharing a queue across threads
//! must serialize access themselves.

use crate::error::{HarnessError, HarnessResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// Result of running one deferred action.
pub type ActionResult = anyhow::Result<()>;

/// A unit of work captured for later, explicitly triggered execution.
/// Owned by the queue once enqueued; ownership transfers to whoever pops it.
pub struct DeferredAction(Box<dyn FnOnce() -> ActionResult + Send>);

impl DeferredAction {
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() -> ActionResult + Send + 'static,
    {
        Self(Box::new(work))
    }

    /// Execute the action, consuming it.
    pub fn run(self) -> ActionResult {
        (self.0)()
    }
}

impl fmt::Debug for DeferredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeferredAction")
    }
}

/// Unbounded FIFO of deferred actions. Strict enqueue order; popping or
/// triggering an empty queue fails with [`HarnessError::EmptyQueue`] and
/// never blocks.
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: Mutex<VecDeque<DeferredAction>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action at the tail. Never fails, O(1).
    pub fn enqueue<F>(&self, work: F)
    where
        F: FnOnce() -> ActionResult + Send + 'static,
    {
        self.enqueue_action(DeferredAction::new(work));
    }

    /// Append an already-wrapped action at the tail.
    pub fn enqueue_action(&self, action: DeferredAction) {
        self.actions.lock().push_back(action);
    }

    /// Remove and return the head action without running it.
    pub fn pop(&self) -> HarnessResult<DeferredAction> {
        self.actions
            .lock()
            .pop_front()
            .ok_or(HarnessError::EmptyQueue)
    }

    /// Pop the head action and execute it synchronously on the calling
    /// thread. Propagates the action's own failure as
    /// [`HarnessError::ActionFailed`].
    pub fn trigger(&self) -> HarnessResult<()> {
        let action = self.pop()?;
        action.run().map_err(HarnessError::ActionFailed)
    }

    /// Whether the queue currently holds no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }

    /// Number of queued actions.
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    #[test]
    fn test_actions_run_in_enqueue_order() {
        let queue = ActionQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["A", "B", "C"] {
            let log = Arc::clone(&log);
            queue.enqueue(move || {
                log.lock().push(label);
                Ok(())
            });
        }
        assert_eq!(queue.len(), 3);

        queue.trigger().unwrap();
        queue.trigger().unwrap();
        queue.trigger().unwrap();

        assert_eq!(*log.lock(), vec!["A", "B", "C"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_trigger_on_empty_queue_fails() {
        let queue = ActionQueue::new();
        assert_matches!(queue.trigger(), Err(HarnessError::EmptyQueue));
    }

    #[test]
    fn test_pop_on_empty_queue_fails() {
        let queue = ActionQueue::new();
        assert_matches!(queue.pop(), Err(HarnessError::EmptyQueue));
    }

    #[test]
    fn test_pop_transfers_ownership_without_running() {
        let queue = ActionQueue::new();
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        queue.enqueue(move || {
            *flag.lock() = true;
            Ok(())
        });

        let action = queue.pop().unwrap();
        assert!(!*ran.lock());
        assert!(queue.is_empty());

        action.run().unwrap();
        assert!(*ran.lock());
    }

    #[test]
    fn test_trigger_propagates_action_failure() {
        let queue = ActionQueue::new();
        queue.enqueue(|| Err(anyhow::anyhow!("boom")));
        queue.enqueue(|| Ok(()));

        assert_matches!(queue.trigger(), Err(HarnessError::ActionFailed(_)));
        // A failing action does not corrupt the rest of the queue.
        assert_eq!(queue.len(), 1);
        queue.trigger().unwrap();
    }
}
