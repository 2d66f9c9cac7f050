//! Deferred task queue for notification passes.
//!
//! Mutations don't notify subscribers directly. They schedule a pass that runs
//! on the next tick, when the owner drains the queue. Repeated requests for the
//! same pass collapse into one, so a burst of synchronous mutations produces a
//! single broadcast.
//!
//! The queue is single threaded. A tokio [`Notify`] wakes an event loop that
//! awaits new work; draining itself is synchronous.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use log::trace;
use tokio::sync::Notify;

/// Work that runs on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Notify every subscriber.
    Notify,
    /// Notify every subscriber, then clear the store.
    NotifyAndClear,
}

/// FIFO queue of deferred work.
#[derive(Debug)]
pub struct Scheduler {
    queue: RefCell<VecDeque<Deferred>>,
    wakeup: Notify,
    coalesce: bool,
    draining: Cell<bool>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Scheduler {
    /// Creates an empty queue. With `coalesce` set, a task is dropped when the
    /// most recently queued task is the same.
    pub fn new(coalesce: bool) -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            wakeup: Notify::new(),
            coalesce,
            draining: Cell::new(false),
        }
    }

    /// Queues a task. Returns `false` if it was merged into a pending one.
    pub fn schedule(&self, task: Deferred) -> bool {
        let mut queue = self.queue.borrow_mut();
        if self.coalesce && queue.back() == Some(&task) {
            trace!("Coalesced deferred {:?}", task);
            return false;
        }
        queue.push_back(task);
        drop(queue);
        self.wakeup.notify_one();
        true
    }

    /// Takes the next task, if any.
    pub fn pop(&self) -> Option<Deferred> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Waits until a task has been scheduled.
    ///
    /// Returns immediately if work was scheduled since the last wait.
    pub async fn wait(&self) {
        if self.has_pending() {
            return;
        }
        self.wakeup.notified().await;
    }

    /// Runs `run` for every queued task, including tasks queued while
    /// draining. Returns the number of tasks run.
    ///
    /// Re-entrant calls return 0 without running anything, so two drains
    /// never interleave.
    ///
    /// The draining flag is cleared even if `run` panics, so a caller that
    /// recovers from the panic can keep draining.
    pub fn drain(&self, mut run: impl FnMut(Deferred)) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let _guard = DrainGuard(&self.draining);
        let mut count = 0;
        while let Some(task) = self.pop() {
            run(task);
            count += 1;
        }
        count
    }

    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }
}

struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
