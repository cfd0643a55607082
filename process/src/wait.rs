//! Wait Channel
//!
//! The notification primitive behind join and sleep/wake, built the way the
//! futex wait queues are: a waiter queues its task id, releases the table
//! lock and blocks; a notifier drains the queue and unblocks every id in it.
//! Both sides run with the table lock held, so a notification can never fall
//! between the waiter's check and its wait.

use alloc::collections::VecDeque;
use spin::mutex::{Mutex, MutexGuard};
use spin::relax::RelaxStrategy;

use crate::sched::Scheduler;

/// Wait queue for one table slot.
#[derive(Debug)]
pub struct WaitChannel<T> {
    /// Tasks blocked on this channel, in arrival order.
    queue: Mutex<VecDeque<T>>,
}

impl<T> WaitChannel<T> {
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue the calling task, release `guard`, block until the next
    /// notification, then re-acquire `lock` and return the new guard.
    ///
    /// `guard` must be a guard of `lock`. Any notification on the channel
    /// ends the wait, so callers re-check their condition.
    pub fn wait<'a, G, R, S>(
        &self,
        sched: &S,
        guard: MutexGuard<'a, G>,
        lock: &'a Mutex<G, R>,
    ) -> MutexGuard<'a, G>
    where
        T: Clone,
        R: RelaxStrategy,
        S: Scheduler<TaskId = T>,
    {
        let task = sched.current_task_id();
        self.queue.lock().push_back(task.clone());
        drop(guard);

        sched.block_current(&task);

        lock.lock()
    }

    /// Unblock every task currently waiting. Must be called with the lock
    /// the waiters passed to [`WaitChannel::wait`] held.
    ///
    /// Returns the number of tasks unblocked. A notification with no
    /// waiters is not remembered.
    pub fn notify_all<S: Scheduler<TaskId = T>>(&self, sched: &S) -> usize {
        let mut queue = self.queue.lock();
        let woken = queue.len();
        for task in queue.drain(..) {
            sched.unblock(task);
        }
        woken
    }

    /// Number of tasks currently queued.
    pub fn waiters(&self) -> usize {
        self.queue.lock().len()
    }
}

impl<T> Default for WaitChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}
