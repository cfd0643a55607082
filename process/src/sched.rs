//! Scheduler hooks.
//!
//! The process table never spins waiting for an exit or a wakeup. A blocked
//! context is parked through the [`Scheduler`] the table was bootstrapped
//! with, and released by a matching `unblock`.

use alloc::sync::Arc;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::relax::{RelaxStrategy, Spin};

/// The parts of the kernel scheduler the process table relies on.
pub trait Scheduler {
    /// Handle naming a task that can be blocked and unblocked.
    type TaskId: Clone;

    /// Handle of the calling task.
    fn current_task_id(&self) -> Self::TaskId;

    /// Block the calling task, which `current_task_id` returned as `task`,
    /// until `unblock(task)` is called.
    ///
    /// An `unblock` issued between queuing `task` and this call must not be
    /// lost: in that case `block_current` returns immediately.
    fn block_current(&self, task: &Self::TaskId);

    /// Make a blocked task runnable again.
    fn unblock(&self, task: Self::TaskId);
}

/// Scheduler stand-in for hosted builds, where there is no run queue to
/// park on. Each wait gets a fresh wakeup flag and idles on it with `R`.
#[derive(Debug)]
pub struct RelaxScheduler<R = Spin> {
    relax: PhantomData<R>,
}

impl<R> RelaxScheduler<R> {
    pub const fn new() -> Self {
        Self { relax: PhantomData }
    }
}

impl<R> Default for RelaxScheduler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RelaxStrategy> Scheduler for RelaxScheduler<R> {
    type TaskId = Arc<AtomicBool>;

    fn current_task_id(&self) -> Self::TaskId {
        Arc::new(AtomicBool::new(false))
    }

    fn block_current(&self, task: &Self::TaskId) {
        while !task.load(Ordering::Acquire) {
            R::relax();
        }
    }

    fn unblock(&self, task: Self::TaskId) {
        task.store(true, Ordering::Release);
    }
}
