//! Signal Flags and Sleep/Wake
//!
//! Minimal per-process signal storage for the signal delivery layer: one
//! pending value per process, overwritten rather than queued. Sleep and
//! wake share the per-record wait channel with join.

use crate::error::{ProcError, Result};
use crate::pid::Pid;
use crate::sched::Scheduler;
use crate::table::ProcessTable;

// ─── Signal numbers (Linux x86_64) ──────────────────────────────────

pub const SIGHUP: i32 = 1;
pub const SIGINT: i32 = 2;
pub const SIGKILL: i32 = 9;
pub const SIGTERM: i32 = 15;
pub const SIGCONT: i32 = 18;
pub const SIGSTOP: i32 = 19;
pub const SIGWINCH: i32 = 28;
/// Status request. Takes the BSD number, which Linux assigns to SIGIO.
pub const SIGINFO: i32 = 29;

/// Highest signal number accepted by `kill`.
pub const SIG_MAX: i32 = 31;

/// Signals the kernel acts on. Others are valid numbers but unimplemented.
pub fn is_supported(sig: i32) -> bool {
    matches!(
        sig,
        SIGHUP | SIGINT | SIGKILL | SIGTERM | SIGSTOP | SIGCONT | SIGWINCH | SIGINFO
    )
}

impl<S: Scheduler> ProcessTable<S> {
    /// Signals and sleep/wake only address allocated pids, never bootup.
    fn check_addressable(&self, pid: Pid) -> Result<()> {
        if self.config.in_range(pid) {
            Ok(())
        } else {
            Err(ProcError::InvalidArgument)
        }
    }

    /// Record `value` as the pending signal of `pid`, replacing any earlier one.
    pub fn set_flag(&self, pid: Pid, value: i32) -> Result<()> {
        self.check_addressable(pid)?;
        let mut inner = self.lock();
        let record = inner.get_mut(pid).ok_or(ProcError::NotFound)?;
        record.pending_signal = value;
        log::trace!("[KPIO PID] pid {} flagged with {}", pid, value);
        Ok(())
    }

    /// Pending signal of `pid` (0 if none).
    pub fn get_flag(&self, pid: Pid) -> Result<i32> {
        self.check_addressable(pid)?;
        self.lock()
            .get(pid)
            .map(|record| record.pending_signal)
            .ok_or(ProcError::NotFound)
    }

    /// Block the calling context on `pid`'s wait channel until the next
    /// wake, exit notification, or reclamation of the record.
    pub fn sleep_on(&self, pid: Pid) -> Result<()> {
        self.check_addressable(pid)?;
        let inner = self.lock();
        if inner.get(pid).is_none() {
            return Err(ProcError::NotFound);
        }

        log::trace!("[KPIO PID] sleeping on pid {}", pid);
        let inner = self.wait_on(pid, inner);
        drop(inner);
        Ok(())
    }

    /// Wake everything sleeping on `pid`. Nothing is remembered if nobody is.
    pub fn wake(&self, pid: Pid) -> Result<()> {
        self.check_addressable(pid)?;
        let inner = self.lock();
        if inner.get(pid).is_none() {
            return Err(ProcError::NotFound);
        }
        let woken = self.notify(pid);
        log::trace!("[KPIO PID] woke {} sleepers on pid {}", woken, pid);
        Ok(())
    }

    /// Contexts currently waiting on `pid`'s channel (sleepers and joiners).
    pub fn sleeper_count(&self, pid: Pid) -> usize {
        let inner = self.lock();
        match inner.get(pid) {
            Some(_) => self.waiting_on(pid),
            None => 0,
        }
    }

    /// Whether `parent` is the recorded parent of `child`.
    pub fn is_parent_of(&self, parent: Pid, child: Pid) -> Result<bool> {
        if parent != Pid::BOOTUP {
            self.check_addressable(parent)?;
        }
        self.check_addressable(child)?;
        self.lock()
            .get(child)
            .map(|record| record.parent == Some(parent))
            .ok_or(ProcError::NotFound)
    }
}
