//! Syscall entry points backed by the process table.
//!
//! These take already-decoded arguments (the trap frame and user pointers
//! are handled by the dispatcher) and return a value or `-errno`, the way
//! the Linux handlers do.

use crate::error::{EFAULT, EINVAL, ENOSYS, ESRCH};
use crate::lifecycle::WaitFlags;
use crate::pid::Pid;
use crate::sched::Scheduler;
use crate::signal::{self, SIGCONT, SIG_MAX};
use crate::table::ProcessTable;

/// `waitpid` option: do not block.
pub const WNOHANG: i32 = 1;

/// `waitpid(pid, status, options)` → `pid`, `0`, or `-errno`
///
/// Returns `pid` once its status has been stored in `status`, or `0` when
/// `WNOHANG` is given and the target is still running.
pub fn sys_waitpid<S: Scheduler>(
    table: &ProcessTable<S>,
    caller: Pid,
    pid: i32,
    status: Option<&mut i32>,
    options: i32,
) -> i64 {
    log::trace!("[KPIO PID] waitpid(pid={}, options={:#x}) from {}", pid, options, caller);

    if pid <= 0 {
        return -ESRCH;
    }
    let Some(status) = status else {
        return -EFAULT;
    };
    if options != 0 && options != WNOHANG {
        return -EINVAL;
    }

    let flags = WaitFlags::from_bits_truncate(options as u32);
    match table.join(caller, Pid(pid as u32), flags) {
        Ok(Some(code)) => {
            *status = code;
            pid as i64
        }
        Ok(None) => 0,
        Err(e) => -e.errno(),
    }
}

/// `kill(pid, sig)` → `0` or `-errno`
///
/// Records `sig` as the target's pending signal. `SIGCONT` also wakes
/// anything sleeping on the target so a stopped process can resume.
pub fn sys_kill<S: Scheduler>(table: &ProcessTable<S>, pid: i32, sig: i32) -> i64 {
    log::trace!("[KPIO PID] kill(pid={}, sig={})", pid, sig);

    if !(1..=SIG_MAX).contains(&sig) {
        return -EINVAL;
    }
    if !signal::is_supported(sig) {
        return -ENOSYS;
    }
    if pid <= 0 {
        return -ESRCH;
    }

    let target = Pid(pid as u32);
    if let Err(e) = table.set_flag(target, sig) {
        return -e.errno();
    }
    if sig == SIGCONT {
        // The record was present a moment ago; if it is gone now there is
        // nobody left to wake.
        let _ = table.wake(target);
    }
    0
}
