//! Exit/Join Protocol
//!
//! The handshake between a terminating process and the threads waiting for
//! its status. Both sides hold the table lock around their check-then-wait
//! and set-then-wake sequences, so a joiner can never miss the exit it is
//! waiting for.

use bitflags::bitflags;

use crate::error::{ProcError, Result};
use crate::pid::Pid;
use crate::sched::Scheduler;
use crate::record::ExitStatus;
use crate::table::{ProcessTable, TableInner};

bitflags! {
    /// Options for [`ProcessTable::join`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WaitFlags: u32 {
        /// Return `Ok(None)` instead of blocking if the target is still running.
        const NOHANG = 1;
    }
}

impl<S: Scheduler> ProcessTable<S> {
    /// Terminate `caller` with `status`.
    ///
    /// Posts the status, disowns the caller's children (detaching them too
    /// when `detach_children` is set), then either reclaims the caller's own
    /// record or wakes every thread joined on it.
    ///
    /// # Panics
    ///
    /// If `caller` has no record or has already exited.
    pub fn exit(&self, caller: Pid, status: ExitStatus, detach_children: bool) {
        let mut inner = self.lock();

        let Some(record) = inner.get_mut(caller) else {
            panic!("exit from pid {} which is not in the table", caller);
        };
        record.set_exited(status);

        let disowned = self.disown_children(&mut inner, caller, detach_children);

        if self.reclaim_if_done(&mut inner, caller) {
            log::debug!(
                "[KPIO PID] pid {} exited with {} ({} children disowned)",
                caller,
                status,
                disowned
            );
        } else {
            let woken = self.notify(caller);
            log::debug!(
                "[KPIO PID] pid {} exited with {} ({} children disowned, {} waiters woken)",
                caller,
                status,
                disowned,
                woken
            );
        }
    }

    /// Collect the exit status of `target` on behalf of `caller`.
    ///
    /// Blocks until `target` exits unless [`WaitFlags::NOHANG`] is set, in
    /// which case a still-running target yields `Ok(None)`. Collecting the
    /// status releases the parent's interest in the record, so the record
    /// is reclaimed once the last joiner has read it.
    pub fn join(&self, caller: Pid, target: Pid, flags: WaitFlags) -> Result<Option<ExitStatus>> {
        if target == caller {
            return Err(ProcError::Deadlock);
        }
        if target == Pid::INVALID || target == Pid::BOOTUP {
            return Err(ProcError::NotFound);
        }
        if !self.config.in_range(target) {
            return Err(ProcError::InvalidArgument);
        }

        let mut inner = self.lock();
        let record = inner.get_mut(target).ok_or(ProcError::NotFound)?;
        if record.detached {
            return Err(ProcError::InvalidArgument);
        }

        if !record.is_exited() {
            if flags.contains(WaitFlags::NOHANG) {
                return Ok(None);
            }

            record.joiners += 1;
            log::trace!("[KPIO PID] pid {} waiting for pid {}", caller, target);

            loop {
                inner = self.wait_on(target, inner);
                // Outstanding joiners keep the record in the table.
                let Some(record) = inner.get_mut(target) else {
                    panic!("pid {} vanished while {} was joined on it", target, caller);
                };
                if record.is_exited() {
                    record.joiners -= 1;
                    break;
                }
            }
        }

        Ok(Some(self.collect_status(&mut inner, target)))
    }

    /// Read the status of an exited record and reclaim it if nobody else
    /// still needs it.
    fn collect_status(&self, inner: &mut TableInner, target: Pid) -> ExitStatus {
        let Some(record) = inner.get_mut(target) else {
            panic!("collecting status of pid {} which is not in the table", target);
        };
        let Some(status) = record.exit_status() else {
            panic!("collecting status of pid {} before it exited", target);
        };
        record.parent = None;
        self.reclaim_if_done(inner, target);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::record::RecordState;
    use crate::sched::RelaxScheduler;
    use spin::relax::Yield;
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    type TestTable = ProcessTable<RelaxScheduler<Yield>>;

    fn table() -> Arc<TestTable> {
        let table = TestTable::bootstrap(TableConfig::with_capacity(16), RelaxScheduler::new());
        Arc::new(table.unwrap())
    }

    fn spawn(table: &TestTable, parent: Pid) -> Pid {
        let pid = table.allocate(parent).unwrap();
        table.start(pid);
        pid
    }

    fn wait_for_joiners(table: &TestTable, pid: Pid, n: usize) {
        while table.joiner_count(pid) < n {
            thread::yield_now();
        }
    }

    #[test]
    fn test_join_self_is_deadlock() {
        let table = table();
        let child = spawn(&table, Pid::BOOTUP);
        assert_eq!(
            table.join(child, child, WaitFlags::empty()),
            Err(ProcError::Deadlock)
        );
        assert_eq!(table.joiner_count(child), 0);
    }

    #[test]
    fn test_join_rejects_reserved_and_unknown() {
        let table = table();
        let child = spawn(&table, Pid::BOOTUP);
        assert_eq!(
            table.join(child, Pid::INVALID, WaitFlags::empty()),
            Err(ProcError::NotFound)
        );
        assert_eq!(
            table.join(child, Pid::BOOTUP, WaitFlags::empty()),
            Err(ProcError::NotFound)
        );
        assert_eq!(
            table.join(Pid::BOOTUP, Pid(999), WaitFlags::empty()),
            Err(ProcError::NotFound)
        );
        assert_eq!(
            table.join(Pid::BOOTUP, Pid(u32::MAX), WaitFlags::empty()),
            Err(ProcError::InvalidArgument)
        );
    }

    #[test]
    fn test_join_after_exit_returns_immediately() {
        let table = table();
        let child = spawn(&table, Pid::BOOTUP);
        table.exit(child, 42, false);

        // Parent still holds interest; the zombie stays.
        let info = table.lookup(child).unwrap();
        assert_eq!(info.state, RecordState::Exited(42));

        assert_eq!(table.join(Pid::BOOTUP, child, WaitFlags::empty()), Ok(Some(42)));
        assert!(!table.is_valid(child));
        assert_eq!(
            table.join(Pid::BOOTUP, child, WaitFlags::empty()),
            Err(ProcError::NotFound)
        );
    }

    #[test]
    fn test_nohang_on_running_target() {
        let table = table();
        let child = spawn(&table, Pid::BOOTUP);
        assert_eq!(table.join(Pid::BOOTUP, child, WaitFlags::NOHANG), Ok(None));
        assert_eq!(table.joiner_count(child), 0);
        assert!(table.is_valid(child));

        table.exit(child, 9, false);
        assert_eq!(table.join(Pid::BOOTUP, child, WaitFlags::NOHANG), Ok(Some(9)));
    }

    #[test]
    fn test_join_blocks_until_exit() {
        let table = table();
        let child = spawn(&table, Pid::BOOTUP);

        let joiner = {
            let table = Arc::clone(&table);
            thread::spawn(move || table.join(Pid::BOOTUP, child, WaitFlags::empty()))
        };

        wait_for_joiners(&table, child, 1);
        assert!(table.is_valid(child));
        table.exit(child, 7, false);

        assert_eq!(joiner.join().unwrap(), Ok(Some(7)));
        assert!(!table.is_valid(child));
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn test_multi_joiner_fan_out() {
        const JOINERS: usize = 4;
        let table = table();
        let target = spawn(&table, Pid::BOOTUP);
        let callers: Vec<Pid> = (0..JOINERS).map(|_| spawn(&table, Pid::BOOTUP)).collect();

        let handles: Vec<_> = callers
            .iter()
            .map(|&caller| {
                let table = Arc::clone(&table);
                thread::spawn(move || table.join(caller, target, WaitFlags::empty()))
            })
            .collect();

        wait_for_joiners(&table, target, JOINERS);
        table.exit(target, -3, false);

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(Some(-3)));
        }
        assert!(!table.is_valid(target));
    }

    #[test]
    fn test_orphan_is_reclaimed_on_exit() {
        let table = table();
        let parent = spawn(&table, Pid::BOOTUP);
        let child = spawn(&table, parent);

        table.exit(parent, 0, false);
        assert_eq!(table.lookup(child).unwrap().parent, None);

        table.exit(child, 5, false);
        assert!(!table.is_valid(child));
    }

    #[test]
    fn test_orphan_with_waiting_joiner_is_collected() {
        let table = table();
        let parent = spawn(&table, Pid::BOOTUP);
        let child = spawn(&table, parent);
        let watcher = spawn(&table, Pid::BOOTUP);

        let joiner = {
            let table = Arc::clone(&table);
            thread::spawn(move || table.join(watcher, child, WaitFlags::empty()))
        };
        wait_for_joiners(&table, child, 1);

        table.exit(parent, 0, false);
        table.exit(child, 11, false);

        assert_eq!(joiner.join().unwrap(), Ok(Some(11)));
        assert!(!table.is_valid(child));
    }

    #[test]
    fn test_exited_children_reclaimed_with_parent() {
        let table = table();
        let parent = spawn(&table, Pid::BOOTUP);
        let child = spawn(&table, parent);
        table.exit(child, 1, false);
        assert!(table.is_valid(child));

        table.exit(parent, 0, false);
        assert!(!table.is_valid(child));
        assert!(table.is_valid(parent));
    }

    #[test]
    fn test_exit_detaching_children() {
        let table = table();
        let parent = spawn(&table, Pid::BOOTUP);
        let child = spawn(&table, parent);

        table.exit(parent, 0, true);
        let info = table.lookup(child).unwrap();
        assert!(info.detached);
        assert_eq!(info.parent, None);
        assert_eq!(
            table.join(Pid::BOOTUP, child, WaitFlags::empty()),
            Err(ProcError::InvalidArgument)
        );
    }

    #[test]
    #[should_panic(expected = "exited twice")]
    fn test_double_exit_panics() {
        let table = table();
        let child = spawn(&table, Pid::BOOTUP);
        table.exit(child, 0, false);
        table.exit(child, 1, false);
    }
}
