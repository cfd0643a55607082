//! Detach/Orphan Manager
//!
//! Releasing interest in a child's outcome, and disowning children when
//! their parent exits.


use crate::config::{DetachPolicy, OrphanPolicy};
use crate::error::{ProcError, Result};
use crate::pid::Pid;
use crate::sched::Scheduler;
use crate::table::{ProcessTable, TableInner};

impl<S: Scheduler> ProcessTable<S> {
    /// Give up `caller`'s interest in `child`'s exit status.
    ///
    /// Only the current parent may detach a child, and only once. A detached
    /// child can no longer be joined and is reclaimed as soon as it exits.
    pub fn detach(&self, caller: Pid, child: Pid) -> Result<()> {
        if child == Pid::INVALID || child == Pid::BOOTUP {
            return Err(ProcError::InvalidArgument);
        }

        let mut inner = self.lock();
        let record = inner.get_mut(child).ok_or(ProcError::NotFound)?;

        if record.detached || record.parent != Some(caller) {
            return Err(ProcError::InvalidArgument);
        }
        if record.joiners > 0 && self.config.detach_policy == DetachPolicy::Strict {
            return Err(ProcError::InvalidArgument);
        }

        record.detached = true;
        let exited = record.is_exited();
        let reclaimed = self.reclaim_if_done(&mut inner, child);
        log::debug!(
            "[KPIO PID] pid {} detached by {} (exited: {}, reclaimed: {})",
            child,
            caller,
            exited,
            reclaimed
        );
        Ok(())
    }

    /// Hand every child of `parent` to its heir under the orphan policy,
    /// detaching them when `detach` is set. Children that became
    /// reclaimable are reclaimed. Returns the number of children disowned.
    pub(crate) fn disown_children(&self, inner: &mut TableInner, parent: Pid, detach: bool) -> usize {
        let heir = self.orphan_heir(inner, parent);

        let mut disowned = 0;
        for record in inner.records_mut().filter(|r| r.parent == Some(parent)) {
            record.parent = heir;
            if detach {
                record.detached = true;
            }
            disowned += 1;
        }

        // Every other record was reclaimed the moment it became reclaimable,
        // so anything reclaimable now is a child we just let go of.
        for slot in 0..inner.slot_count() {
            let pid = match inner.at(slot) {
                Some(record) if record.pid != parent && record.is_reclaimable() => record.pid,
                _ => continue,
            };
            self.reclaim(inner, pid);
        }

        disowned
    }

    /// Who inherits the children of an exiting `parent`.
    fn orphan_heir(&self, inner: &TableInner, parent: Pid) -> Option<Pid> {
        match self.config.orphan_policy {
            OrphanPolicy::NoParent => None,
            OrphanPolicy::ReparentToBootup => {
                let bootup_alive = inner
                    .get(Pid::BOOTUP)
                    .is_some_and(|record| !record.is_exited());
                (parent != Pid::BOOTUP && bootup_alive).then_some(Pid::BOOTUP)
            }
        }
    }
}
