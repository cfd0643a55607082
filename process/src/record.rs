//! Process Record
//!
//! Per-process bookkeeping kept in the process table. Records are owned by
//! the table and only ever touched with the table lock held.

use crate::pid::Pid;

/// Exit status posted by a terminating process.
pub type ExitStatus = i32;

/// Lifecycle state of a record.
///
/// A reclaimed record has no state: it is simply gone from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Pid allocated, process has not started executing yet
    Created,
    /// Process is running
    Running,
    /// Process has exited; the status is final
    Exited(ExitStatus),
}

/// A single entry in the process table.
#[derive(Debug, Clone)]
pub(crate) struct ProcessRecord {
    /// Process ID
    pub pid: Pid,
    /// Parent process ID, `None` once orphaned or collected
    pub parent: Option<Pid>,
    /// Lifecycle state
    pub state: RecordState,
    /// Nobody may join this record any more
    pub detached: bool,
    /// Threads blocked in join on this record
    pub joiners: usize,
    /// Last signal recorded for this process (0 = none)
    pub pending_signal: i32,
}

impl ProcessRecord {
    /// Fresh record for a newly allocated pid.
    pub fn new(pid: Pid, parent: Option<Pid>) -> Self {
        Self {
            pid,
            parent,
            state: RecordState::Created,
            detached: false,
            joiners: 0,
            pending_signal: 0,
        }
    }

    /// Record for the bootup process, which is running from the start.
    pub fn bootup() -> Self {
        let mut record = Self::new(Pid::BOOTUP, None);
        record.state = RecordState::Running;
        record
    }

    pub fn is_exited(&self) -> bool {
        matches!(self.state, RecordState::Exited(_))
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self.state {
            RecordState::Exited(status) => Some(status),
            _ => None,
        }
    }

    /// Post the exit status. Panics if the record already exited.
    pub fn set_exited(&mut self, status: ExitStatus) {
        assert!(
            !self.is_exited(),
            "pid {} exited twice (first status {:?})",
            self.pid,
            self.exit_status()
        );
        self.state = RecordState::Exited(status);
    }

    /// No future join can observe this record.
    pub fn is_reclaimable(&self) -> bool {
        self.is_exited() && self.joiners == 0 && (self.detached || self.parent.is_none())
    }
}

/// Read-only copy of a record, safe to hold without the table lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub state: RecordState,
    pub detached: bool,
    pub joiners: usize,
    pub pending_signal: i32,
}

impl ProcessRecord {
    /// Copy out the fields visible to callers.
    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            parent: self.parent,
            state: self.state,
            detached: self.detached,
            joiners: self.joiners,
            pending_signal: self.pending_signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = ProcessRecord::new(Pid(5), Some(Pid::BOOTUP));
        assert_eq!(record.state, RecordState::Created);
        assert_eq!(record.parent, Some(Pid::BOOTUP));
        assert!(!record.detached);
        assert_eq!(record.joiners, 0);
        assert_eq!(record.pending_signal, 0);
        assert_eq!(record.exit_status(), None);
    }

    #[test]
    fn test_reclaimable_predicate() {
        let mut record = ProcessRecord::new(Pid(5), Some(Pid::BOOTUP));
        assert!(!record.is_reclaimable());

        record.set_exited(3);
        // Parent may still join
        assert!(!record.is_reclaimable());

        record.joiners = 1;
        record.parent = None;
        assert!(!record.is_reclaimable());

        record.joiners = 0;
        assert!(record.is_reclaimable());

        let mut detached = ProcessRecord::new(Pid(6), Some(Pid::BOOTUP));
        detached.detached = true;
        assert!(!detached.is_reclaimable());
        detached.set_exited(0);
        assert!(detached.is_reclaimable());
    }

    #[test]
    #[should_panic(expected = "exited twice")]
    fn test_double_exit_panics() {
        let mut record = ProcessRecord::new(Pid(5), None);
        record.set_exited(1);
        record.set_exited(2);
    }

    #[test]
    fn test_bootup_record() {
        let record = ProcessRecord::bootup();
        assert_eq!(record.pid, Pid::BOOTUP);
        assert_eq!(record.parent, None);
        assert_eq!(record.state, RecordState::Running);
    }
}
