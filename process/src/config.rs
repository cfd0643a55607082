//! Process table configuration.
//!
//! Compile-time limits for the kernel's process table, plus the runtime
//! [`TableConfig`] a table is bootstrapped with.

use crate::error::{ProcError, Result};
use crate::pid::Pid;

/// Smallest pid handed out by the allocator.
pub const PID_MIN: u32 = 2;

/// Largest pid handed out by the allocator.
pub const PID_MAX: u32 = 32767;

/// Maximum number of simultaneously present process records.
pub const PROCS_MAX: usize = 128;

/// What happens to a process's children when it exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Children lose their parent entirely. Nobody will ever join them
    /// on the parent's behalf, so they are reclaimed as soon as they exit.
    #[default]
    NoParent,
    /// Children are handed to the bootup process, which keeps the right
    /// to join them. Falls back to [`OrphanPolicy::NoParent`] once the
    /// bootup process itself has exited.
    ReparentToBootup,
}

/// Whether a parent may detach a child that has threads blocked in join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetachPolicy {
    /// Detaching fails with `InvalidArgument` while joiners are outstanding.
    #[default]
    Strict,
    /// Detaching is allowed; the blocked joiners still collect the status and
    /// the last of them reclaims the record.
    AllowWithJoiners,
}

/// Runtime parameters of a process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Number of slots in the table.
    pub capacity: usize,
    /// Lowest allocatable pid.
    pub pid_min: u32,
    /// Highest allocatable pid.
    pub pid_max: u32,
    /// Fate of children when their parent exits.
    pub orphan_policy: OrphanPolicy,
    /// Detach behavior with outstanding joiners.
    pub detach_policy: DetachPolicy,
}

impl TableConfig {
    /// Kernel defaults.
    pub const fn new() -> Self {
        Self {
            capacity: PROCS_MAX,
            pid_min: PID_MIN,
            pid_max: PID_MAX,
            orphan_policy: OrphanPolicy::NoParent,
            detach_policy: DetachPolicy::Strict,
        }
    }

    /// Same as [`TableConfig::new`] with a different slot count.
    pub const fn with_capacity(capacity: usize) -> Self {
        let mut config = Self::new();
        config.capacity = capacity;
        config
    }

    /// Set the orphan policy.
    pub const fn orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    /// Set the detach policy.
    pub const fn detach_policy(mut self, policy: DetachPolicy) -> Self {
        self.detach_policy = policy;
        self
    }

    /// Check the parameters describe a usable table.
    ///
    /// The pid range must sit above the reserved pids and be at least as wide
    /// as the table, so every slot has some pid that hashes to it.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ProcError::InvalidArgument);
        }
        if self.pid_min <= Pid::BOOTUP.as_u32() || self.pid_min > self.pid_max {
            return Err(ProcError::InvalidArgument);
        }
        let span = (self.pid_max - self.pid_min) as usize + 1;
        if span < self.capacity {
            return Err(ProcError::InvalidArgument);
        }
        Ok(())
    }

    /// Whether `pid` lies in the allocatable range. The bootup pid does not.
    pub fn in_range(&self, pid: Pid) -> bool {
        (self.pid_min..=self.pid_max).contains(&pid.as_u32())
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new()
    }
}
