//! Process identity and lifecycle core for KPIO.
//!
//! This crate tracks every process the kernel knows about:
//! - Pid allocation over a fixed-capacity slot table
//! - Exit/join handshake with multiple joiners per target
//! - Detaching children and disowning them when their parent exits
//! - A pending-signal value and sleep/wake per process
//! - `waitpid`/`kill` syscall entry points on top of the above
//!
//! Records live in a [`ProcessTable`] created with
//! [`ProcessTable::bootstrap`]; everything outside the table refers to
//! processes by [`Pid`] only. Blocking goes through the kernel scheduler,
//! reached via the [`Scheduler`] trait.

#![no_std]

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod config;
pub mod detach;
pub mod error;
pub mod lifecycle;
pub mod pid;
pub mod record;
pub mod sched;
pub mod signal;
pub mod syscall;
pub mod table;
pub mod wait;

pub use config::{DetachPolicy, OrphanPolicy, TableConfig, PID_MAX, PID_MIN, PROCS_MAX};
pub use error::{ProcError, Result};
pub use lifecycle::WaitFlags;
pub use pid::Pid;
pub use record::{ExitStatus, ProcessInfo, RecordState};
pub use sched::{RelaxScheduler, Scheduler};
pub use table::{ProcessTable, TableStats};
pub use wait::WaitChannel;
