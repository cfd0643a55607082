//! Error types for process table operations.

use thiserror::Error;

/// No such process.
pub const ESRCH: i64 = 3;
/// Resource temporarily unavailable.
pub const EAGAIN: i64 = 11;
/// Out of memory.
pub const ENOMEM: i64 = 12;
/// Bad address.
pub const EFAULT: i64 = 14;
/// Invalid argument.
pub const EINVAL: i64 = 22;
/// Resource deadlock would occur.
pub const EDEADLK: i64 = 35;
/// Function not implemented.
pub const ENOSYS: i64 = 38;

/// Errors returned by the process table.
///
/// Misuse that can only come from inside the kernel (reclaiming a live
/// record, exiting twice) is not represented here; those paths panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcError {
    /// No record exists for the pid.
    #[error("no such process")]
    NotFound,

    /// Out-of-range pid, or an operation the record's state forbids.
    #[error("invalid argument")]
    InvalidArgument,

    /// A process tried to join itself.
    #[error("joining self would deadlock")]
    Deadlock,

    /// Every slot in the table is occupied.
    #[error("process table full")]
    ResourceExhausted,

    /// Storage for the table could not be reserved.
    #[error("out of memory")]
    OutOfMemory,
}

impl ProcError {
    /// Linux errno value for this error (positive).
    pub fn errno(&self) -> i64 {
        match self {
            ProcError::NotFound => ESRCH,
            ProcError::InvalidArgument => EINVAL,
            ProcError::Deadlock => EDEADLK,
            ProcError::ResourceExhausted => EAGAIN,
            ProcError::OutOfMemory => ENOMEM,
        }
    }
}

pub type Result<T> = core::result::Result<T, ProcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping_is_distinct() {
        let errors = [
            ProcError::NotFound,
            ProcError::InvalidArgument,
            ProcError::Deadlock,
            ProcError::ResourceExhausted,
            ProcError::OutOfMemory,
        ];

        for i in 0..errors.len() {
            for j in (i + 1)..errors.len() {
                assert_ne!(errors[i].errno(), errors[j].errno());
            }
        }
        assert_eq!(ProcError::NotFound.errno(), ESRCH);
        assert_eq!(ProcError::Deadlock.errno(), EDEADLK);
    }
}
